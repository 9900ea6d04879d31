//! Snapshot persistence for store indexes.
//!
//! An index saves as two files: the binary snapshot (rkyv: dimension,
//! f16 vector bits, and the kind-specific search structure) and a JSON
//! sidecar holding the external-id and metadata tables. The pair loads
//! together; a snapshot whose sidecar is missing, unparsable, or in
//! disagreement about dimension or count is a load failure, never a
//! partial success.
//!
//! Writes go through temp files persisted into place, so an
//! interrupted save never leaves a torn pair on disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::ann::{AnnIndex, ClusteredIndex, ExactIndex, FlatStore, GraphIndex};
use super::config::IndexConfig;
use super::error::{IndexError, IndexResult};
use super::model::{MetadataMap, bits_to_f16_vec, f16_slice_to_bits};

/// Binary snapshot payload.
#[derive(Archive, RkyvSerialize, RkyvDeserialize, Debug)]
pub(crate) struct IndexSnapshot {
    pub dimension: u32,
    /// Row-major f16 vector data as raw bits, little-endian per rkyv.
    pub vector_bits: Vec<u16>,
    pub structure: SnapshotStructure,
}

/// Kind-specific search structure carried by the snapshot. Runtime
/// tuning (probe count, search breadth) is not persisted; it comes
/// from configuration after load.
#[derive(Archive, RkyvSerialize, RkyvDeserialize, Debug)]
pub(crate) enum SnapshotStructure {
    Exact,
    Clustered {
        trained: bool,
        centroids: Vec<f32>,
        lists: Vec<Vec<u32>>,
    },
    Graph {
        neighbors: Vec<Vec<u32>>,
    },
}

/// JSON sidecar holding the id and metadata tables, indexed by row.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Sidecar {
    pub dimension: usize,
    pub count: usize,
    pub external_ids: Vec<String>,
    pub metadata: Vec<MetadataMap>,
}

/// Sidecar location for a given snapshot path.
pub(crate) fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".sidecar.json");
    path.with_file_name(name)
}

/// Captures the persistable parts of an index.
pub(crate) fn snapshot_of(index: &AnnIndex) -> IndexSnapshot {
    let store = index.store();
    let structure = match index {
        AnnIndex::Exact(_) => SnapshotStructure::Exact,
        AnnIndex::Clustered(clustered) => SnapshotStructure::Clustered {
            trained: clustered.is_trained(),
            centroids: clustered.centroids().to_vec(),
            lists: clustered.lists().to_vec(),
        },
        AnnIndex::Graph(graph) => SnapshotStructure::Graph {
            neighbors: graph.neighbors().to_vec(),
        },
    };

    IndexSnapshot {
        dimension: store.dimension() as u32,
        vector_bits: f16_slice_to_bits(store.raw()),
        structure,
    }
}

/// Rebuilds an index from a snapshot, then applies runtime tuning from
/// `config`. The snapshot decides the index kind; `config.kind` only
/// selects the kind of newly created stores.
pub(crate) fn index_from_snapshot(
    snapshot: IndexSnapshot,
    config: &IndexConfig,
) -> IndexResult<AnnIndex> {
    let store = FlatStore::from_parts(
        snapshot.dimension as usize,
        bits_to_f16_vec(&snapshot.vector_bits),
    )?;

    let mut index = match snapshot.structure {
        SnapshotStructure::Exact => AnnIndex::Exact(ExactIndex::from_store(store)),
        SnapshotStructure::Clustered {
            trained,
            centroids,
            lists,
        } => AnnIndex::Clustered(ClusteredIndex::from_parts(
            store,
            config.cluster_probes,
            trained,
            centroids,
            lists,
        )?),
        SnapshotStructure::Graph { neighbors } => AnnIndex::Graph(GraphIndex::from_parts(
            store,
            config.graph_search_breadth,
            neighbors,
        )?),
    };
    index.apply_tuning(config);
    Ok(index)
}

/// Writes the snapshot/sidecar pair atomically.
pub(crate) fn save_sync(path: &Path, snapshot: &IndexSnapshot, sidecar: &Sidecar) -> IndexResult<()> {
    let payload =
        rkyv::to_bytes::<rkyv::rancor::Error>(snapshot).map_err(|e| IndexError::SnapshotEncode {
            reason: e.to_string(),
        })?;
    let sidecar_json =
        serde_json::to_vec(sidecar).map_err(|e| IndexError::SnapshotEncode {
            reason: e.to_string(),
        })?;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());

    let mut snapshot_file = named_temp(dir)?;
    snapshot_file.write_all(&payload)?;
    let mut sidecar_file = named_temp(dir)?;
    sidecar_file.write_all(&sidecar_json)?;

    // Both temps are complete before either lands at its final name.
    snapshot_file
        .persist(path)
        .map_err(|e| IndexError::Io(e.error))?;
    sidecar_file
        .persist(sidecar_path(path))
        .map_err(|e| IndexError::Io(e.error))?;

    debug!(
        path = %path.display(),
        bytes = payload.len(),
        vectors = sidecar.count,
        "index snapshot written"
    );
    Ok(())
}

fn named_temp(dir: Option<&Path>) -> IndexResult<NamedTempFile> {
    Ok(match dir {
        Some(dir) => NamedTempFile::new_in(dir)?,
        None => NamedTempFile::new()?,
    })
}

/// Reads and cross-checks the snapshot/sidecar pair.
pub(crate) fn load_sync(path: &Path) -> IndexResult<(IndexSnapshot, Sidecar)> {
    let raw = fs::read(path)?;
    // The archive root must sit at its natural alignment; a plain
    // file read gives no such guarantee.
    let mut aligned: rkyv::util::AlignedVec = rkyv::util::AlignedVec::new();
    aligned.extend_from_slice(&raw);
    let snapshot = rkyv::from_bytes::<IndexSnapshot, rkyv::rancor::Error>(&aligned).map_err(
        |e| IndexError::SnapshotDecode {
            reason: e.to_string(),
        },
    )?;

    let sidecar_file = sidecar_path(path);
    let sidecar_raw = fs::read(&sidecar_file).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IndexError::SidecarMissing { path: sidecar_file.clone() }
        } else {
            IndexError::Io(e)
        }
    })?;
    let sidecar: Sidecar =
        serde_json::from_slice(&sidecar_raw).map_err(|e| IndexError::SidecarParse {
            reason: e.to_string(),
        })?;

    verify_pair(&snapshot, &sidecar)?;
    Ok((snapshot, sidecar))
}

fn verify_pair(snapshot: &IndexSnapshot, sidecar: &Sidecar) -> IndexResult<()> {
    let dimension = snapshot.dimension as usize;
    if dimension == 0 {
        return Err(IndexError::ZeroDimension);
    }
    if dimension != sidecar.dimension {
        return Err(IndexError::SidecarDimensionMismatch {
            snapshot: dimension,
            sidecar: sidecar.dimension,
        });
    }

    if !snapshot.vector_bits.len().is_multiple_of(dimension) {
        return Err(IndexError::MalformedVectorData {
            len: snapshot.vector_bits.len(),
            dimension,
        });
    }
    let vectors = snapshot.vector_bits.len() / dimension;
    if vectors != sidecar.count
        || sidecar.external_ids.len() != sidecar.count
        || sidecar.metadata.len() != sidecar.count
    {
        return Err(IndexError::SidecarCountMismatch {
            snapshot: vectors,
            sidecar: sidecar.count.max(sidecar.external_ids.len()),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::config::IndexKind;
    use crate::index::model::MetaValue;

    fn sample_pair(count: usize) -> (IndexSnapshot, Sidecar) {
        let config = IndexConfig {
            dimension: 4,
            ..IndexConfig::default()
        };
        let mut index = AnnIndex::new(&config);
        for i in 0..count {
            index.add(&[i as f32, 1.0, 0.0, 0.5]);
        }

        let sidecar = Sidecar {
            dimension: 4,
            count,
            external_ids: (0..count).map(|i| format!("doc-{i}")).collect(),
            metadata: (0..count)
                .map(|i| {
                    MetadataMap::from([("rank".to_string(), MetaValue::Int(i as i64))])
                })
                .collect(),
        };
        (snapshot_of(&index), sidecar)
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.index");
        let (snapshot, sidecar) = sample_pair(3);

        save_sync(&path, &snapshot, &sidecar).unwrap();
        let (loaded_snapshot, loaded_sidecar) = load_sync(&path).unwrap();

        assert_eq!(loaded_snapshot.dimension, 4);
        assert_eq!(loaded_snapshot.vector_bits, snapshot.vector_bits);
        assert_eq!(loaded_sidecar.external_ids, sidecar.external_ids);
        assert_eq!(loaded_sidecar.metadata, sidecar.metadata);
    }

    #[test]
    fn test_missing_sidecar_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.index");
        let (snapshot, sidecar) = sample_pair(2);

        save_sync(&path, &snapshot, &sidecar).unwrap();
        fs::remove_file(sidecar_path(&path)).unwrap();

        assert!(matches!(
            load_sync(&path),
            Err(IndexError::SidecarMissing { .. })
        ));
    }

    #[test]
    fn test_corrupt_sidecar_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.index");
        let (snapshot, sidecar) = sample_pair(2);

        save_sync(&path, &snapshot, &sidecar).unwrap();
        fs::write(sidecar_path(&path), b"{ not json").unwrap();

        assert!(matches!(
            load_sync(&path),
            Err(IndexError::SidecarParse { .. })
        ));
    }

    #[test]
    fn test_count_disagreement_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.index");
        let (snapshot, mut sidecar) = sample_pair(3);
        sidecar.external_ids.pop();
        sidecar.metadata.pop();
        sidecar.count = 2;

        save_sync(&path, &snapshot, &sidecar).unwrap();

        assert!(matches!(
            load_sync(&path),
            Err(IndexError::SidecarCountMismatch { .. })
        ));
    }

    #[test]
    fn test_dimension_disagreement_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.index");
        let (snapshot, mut sidecar) = sample_pair(2);
        sidecar.dimension = 8;

        save_sync(&path, &snapshot, &sidecar).unwrap();

        assert!(matches!(
            load_sync(&path),
            Err(IndexError::SidecarDimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_corrupt_snapshot_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.index");
        fs::write(&path, b"\x00\x01garbage").unwrap();

        assert!(matches!(
            load_sync(&path),
            Err(IndexError::SnapshotDecode { .. })
        ));
    }

    #[test]
    fn test_structure_survives_for_each_kind() {
        for kind in [IndexKind::Exact, IndexKind::Clustered, IndexKind::Graph] {
            let config = IndexConfig {
                kind,
                dimension: 4,
                ..IndexConfig::default()
            };
            let mut index = AnnIndex::new(&config);
            for i in 0..80 {
                let angle = i as f32 * 0.37;
                index.add(&[angle.cos(), angle.sin(), 1.0, 0.0]);
            }

            let restored = index_from_snapshot(snapshot_of(&index), &config).unwrap();
            assert_eq!(restored.kind(), kind);
            assert_eq!(restored.len(), index.len());

            let query = [0.2f32, 0.9, 1.0, 0.0];
            let before: Vec<u32> = index.search(&query, 5).iter().map(|s| s.id).collect();
            let after: Vec<u32> = restored.search(&query, 5).iter().map(|s| s.id).collect();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn test_sidecar_path_appends_suffix() {
        let path = Path::new("/tmp/stores/main.index");
        assert_eq!(
            sidecar_path(path),
            Path::new("/tmp/stores/main.index.sidecar.json")
        );
    }
}
