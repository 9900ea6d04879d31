//! Frame codec for the remote cache tier.
//!
//! Values travel to the remote tier as a one-byte flag followed by the
//! rkyv-serialized payload. Payloads above the configured threshold are
//! gzip-compressed, and the compressed form is kept only when it is
//! strictly smaller than the raw bytes.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use super::error::CodecError;
use super::types::CacheValue;

/// Frame body holds the rkyv bytes verbatim.
pub const FLAG_RAW: u8 = 0;

/// Frame body holds a gzip stream wrapping the rkyv bytes.
pub const FLAG_GZIP: u8 = 1;

/// Serializes a value into a flagged frame.
pub fn encode_value(
    value: &CacheValue,
    compression_threshold: usize,
) -> Result<Vec<u8>, CodecError> {
    let payload = rkyv::to_bytes::<rkyv::rancor::Error>(value).map_err(|e| CodecError::Encode {
        reason: e.to_string(),
    })?;

    if payload.len() > compression_threshold
        && let Some(compressed) = try_compress(&payload)?
    {
        let mut frame = Vec::with_capacity(compressed.len() + 1);
        frame.push(FLAG_GZIP);
        frame.extend_from_slice(&compressed);
        return Ok(frame);
    }

    let mut frame = Vec::with_capacity(payload.len() + 1);
    frame.push(FLAG_RAW);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Deserializes a flagged frame back into a value.
pub fn decode_value(frame: &[u8]) -> Result<CacheValue, CodecError> {
    let (flag, body) = frame.split_first().ok_or(CodecError::EmptyFrame)?;

    let payload = match *flag {
        FLAG_RAW => to_aligned(body),
        FLAG_GZIP => {
            let mut decoder = GzDecoder::new(body);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| CodecError::Decode {
                    reason: e.to_string(),
                })?;
            to_aligned(&decompressed)
        }
        other => return Err(CodecError::UnknownFlag { flag: other }),
    };

    rkyv::from_bytes::<CacheValue, rkyv::rancor::Error>(&payload).map_err(|e| {
        CodecError::Decode {
            reason: e.to_string(),
        }
    })
}

/// Gzip-compresses a payload, returning `None` when compression does
/// not make it strictly smaller.
fn try_compress(payload: &[u8]) -> Result<Option<Vec<u8>>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(payload)
        .map_err(|e| CodecError::Encode {
            reason: e.to_string(),
        })?;
    let compressed = encoder.finish().map_err(|e| CodecError::Encode {
        reason: e.to_string(),
    })?;

    Ok((compressed.len() < payload.len()).then_some(compressed))
}

/// The frame body starts one byte into the buffer, so the archive root
/// is not at its natural alignment. Copy into aligned scratch before
/// handing the bytes to rkyv.
fn to_aligned(bytes: &[u8]) -> rkyv::util::AlignedVec {
    let mut aligned = rkyv::util::AlignedVec::new();
    aligned.extend_from_slice(bytes);
    aligned
}
