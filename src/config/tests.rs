use super::*;
use crate::index::IndexKind;
use serial_test::serial;
use std::env;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_sift_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("SIFT_INDEX_KIND");
        env::remove_var("SIFT_CLUSTER_PROBES");
        env::remove_var("SIFT_GRAPH_SEARCH_BREADTH");
        env::remove_var("SIFT_EMBEDDING_DIM");
        env::remove_var("SIFT_LOCAL_CAPACITY");
        env::remove_var("SIFT_NAMESPACE_TTLS");
        env::remove_var("SIFT_REMOTE_TTLS");
        env::remove_var("SIFT_COMPRESSION_THRESHOLD");
        env::remove_var("SIFT_SWEEP_INTERVAL_SECS");
        env::remove_var("SIFT_SIMILARITY_THRESHOLD");
        env::remove_var("SIFT_STORE_BOOSTS");
        env::remove_var("SIFT_MAX_TOP_K");
        env::remove_var("SIFT_REDIS_URL");
        env::remove_var("SIFT_KEY_PREFIX");
        env::remove_var("SIFT_EMBEDDING_URL");
        env::remove_var("SIFT_EMBEDDING_MODEL");
        env::remove_var("SIFT_EMBEDDING_API_KEY");
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.index_kind, IndexKind::Exact);
    assert_eq!(config.embedding_dim, 384);
    assert_eq!(config.local_capacity, 10_000);
    assert_eq!(config.similarity_threshold, 0.70);
    assert_eq!(config.max_top_k, 100);
    assert!(config.redis_url.is_none());
    assert_eq!(config.key_prefix, "sift");
    assert_eq!(config.namespace_ttls.get("query"), Some(&3600));
    assert_eq!(config.namespace_ttls.get("embedding"), Some(&86_400));
    assert!(config.store_boosts.is_empty());
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_sift_env();

    let config = Config::from_env().expect("should parse with defaults");

    assert_eq!(config.index_kind, IndexKind::Exact);
    assert_eq!(config.local_capacity, 10_000);
    assert_eq!(config.sweep_interval_secs, 300);
}

#[test]
#[serial]
fn test_from_env_index_kinds() {
    clear_sift_env();

    with_env_vars(&[("SIFT_INDEX_KIND", "clustered")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(config.index_kind, IndexKind::Clustered);
    });

    with_env_vars(&[("SIFT_INDEX_KIND", "graph")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(config.index_kind, IndexKind::Graph);
    });
}

#[test]
#[serial]
fn test_from_env_unknown_index_kind() {
    clear_sift_env();

    with_env_vars(&[("SIFT_INDEX_KIND", "quantum")], || {
        let result = Config::from_env();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIndexKind { .. }));
        assert!(err.to_string().contains("quantum"));
    });
}

#[test]
#[serial]
fn test_from_env_namespace_ttls_merge_over_defaults() {
    clear_sift_env();

    with_env_vars(&[("SIFT_NAMESPACE_TTLS", "query=60,sessions=120")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(config.namespace_ttls.get("query"), Some(&60));
        assert_eq!(config.namespace_ttls.get("sessions"), Some(&120));
        // Unlisted namespaces keep their defaults.
        assert_eq!(config.namespace_ttls.get("embedding"), Some(&86_400));
    });
}

#[test]
#[serial]
fn test_from_env_malformed_ttl_entry() {
    clear_sift_env();

    with_env_vars(&[("SIFT_NAMESPACE_TTLS", "query-60")], || {
        let result = Config::from_env();
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMapEntry { .. }));
        assert!(err.to_string().contains("query-60"));
    });
}

#[test]
#[serial]
fn test_from_env_non_numeric_ttl_value() {
    clear_sift_env();

    with_env_vars(&[("SIFT_NAMESPACE_TTLS", "query=soon")], || {
        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidMapEntry { .. }
        ));
    });
}

#[test]
#[serial]
fn test_from_env_store_boosts() {
    clear_sift_env();

    with_env_vars(&[("SIFT_STORE_BOOSTS", "plans=1.1, documents=1.0")], || {
        let config = Config::from_env().expect("should parse");
        assert_eq!(config.store_boosts.get("plans"), Some(&1.1));
        assert_eq!(config.store_boosts.get("documents"), Some(&1.0));
    });
}

#[test]
#[serial]
fn test_from_env_invalid_threshold() {
    clear_sift_env();

    with_env_vars(&[("SIFT_SIMILARITY_THRESHOLD", "very high")], || {
        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ThresholdParseError { .. }
        ));
    });
}

#[test]
#[serial]
fn test_from_env_invalid_capacity_uses_default() {
    clear_sift_env();

    with_env_vars(&[("SIFT_LOCAL_CAPACITY", "not_a_number")], || {
        let config = Config::from_env().expect("should parse with fallback");
        assert_eq!(config.local_capacity, 10_000);
    });
}

#[test]
#[serial]
fn test_from_env_optional_urls() {
    clear_sift_env();

    with_env_vars(
        &[
            ("SIFT_REDIS_URL", "redis://cache.cluster:6379"),
            ("SIFT_EMBEDDING_URL", "https://api.example.com/v1"),
            ("SIFT_EMBEDDING_API_KEY", "  "),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            assert_eq!(
                config.redis_url.as_deref(),
                Some("redis://cache.cluster:6379")
            );
            assert_eq!(
                config.embedding_url.as_deref(),
                Some("https://api.example.com/v1")
            );
            // Whitespace-only values are treated as unset.
            assert!(config.embedding_api_key.is_none());
        },
    );
}

#[test]
fn test_validate_success_with_defaults() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_zero_dimension() {
    let config = Config {
        embedding_dim: 0,
        ..Default::default()
    };

    let result = config.validate();
    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), ConfigError::ZeroValue { .. }));
}

#[test]
fn test_validate_threshold_out_of_range() {
    let config = Config {
        similarity_threshold: 1.5,
        ..Default::default()
    };
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::InvalidThreshold { .. }
    ));

    let config = Config {
        similarity_threshold: 0.0,
        ..Default::default()
    };
    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::InvalidThreshold { .. }
    ));
}

#[test]
fn test_validate_negative_store_boost() {
    let config = Config {
        store_boosts: HashMap::from([("plans".to_string(), -0.5)]),
        ..Default::default()
    };

    let result = config.validate();
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, ConfigError::InvalidStoreBoost { .. }));
    assert!(err.to_string().contains("plans"));
}

#[test]
fn test_validate_empty_key_prefix() {
    let config = Config {
        key_prefix: String::new(),
        ..Default::default()
    };

    assert!(matches!(
        config.validate().unwrap_err(),
        ConfigError::EmptyKeyPrefix
    ));
}

#[test]
fn test_derived_cache_config() {
    let config = Config::default();
    let cache = config.cache_config();

    assert_eq!(cache.capacity, 10_000);
    assert_eq!(cache.compression_threshold, 1024);
    assert_eq!(cache.sweep_interval, Duration::from_secs(300));
    assert_eq!(cache.key_prefix, "sift");
    assert_eq!(cache.local_ttls.get("query"), Some(&3600));
}

#[test]
fn test_derived_index_config() {
    let config = Config {
        index_kind: IndexKind::Graph,
        graph_search_breadth: 32,
        ..Default::default()
    };
    let index = config.index_config();

    assert_eq!(index.kind, IndexKind::Graph);
    assert_eq!(index.dimension, 384);
    assert_eq!(index.graph_search_breadth, 32);
    assert_eq!(index.max_top_k, 100);
}

#[test]
fn test_error_messages_are_descriptive() {
    let err = ConfigError::InvalidIndexKind {
        value: "quantum".to_string(),
    };
    assert!(err.to_string().contains("quantum"));
    assert!(err.to_string().contains("exact"));

    let err = ConfigError::InvalidThreshold { value: 1.5 };
    assert!(err.to_string().contains("1.5"));

    let err = ConfigError::ZeroValue {
        name: "SIFT_LOCAL_CAPACITY",
    };
    assert!(err.to_string().contains("SIFT_LOCAL_CAPACITY"));
}
