use super::*;
use tempfile::TempDir;

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.overlap, 100);
    assert_eq!(config.retrieval.max_results, 5);
    assert_eq!(config.semantic.timeout_secs, 30);
}

#[cfg(not(feature = "qdrant-backend"))]
#[test]
fn test_default_backend_is_lexical_only() {
    let config = Config::default();
    assert_eq!(config.semantic.backend, "none");
    assert!(!config.semantic_enabled());
}

#[test]
fn test_validate_zero_chunk_size() {
    let mut config = Config::default();
    config.chunking.chunk_size = 0;
    config.chunking.overlap = 0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("chunking.chunk_size"));
}

#[test]
fn test_validate_overlap_not_smaller_than_chunk_size() {
    let mut config = Config::default();
    config.chunking.chunk_size = 100;
    config.chunking.overlap = 100;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("chunking.overlap"));
}

#[test]
fn test_validate_unknown_backend() {
    let mut config = Config::default();
    config.semantic.backend = "pinecone".to_string();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("semantic.backend"));
    assert!(err.to_string().contains("pinecone"));
}

#[test]
fn test_validate_zero_timeout() {
    let mut config = Config::default();
    config.semantic.timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_zero_max_results() {
    let mut config = Config::default();
    config.retrieval.max_results = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_zero_candidate_multiplier() {
    let mut config = Config::default();
    config.semantic.candidate_multiplier = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_from_file_missing() {
    let result = Config::from_file(Path::new("/nonexistent/coderepo-rag/config.toml"));
    assert!(matches!(
        result,
        Err(RagError::Config(ConfigError::FileNotFound(_)))
    ));
}

#[test]
fn test_from_file_partial_toml_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[chunking]
chunk_size = 400

[semantic]
backend = "embedded"
"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.chunking.chunk_size, 400);
    assert_eq!(config.chunking.overlap, 100);
    assert_eq!(config.semantic.backend, "embedded");
    assert!(config.semantic_enabled());
    assert_eq!(config.retrieval.max_results, 5);
}

#[test]
fn test_from_file_invalid_toml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "this is = = not toml").unwrap();

    let result = Config::from_file(&path);
    assert!(matches!(
        result,
        Err(RagError::Config(ConfigError::ParseFailed(_)))
    ));
}

#[test]
fn test_from_file_rejects_invalid_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[chunking]\nchunk_size = 50\noverlap = 80\n").unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.retrieval.max_results = 12;
    config.semantic.collection_name = "custom".to_string();
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.retrieval.max_results, 12);
    assert_eq!(loaded.semantic.collection_name, "custom");
}
