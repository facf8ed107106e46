//! Platform-specific default locations
//!
//! Follows the XDG Base Directory layout on Linux and the native locations on
//! macOS and Windows (resolved by the `dirs` crate).

use std::path::PathBuf;

const APP_DIR: &str = "coderepo-rag";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Configuration root, falling back to the working directory
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Cache root, falling back to the working directory
    pub fn cache_dir() -> PathBuf {
        dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {config_dir}/coderepo-rag
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join(APP_DIR)
    }

    /// Returns: {cache_dir}/coderepo-rag
    pub fn project_cache_dir() -> PathBuf {
        Self::cache_dir().join(APP_DIR)
    }

    /// Returns: {config_dir}/coderepo-rag/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }

    /// Where downloaded embedding models are kept
    ///
    /// Returns: {cache_dir}/coderepo-rag/models
    pub fn default_model_cache_dir() -> PathBuf {
        Self::project_cache_dir().join("models")
    }
}
