//! Repository sources: where raw file maps come from
//!
//! A source turns a repository identifier into `path -> raw text`. Failures
//! surface as [`FetchError`] and are never retried here.

use crate::config::SourceConfig;
use crate::error::{ConfigError, FetchError};
use crate::types::FileMap;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

/// Extensions worth indexing
const SUPPORTED_EXTENSIONS: &[&str] = &[
    ".java", ".js", ".ts", ".py", ".cpp", ".c", ".h", ".hpp", ".cs", ".go", ".rs", ".php", ".rb",
    ".swift", ".kt", ".scala", ".clj", ".hs", ".ml", ".r", ".sql", ".md", ".txt", ".json", ".yml",
    ".yaml", ".xml", ".gradle", ".properties", ".proto", ".sh", ".bash", ".css", ".html",
];

/// Well-known names that usually carry no extension
const COMMON_FILE_PREFIXES: &[&str] = &[
    "readme",
    "license",
    "dockerfile",
    "makefile",
    "rakefile",
    "gemfile",
    "requirements",
    "package",
    "composer",
    "gulpfile",
];

const GITHUB_PREFIX: &str = "https://github.com/";

/// Supplies the raw files of a repository
#[async_trait::async_trait]
pub trait RepositorySource: Send + Sync {
    async fn fetch_files(&self, repository_id: &str) -> Result<FileMap, FetchError>;
}

/// Whether a file name looks like code or project text
pub fn should_process_file(file_name: &str) -> bool {
    if file_name.is_empty() {
        return false;
    }

    let lower = file_name.to_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        || COMMON_FILE_PREFIXES
            .iter()
            .any(|prefix| lower.starts_with(prefix))
}

/// `owner/repo` from a GitHub repository URL
///
/// Accepts `https://github.com/owner/repo` with or without a trailing `.git`
/// or slash.
pub fn parse_github_repository(url: &str) -> Result<String, FetchError> {
    let invalid = || FetchError::InvalidRepository(url.to_string());

    let rest = url.trim().strip_prefix(GITHUB_PREFIX).ok_or_else(invalid)?;
    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);

    let mut parts = rest.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Ok(format!("{}/{}", owner, repo))
        }
        _ => Err(invalid()),
    }
}

/// Reads repositories from the local filesystem
///
/// The repository identifier is a directory path. `.gitignore` rules are
/// honored and `.git/` is always skipped.
#[derive(Debug, Clone)]
pub struct LocalDirectorySource {
    max_file_size: usize,
    exclude: GlobSet,
}

impl LocalDirectorySource {
    pub fn new(max_file_size: usize) -> Self {
        Self {
            max_file_size,
            exclude: GlobSet::empty(),
        }
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude_patterns {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidValue {
                key: "source.exclude_patterns".to_string(),
                reason: format!("'{}': {}", pattern, e),
            })?;
            builder.add(glob);
        }
        let exclude = builder.build().map_err(|e| ConfigError::InvalidValue {
            key: "source.exclude_patterns".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            max_file_size: config.max_file_size,
            exclude,
        })
    }

    /// Walk `root` and collect every eligible file
    pub fn walk(&self, root: &Path) -> Result<FileMap, FetchError> {
        if !root.exists() {
            return Err(FetchError::RepositoryNotFound(root.display().to_string()));
        }
        if !root.is_dir() {
            return Err(FetchError::InvalidRepository(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let walker = WalkBuilder::new(root)
            .standard_filters(true)
            .hidden(false)
            .require_git(false)
            .build();

        let mut files = FileMap::new();
        for entry in walker {
            let entry = entry.map_err(|e| FetchError::WalkFailed(e.to_string()))?;
            let path = entry.path();

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            if path.components().any(|c| c.as_os_str() == ".git") {
                continue;
            }

            let relative = path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if !should_process_file(&file_name) || self.exclude.is_match(&relative) {
                continue;
            }

            if let Ok(metadata) = entry.metadata()
                && metadata.len() > self.max_file_size as u64
            {
                tracing::debug!("Skipping large file: {}", relative);
                continue;
            }

            match fs::read(path) {
                Ok(bytes) => {
                    files.insert(relative, String::from_utf8_lossy(&bytes).into_owned());
                }
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", relative, e);
                }
            }
        }

        tracing::info!("Fetched {} files from {}", files.len(), root.display());
        Ok(files)
    }
}

impl Default for LocalDirectorySource {
    fn default() -> Self {
        Self::new(SourceConfig::default().max_file_size)
    }
}

#[async_trait::async_trait]
impl RepositorySource for LocalDirectorySource {
    async fn fetch_files(&self, repository_id: &str) -> Result<FileMap, FetchError> {
        let source = self.clone();
        let root = Path::new(repository_id).to_path_buf();
        tokio::task::spawn_blocking(move || source.walk(&root))
            .await
            .map_err(|e| FetchError::WalkFailed(e.to_string()))?
    }
}

/// In-memory repositories, keyed by identifier
#[derive(Debug, Default)]
pub struct StaticSource {
    repositories: RwLock<HashMap<String, FileMap>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(self, repository_id: &str, files: FileMap) -> Self {
        self.insert(repository_id, files);
        self
    }

    /// Add or replace a repository's files
    pub fn insert(&self, repository_id: &str, files: FileMap) {
        self.repositories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(repository_id.to_string(), files);
    }
}

#[async_trait::async_trait]
impl RepositorySource for StaticSource {
    async fn fetch_files(&self, repository_id: &str) -> Result<FileMap, FetchError> {
        self.repositories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(repository_id)
            .cloned()
            .ok_or_else(|| FetchError::RepositoryNotFound(repository_id.to_string()))
    }
}
