//! In-process keyword-overlap index keyed by repository
//!
//! Each repository owns an immutable, insertion-ordered snapshot behind an
//! `Arc`. Writers build a new snapshot and swap it in under the write lock, so
//! a search always scores one consistent chunk set per repository even while
//! a refresh of that repository is in flight.

use super::ChunkStore;
use crate::types::{Chunk, RepositoryStats, SearchResult};
use anyhow::Result;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Chunk tagged with its global insertion sequence number
#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    chunk: Chunk,
}

type Snapshot = Arc<Vec<Entry>>;

pub struct LexicalIndex {
    repositories: RwLock<HashMap<String, Snapshot>>,
    next_seq: AtomicU64,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self {
            repositories: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Append chunks to their repositories' entries
    pub fn insert(&self, chunks: Vec<Chunk>) -> usize {
        if chunks.is_empty() {
            return 0;
        }

        let count = chunks.len();
        let mut repositories = self
            .repositories
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        for chunk in chunks {
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            let snapshot = repositories
                .entry(chunk.repository_url.clone())
                .or_default();
            // Clones the vector only while a reader still holds the old snapshot
            Arc::make_mut(snapshot).push(Entry { seq, chunk });
        }

        count
    }

    /// Remove a repository's entry; returns whether it existed
    pub fn remove_repository(&self, repository_url: &str) -> bool {
        self.repositories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(repository_url)
            .is_some()
    }

    /// Keyword-overlap search
    ///
    /// Score is the number of query-word occurrences in the chunk divided by
    /// the number of distinct query words. Only positive scores are returned;
    /// ties keep insertion order.
    pub fn search_chunks(
        &self,
        query: &str,
        repository: Option<&str>,
        max_results: usize,
    ) -> Vec<SearchResult> {
        let words = query_words(query);
        if words.is_empty() || max_results == 0 {
            return Vec::new();
        }

        let snapshots = self.snapshots(repository);
        let mut scored: Vec<(f32, u64, &Chunk)> = Vec::new();
        for snapshot in &snapshots {
            for entry in snapshot.iter() {
                let score = keyword_score(&words, &entry.chunk.content);
                if score > 0.0 {
                    scored.push((score, entry.seq, &entry.chunk));
                }
            }
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(max_results);

        tracing::debug!(
            "Lexical search for {:?} matched {} chunks",
            query,
            scored.len()
        );

        scored
            .into_iter()
            .map(|(score, _, chunk)| SearchResult {
                chunk: chunk.clone(),
                score,
            })
            .collect()
    }

    /// The live chunk at `(repository, path, index)`, if any
    pub fn get_chunk(&self, repository_url: &str, file_path: &str, chunk_index: usize) -> Option<Chunk> {
        self.snapshots(Some(repository_url))
            .iter()
            .flat_map(|snapshot| snapshot.iter())
            .find(|entry| entry.chunk.file_path == file_path && entry.chunk.chunk_index == chunk_index)
            .map(|entry| entry.chunk.clone())
    }

    /// Every chunk of one repository in insertion order
    pub fn chunks(&self, repository_url: &str) -> Vec<Chunk> {
        self.snapshots(Some(repository_url))
            .iter()
            .flat_map(|snapshot| snapshot.iter().map(|entry| entry.chunk.clone()))
            .collect()
    }

    pub fn stats(&self) -> Vec<RepositoryStats> {
        let repositories = self
            .repositories
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut stats: Vec<RepositoryStats> = repositories
            .iter()
            .map(|(url, snapshot)| RepositoryStats {
                repository_url: url.clone(),
                chunk_count: snapshot.len(),
            })
            .collect();
        stats.sort_by(|a, b| a.repository_url.cmp(&b.repository_url));
        stats
    }

    /// Clone the `Arc`s of the requested snapshots and release the lock
    fn snapshots(&self, repository: Option<&str>) -> Vec<Snapshot> {
        let repositories = self
            .repositories
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match repository {
            Some(url) => repositories.get(url).cloned().into_iter().collect(),
            None => repositories.values().cloned().collect(),
        }
    }
}

impl Default for LexicalIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct lowercase words, split on non-word characters
pub fn query_words(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Occurrences of the query words in `content`, divided by the word count
pub fn keyword_score(words: &BTreeSet<String>, content: &str) -> f32 {
    if words.is_empty() {
        return 0.0;
    }
    let lower = content.to_lowercase();
    let hits: usize = words.iter().map(|word| lower.matches(word.as_str()).count()).sum();
    hits as f32 / words.len() as f32
}

#[async_trait::async_trait]
impl ChunkStore for LexicalIndex {
    async fn add(&self, chunks: Vec<Chunk>) -> Result<usize> {
        Ok(self.insert(chunks))
    }

    async fn search(
        &self,
        query: &str,
        repository: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<SearchResult>> {
        Ok(self.search_chunks(query, repository, max_results))
    }

    async fn delete_repository(&self, repository_url: &str) -> Result<()> {
        if self.remove_repository(repository_url) {
            tracing::debug!("Removed lexical entry for {}", repository_url);
        }
        Ok(())
    }

    async fn repository_stats(&self) -> Result<Vec<RepositoryStats>> {
        Ok(self.stats())
    }

    fn mode(&self) -> String {
        "lexical".to_string()
    }
}
