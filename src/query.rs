//! Query-time text transforms and the structural smart filter
//!
//! Preprocessing only rewrites the query text; it never ranks. The smart
//! filter narrows semantic candidates to the structural kind a query asks
//! for, and gives up (returning everything) rather than narrowing to nothing.

use crate::indexer::StructureTags;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "i", "in", "is", "it", "me", "of", "on", "or", "show", "find", "that", "the", "this", "to",
    "what", "when", "where", "which", "who", "why", "with",
];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("ctl", "controller"),
    ("ctrl", "controller"),
    ("svc", "service"),
    ("repo", "repository"),
    ("impl", "implementation"),
    ("auth", "authentication"),
    ("cfg", "configuration"),
    ("config", "configuration"),
    ("db", "database"),
    ("fn", "function"),
    ("func", "function"),
];

/// Rewrite a query before it is embedded
///
/// Whitespace is collapsed, the text lowercased, stop words dropped, and known
/// abbreviations expanded. If every word is a stop word the trimmed original
/// is returned, so preprocessing never turns a real query into an empty one.
pub fn preprocess_query(query: &str) -> String {
    let words: Vec<String> = query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .map(|word| match expand_abbreviation(&word) {
            Some(long) => long.to_string(),
            None => word,
        })
        .collect();

    if words.is_empty() {
        return query.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    words.join(" ")
}

fn expand_abbreviation(word: &str) -> Option<&'static str> {
    ABBREVIATIONS
        .iter()
        .find(|(short, _)| *short == word)
        .map(|(_, long)| *long)
}

/// Structural kinds a query explicitly asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryIntent {
    pub controller: bool,
    pub service: bool,
    pub repository: bool,
    pub test: bool,
}

impl QueryIntent {
    /// Keyword scan over the lowercased query text
    pub fn detect(query: &str) -> Self {
        let lower = query.to_lowercase();
        Self {
            controller: lower.contains("controller"),
            service: lower.contains("service"),
            repository: lower.contains("repository") || lower.contains("dao"),
            test: lower.contains("test"),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.controller || self.service || self.repository || self.test)
    }

    /// Every requested kind must be tagged on the candidate
    pub fn accepts(&self, tags: &StructureTags) -> bool {
        (!self.controller || tags.controller)
            && (!self.service || tags.service)
            && (!self.repository || tags.repository)
            && (!self.test || tags.test)
    }
}

/// Keep candidates matching the query's structural intent
///
/// Falls back to the unfiltered candidates when nothing matches, and leaves
/// the input untouched when the query names no structural kind.
pub fn smart_filter<T>(query: &str, candidates: Vec<T>, tags: impl Fn(&T) -> StructureTags) -> Vec<T> {
    let intent = QueryIntent::detect(query);
    if intent.is_empty() || candidates.is_empty() {
        return candidates;
    }

    if !candidates.iter().any(|c| intent.accepts(&tags(c))) {
        tracing::debug!(
            "Smart filter {:?} matched none of {} candidates, keeping all",
            intent,
            candidates.len()
        );
        return candidates;
    }

    candidates
        .into_iter()
        .filter(|c| intent.accepts(&tags(c)))
        .collect()
}
