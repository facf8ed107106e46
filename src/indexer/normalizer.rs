//! Content normalization: binary rejection, comment stripping, import tagging

use crate::error::ParseError;
use crate::types::FileMap;
use regex::Regex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

/// Prefix written in front of every import-like line
pub const IMPORT_PREFIX: &str = "// Import: ";

/// Prefix of the header line naming the source file
pub const FILE_HEADER_PREFIX: &str = "// File: ";

static IMPORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#\s*(?:include|import)\b|(?:import|include|require|using)\s+)")
        .expect("import pattern is valid")
});

/// Share of control characters above which text is treated as binary
const MAX_CONTROL_CHAR_RATIO: f64 = 0.1;

/// Strips noise from raw file text
///
/// Stateless; every call is independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentNormalizer;

impl ContentNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize every file, dropping files that normalize to nothing
    ///
    /// The first file that fails aborts the whole batch. A panic while
    /// normalizing a file is reported as [`ParseError::Failed`] for that file.
    pub fn normalize_files(&self, files: &FileMap) -> Result<FileMap, ParseError> {
        normalize_each(files, |path, content| self.normalize(path, content))
    }

    /// Normalize one file
    ///
    /// Returns an empty string for binary or content-free files.
    pub fn normalize(&self, path: &str, content: &str) -> Result<String, ParseError> {
        if path.trim().is_empty() {
            return Err(ParseError::InvalidPath(path.to_string()));
        }

        if content.trim().is_empty() {
            return Ok(String::new());
        }

        if is_binary(content) {
            tracing::debug!("Skipping binary file: {}", path);
            return Ok(String::new());
        }

        let cleaned = clean_content(content);
        if cleaned.is_empty() {
            return Ok(String::new());
        }

        let mut result = String::with_capacity(cleaned.len() + path.len() + 10);
        result.push_str(FILE_HEADER_PREFIX);
        result.push_str(path);
        result.push('\n');
        result.push_str(&cleaned);
        Ok(result)
    }
}

fn normalize_each(
    files: &FileMap,
    normalize: impl Fn(&str, &str) -> Result<String, ParseError>,
) -> Result<FileMap, ParseError> {
    let mut normalized = FileMap::new();
    for (path, content) in files {
        let text = panic::catch_unwind(AssertUnwindSafe(|| normalize(path, content))).map_err(
            |payload| ParseError::Failed {
                file: path.clone(),
                reason: panic_reason(payload.as_ref()),
            },
        )??;
        if !text.trim().is_empty() {
            normalized.insert(path.clone(), text);
        }
    }
    Ok(normalized)
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "normalizer panicked".to_string())
}

/// Null bytes, or too many control characters other than tab/LF/CR
pub fn is_binary(content: &str) -> bool {
    if content.contains('\0') {
        return true;
    }

    let mut total = 0usize;
    let mut control = 0usize;
    for c in content.chars() {
        total += 1;
        if (c as u32) < 32 && !matches!(c, '\t' | '\n' | '\r') {
            control += 1;
        }
    }

    control as f64 > total as f64 * MAX_CONTROL_CHAR_RATIO
}

fn is_line_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//")
        || trimmed.starts_with('*')
        || (trimmed.starts_with('#') && !IMPORT_PATTERN.is_match(trimmed))
}

fn clean_content(content: &str) -> String {
    let mut cleaned = String::with_capacity(content.len());
    let mut in_block_comment = false;

    for raw_line in content.split('\n') {
        let mut line = raw_line.trim_end_matches('\r');

        if in_block_comment {
            match line.find("*/") {
                Some(end) => {
                    in_block_comment = false;
                    line = &line[end + 2..];
                }
                None => continue,
            }
        }

        let trimmed = line.trim();

        if let Some(start) = trimmed.find("/*") {
            let closed = trimmed[start + 2..].contains("*/");
            if start == 0 && closed {
                continue;
            }
            if !closed {
                in_block_comment = true;
                let before = trimmed[..start].trim_end();
                if before.is_empty() {
                    continue;
                }
                push_line(&mut cleaned, before);
                continue;
            }
        }

        if trimmed.is_empty() || is_line_comment(trimmed) {
            continue;
        }

        if IMPORT_PATTERN.is_match(trimmed) {
            cleaned.push_str(IMPORT_PREFIX);
            push_line(&mut cleaned, trimmed);
            continue;
        }

        push_line(&mut cleaned, line);
    }

    cleaned
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}
