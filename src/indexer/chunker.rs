use super::language::{SyntaxFamily, detect_language, file_extension, syntax_family};
use crate::config::ChunkingConfig;
use crate::types::{Chunk, ChunkMetadata, FileMap};
use rayon::prelude::*;
use regex::Regex;
use std::sync::LazyLock;

/// Method/function signature that opens a block on the same line
static CALLABLE_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|private|protected|internal|static|final|abstract|synchronized|override|async|virtual|inline|unsafe|extern|const|pub(?:\([^)]*\))?)\s+)*(?:fn\s+\w+|func\s+(?:\([^)]*\)\s*)?\w+|fun\s+\w+|[\w<>\[\],.?*&:]+\s+\**\w+)\s*(?:<[^>]*>)?\s*\([^)]*\)[^;{]*\{",
    )
    .expect("callable signature pattern is valid")
});

/// Statements that look like signatures but open control-flow blocks
static CONTROL_FLOW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\}?\s*(?:if|else|for|foreach|while|switch|catch|try|do|return|using|lock|match)\b")
        .expect("control flow pattern is valid")
});

static FUNCTION_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\b\*?\s*\w*\s*\(|^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+\w+|^\s*(?:export\s+)?(?:const|let|var)\s+\w+\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|\w+\s*=>)",
    )
    .expect("function boundary pattern is valid")
});

static DEF_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:async\s+)?def\s+\w+\s*\(|class\s+\w+)")
        .expect("def boundary pattern is valid")
});

/// How one file is split, chosen from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Emit when a callable's brace block closes
    BraceBlocks,
    /// Emit at `function`/`class` boundaries once the chunk is big enough
    FunctionBoundaries,
    /// Emit at `def`/`class` boundaries once the chunk is big enough
    DefBoundaries,
    /// Overlapping fixed-size windows
    FixedWindow,
}

impl ChunkStrategy {
    pub fn for_extension(extension: &str) -> Self {
        match syntax_family(extension) {
            SyntaxFamily::BraceDelimited => ChunkStrategy::BraceBlocks,
            SyntaxFamily::FunctionKeyword => ChunkStrategy::FunctionBoundaries,
            SyntaxFamily::Indentation => ChunkStrategy::DefBoundaries,
            SyntaxFamily::Unknown => ChunkStrategy::FixedWindow,
        }
    }
}

/// Splits normalized file text into bounded, boundary-aligned chunks
///
/// Output is a pure function of the text, the extension, and the
/// size/overlap settings.
#[derive(Debug, Clone)]
pub struct CodeChunker {
    chunk_size: usize,
    overlap: usize,
}

impl CodeChunker {
    /// `overlap` is clamped below `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.overlap)
    }

    /// Create a chunker with default strategy (1000 chars, 100 overlap)
    pub fn default_strategy() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Hard ceiling on the length of any produced chunk
    pub fn max_chunk_len(&self) -> usize {
        self.chunk_size * 2
    }

    /// Split text into chunk contents, blanks included
    pub fn split(&self, content: &str, extension: &str) -> Vec<String> {
        if content.is_empty() {
            return Vec::new();
        }

        let strategy = ChunkStrategy::for_extension(extension);
        let pieces = match strategy {
            ChunkStrategy::BraceBlocks => self.split_brace_blocks(content),
            ChunkStrategy::FunctionBoundaries => {
                self.split_at_boundaries(content, &FUNCTION_BOUNDARY)
            }
            ChunkStrategy::DefBoundaries => self.split_at_boundaries(content, &DEF_BOUNDARY),
            ChunkStrategy::FixedWindow => return self.fixed(content),
        };

        // A pass that produced a single chunk found no usable boundaries
        if pieces.len() <= 1 {
            tracing::trace!(
                "{:?} pass degenerated to {} chunk(s), using fixed windows",
                strategy,
                pieces.len()
            );
            return self.fixed(content);
        }

        pieces
    }

    /// Chunk one normalized file
    pub fn chunk_file(&self, repository_url: &str, file_path: &str, content: &str) -> Vec<Chunk> {
        let extension = file_extension(file_path);
        let pieces: Vec<String> = self
            .split(content, extension)
            .into_iter()
            .filter(|piece| !piece.trim().is_empty())
            .collect();

        let total_chunks = pieces.len();
        let language = detect_language(extension);

        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, piece)| {
                let mut metadata = ChunkMetadata::new();
                metadata.insert("file_extension".to_string(), extension.into());
                if let Some(language) = language {
                    metadata.insert("language".to_string(), language.into());
                }
                metadata.insert("chunk_size".to_string(), piece.len().into());
                metadata.insert("total_chunks".to_string(), total_chunks.into());

                Chunk::new(piece, file_path, repository_url, chunk_index).with_metadata(metadata)
            })
            .collect()
    }

    /// Chunk every file of a repository, in path order
    pub fn chunk_files(&self, repository_url: &str, files: &FileMap) -> Vec<Chunk> {
        let per_file: Vec<Vec<Chunk>> = files
            .par_iter()
            .map(|(path, content)| self.chunk_file(repository_url, path, content))
            .collect();

        let chunks: Vec<Chunk> = per_file.into_iter().flatten().collect();
        tracing::info!("Created {} chunks from {} files", chunks.len(), files.len());
        chunks
    }

    fn fixed(&self, content: &str) -> Vec<String> {
        fixed_windows(content, self.chunk_size, self.overlap)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn split_brace_blocks(&self, content: &str) -> Vec<String> {
        let mut acc = Accumulator::new(self.max_chunk_len());
        let mut depth = 0usize;
        // Depth at which the currently open callable started
        let mut callable_depth: Option<usize> = None;

        for line in content.lines() {
            if acc.push_line(line) {
                depth = 0;
                callable_depth = None;
            }

            let signature = callable_depth.is_none()
                && CALLABLE_SIGNATURE.is_match(line)
                && !CONTROL_FLOW.is_match(line);

            for c in line.chars() {
                match c {
                    '{' => {
                        if signature && callable_depth.is_none() {
                            callable_depth = Some(depth);
                        }
                        depth += 1;
                    }
                    '}' => {
                        depth = depth.saturating_sub(1);
                        if callable_depth == Some(depth) {
                            acc.flush();
                            callable_depth = None;
                        }
                    }
                    _ => {}
                }
            }
        }

        acc.finish()
    }

    fn split_at_boundaries(&self, content: &str, boundary: &Regex) -> Vec<String> {
        let mut acc = Accumulator::new(self.max_chunk_len());

        for line in content.lines() {
            if acc.len() > self.chunk_size && boundary.is_match(line) {
                acc.flush();
            }
            acc.push_line(line);
        }

        acc.finish()
    }
}

impl Default for CodeChunker {
    fn default() -> Self {
        Self::default_strategy()
    }
}

/// Line accumulator that never lets a chunk grow past `limit` bytes
struct Accumulator {
    limit: usize,
    current: String,
    chunks: Vec<String>,
}

impl Accumulator {
    fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(2),
            current: String::new(),
            chunks: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.current.len()
    }

    /// Append a line; returns true when the ceiling forced an early emit
    fn push_line(&mut self, line: &str) -> bool {
        let needed = line.len() + 1;
        let mut forced = false;

        if !self.current.is_empty() && self.current.len() + needed > self.limit {
            self.flush();
            forced = true;
        }

        if needed <= self.limit {
            self.current.push_str(line);
            self.current.push('\n');
            return forced;
        }

        // A single line longer than the ceiling is cut into pieces
        let mut rest = line;
        while rest.len() + 1 > self.limit {
            let mut cut = floor_char_boundary(rest, self.limit - 1);
            if cut == 0 {
                cut = ceil_char_boundary(rest, 1);
            }
            self.chunks.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        self.current.push_str(rest);
        self.current.push('\n');
        true
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.chunks.push(std::mem::take(&mut self.current));
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.chunks
    }
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut index = index;
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut index = index;
    while !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Consecutive windows of `size` bytes, each starting `size - overlap` bytes
/// after the previous one
///
/// Window edges are moved back onto UTF-8 character boundaries. Consecutive
/// windows always touch or overlap, so no text is lost between them.
pub fn fixed_windows(content: &str, size: usize, overlap: usize) -> Vec<&str> {
    let mut windows = Vec::new();
    if content.is_empty() || size == 0 {
        return windows;
    }

    let step = if overlap < size { size - overlap } else { 1 };
    let len = content.len();
    let mut start = 0;

    loop {
        let mut end = floor_char_boundary(content, start + size);
        if end <= start {
            end = ceil_char_boundary(content, start + 1);
        }
        windows.push(&content[start..end]);

        if end >= len {
            break;
        }

        let mut next = floor_char_boundary(content, start + step);
        if next <= start {
            next = ceil_char_boundary(content, start + 1);
        }
        start = next;
    }

    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn java_method(name: &str, body_lines: usize) -> String {
        let mut s = format!("    public void {}() {{\n", name);
        for i in 0..body_lines {
            s.push_str(&format!("        call_{}_{}(value);\n", name, i));
        }
        s.push_str("    }\n");
        s
    }

    #[test]
    fn test_strategy_for_extension() {
        assert_eq!(ChunkStrategy::for_extension("java"), ChunkStrategy::BraceBlocks);
        assert_eq!(ChunkStrategy::for_extension("ts"), ChunkStrategy::FunctionBoundaries);
        assert_eq!(ChunkStrategy::for_extension("py"), ChunkStrategy::DefBoundaries);
        assert_eq!(ChunkStrategy::for_extension("md"), ChunkStrategy::FixedWindow);
    }

    #[test]
    fn test_new_clamps_overlap() {
        let chunker = CodeChunker::new(10, 50);
        assert_eq!(chunker.chunk_size(), 10);
        assert_eq!(chunker.overlap(), 9);
        assert_eq!(chunker.max_chunk_len(), 20);
    }

    #[test]
    fn test_callable_signature_heuristic() {
        assert!(CALLABLE_SIGNATURE.is_match("    public void login() {"));
        assert!(CALLABLE_SIGNATURE.is_match("public List<String> names(int a) throws IOException {"));
        assert!(CALLABLE_SIGNATURE.is_match("pub fn login(&self) -> bool {"));
        assert!(CALLABLE_SIGNATURE.is_match("func (s *Server) Handle(w http.ResponseWriter) {"));
        assert!(CALLABLE_SIGNATURE.is_match("int main(void) {"));
        assert!(!CALLABLE_SIGNATURE.is_match("public class Foo {"));
        assert!(!CALLABLE_SIGNATURE.is_match("    int x = compute(a);"));
        assert!(CONTROL_FLOW.is_match("    } else if (x) {"));
        assert!(CONTROL_FLOW.is_match("    for (int i = 0; i < n; i++) {"));
    }

    #[test]
    fn test_brace_blocks_split_per_method() {
        let content = format!(
            "public class Foo {{\n{}{}}}\n",
            java_method("alpha", 2),
            java_method("beta", 2)
        );
        let chunker = CodeChunker::new(1000, 100);
        let pieces = chunker.split(&content, "java");

        assert_eq!(pieces.len(), 3);
        assert!(pieces[0].starts_with("public class Foo {"));
        assert!(pieces[0].contains("alpha()"));
        assert!(pieces[1].contains("beta()"));
        assert!(!pieces[1].contains("alpha"));
        assert_eq!(pieces[2], "}\n");
        assert_eq!(pieces.concat(), content);
    }

    #[test]
    fn test_control_flow_does_not_end_method() {
        let content = "class A {\n    void run() {\n        if (x) {\n            y();\n        }\n        z();\n    }\n    void other() {\n        w();\n    }\n}\n";
        let chunker = CodeChunker::new(1000, 100);
        let pieces = chunker.split(content, "java");

        assert_eq!(pieces.len(), 3);
        assert!(pieces[0].contains("z();"));
        assert!(pieces[1].contains("void other()"));
    }

    #[test]
    fn test_brace_blocks_force_emit_at_ceiling() {
        // One huge method: no boundary before the ceiling
        let content = format!("class Big {{\n{}}}\n", java_method("huge", 200));
        let chunker = CodeChunker::new(200, 20);
        let pieces = chunker.split(&content, "java");

        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.len() <= chunker.max_chunk_len());
        }
        assert_eq!(pieces.concat(), content);
    }

    #[test]
    fn test_function_boundaries_wait_for_target_size() {
        let mut content = String::new();
        for i in 0..6 {
            content.push_str(&format!("function handler{}(req, res) {{\n", i));
            for j in 0..4 {
                content.push_str(&format!("  const value{} = compute{}(req.body);\n", j, j));
            }
            content.push_str("}\n");
        }
        let chunker = CodeChunker::new(300, 30);
        let pieces = chunker.split(&content, "js");

        assert!(pieces.len() >= 2);
        for piece in &pieces {
            assert!(piece.starts_with("function handler"));
            assert!(piece.len() <= chunker.max_chunk_len());
        }
        assert_eq!(pieces.concat(), content);
    }

    #[test]
    fn test_def_boundaries() {
        let mut content = String::new();
        for i in 0..5 {
            content.push_str(&format!("def step_{}(data):\n", i));
            for j in 0..5 {
                content.push_str(&format!("    data = transform_{}(data, {})\n", j, i));
            }
            content.push_str("    return data\n");
        }
        let chunker = CodeChunker::new(250, 25);
        let pieces = chunker.split(&content, "py");

        assert!(pieces.len() >= 2);
        assert!(pieces.iter().skip(1).all(|p| p.starts_with("def step_")));
        assert_eq!(pieces.concat(), content);
    }

    #[test]
    fn test_degenerate_pass_falls_back_to_fixed_windows() {
        // No callable boundaries at all: the brace pass yields one chunk
        let content = "x = 1;\n".repeat(40);
        let chunker = CodeChunker::new(200, 20);
        let pieces = chunker.split(&content, "java");

        assert_eq!(pieces, fixed_windows(&content, 200, 20));
        assert!(pieces.len() >= 2);
    }

    #[test]
    fn test_unknown_extension_uses_fixed_windows() {
        let content = "word ".repeat(100);
        let chunker = CodeChunker::new(100, 10);
        let pieces = chunker.split(&content, "md");
        assert_eq!(pieces, fixed_windows(&content, 100, 10));
    }

    #[test]
    fn test_long_single_line_is_cut() {
        let content = "a".repeat(1000);
        let chunker = CodeChunker::new(100, 10);
        let mut acc = Accumulator::new(chunker.max_chunk_len());
        acc.push_line(&content);
        let pieces = acc.finish();
        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.len() <= 200);
        }
    }

    #[test]
    fn test_fixed_windows_overlap_and_coverage() {
        let content: String = (0..50).map(|i| format!("{:02}", i)).collect();
        let windows = fixed_windows(&content, 10, 3);

        assert_eq!(windows[0], &content[0..10]);
        assert_eq!(windows[1], &content[7..17]);

        let mut rebuilt = windows[0].to_string();
        for window in &windows[1..] {
            rebuilt.push_str(&window[3..]);
        }
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn test_fixed_windows_multibyte() {
        let content = "héllo wörld ünïcode ".repeat(20);
        let windows = fixed_windows(&content, 16, 4);
        assert!(windows.len() > 1);
        for window in &windows {
            assert!(window.len() <= 16);
        }
        assert!(!windows.last().unwrap().is_empty());
        assert!(content.ends_with(windows.last().unwrap()));
    }

    #[test]
    fn test_fixed_windows_empty() {
        assert!(fixed_windows("", 10, 2).is_empty());
    }

    #[test]
    fn test_chunk_file_metadata_and_indices() {
        let content = format!(
            "public class Foo {{\n{}{}}}\n",
            java_method("alpha", 2),
            java_method("beta", 2)
        );
        let chunker = CodeChunker::new(1000, 100);
        let chunks = chunker.chunk_file("repo", "src/Foo.java", &content);

        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.repository_url, "repo");
            assert_eq!(chunk.file_path, "src/Foo.java");
            assert_eq!(chunk.metadata_str("file_extension"), Some("java"));
            assert_eq!(chunk.metadata_str("language"), Some("Java"));
            assert_eq!(chunk.metadata["total_chunks"], serde_json::json!(3));
            assert_eq!(
                chunk.metadata["chunk_size"],
                serde_json::json!(chunk.content.len())
            );
        }
    }

    #[test]
    fn test_chunk_file_empty_content() {
        let chunker = CodeChunker::default();
        assert!(chunker.chunk_file("repo", "a.java", "").is_empty());
    }

    #[test]
    fn test_chunk_file_drops_blank_windows() {
        let mut content = "x".repeat(150);
        content.push_str(&" ".repeat(300));
        let chunker = CodeChunker::new(100, 10);
        let chunks = chunker.chunk_file("repo", "notes.txt", &content);

        assert!(chunks.iter().all(|c| !c.content.trim().is_empty()));
        let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let content = format!("class Foo {{\n{}}}\n", java_method("huge", 80));
        let chunker = CodeChunker::new(300, 30);
        let a = chunker.chunk_file("repo", "Foo.java", &content);
        let b = chunker.chunk_file("repo", "Foo.java", &content);
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunk_files_in_path_order() {
        let mut files = FileMap::new();
        files.insert("b.md".to_string(), "second".to_string());
        files.insert("a.md".to_string(), "first".to_string());

        let chunks = CodeChunker::default().chunk_files("repo", &files);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].file_path, "a.md");
        assert_eq!(chunks[1].file_path, "b.md");
    }
}
