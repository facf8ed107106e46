//! Language detection and syntax-family classification from file paths

/// Broad syntactic family used to pick a chunking strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxFamily {
    /// Blocks delimited by braces, callables recognized by their signature
    BraceDelimited,
    /// Callables introduced by a `function` keyword
    FunctionKeyword,
    /// Indentation-scoped, callables introduced by `def`/`class`
    Indentation,
    /// No language-aware strategy; fixed-size windows only
    Unknown,
}

/// Extension of the file name in `path`, without the dot
///
/// Dotfiles (`.gitignore`) and names ending in a dot have no extension.
pub fn file_extension(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx < name.len() - 1 => &name[idx + 1..],
        _ => "",
    }
}

/// Detect programming language from file extension
pub fn detect_language(extension: &str) -> Option<&'static str> {
    let lang = match extension.to_lowercase().as_str() {
        "rs" => "Rust",
        "py" => "Python",
        "js" | "mjs" | "cjs" => "JavaScript",
        "ts" => "TypeScript",
        "jsx" => "JavaScript (JSX)",
        "tsx" => "TypeScript (TSX)",
        "java" => "Java",
        "cpp" | "cc" | "cxx" => "C++",
        "c" => "C",
        "h" | "hpp" => "C/C++ Header",
        "cs" => "C#",
        "go" => "Go",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        "kt" | "kts" => "Kotlin",
        "scala" => "Scala",
        "clj" => "Clojure",
        "hs" => "Haskell",
        "ml" => "OCaml",
        "r" => "R",
        "sh" | "bash" => "Shell",
        "sql" => "SQL",
        "proto" => "Protocol Buffers",
        "gradle" => "Gradle",

        "html" | "htm" => "HTML",
        "css" => "CSS",

        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "xml" => "XML",
        "properties" => "Properties",

        "md" | "markdown" => "Markdown",
        "txt" => "Text",

        _ => return None,
    };

    Some(lang)
}

/// Pick the chunking family for an extension
pub fn syntax_family(extension: &str) -> SyntaxFamily {
    match extension.to_lowercase().as_str() {
        "java" | "kt" | "kts" | "scala" | "cs" | "c" | "h" | "cpp" | "cc" | "cxx" | "hpp"
        | "go" | "rs" | "swift" | "php" => SyntaxFamily::BraceDelimited,
        "js" | "mjs" | "cjs" | "jsx" | "ts" | "tsx" => SyntaxFamily::FunctionKeyword,
        "py" => SyntaxFamily::Indentation,
        _ => SyntaxFamily::Unknown,
    }
}
