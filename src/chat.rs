//! Question answering over retrieved code
//!
//! [`ChatService`] composes retrieval with an optional generative backend.
//! Without a backend, or when the backend fails, it answers with a plain
//! listing of the top snippets.

use crate::client::{RagClient, build_context};
use crate::types::Chunk;
use std::sync::Arc;

/// Snippets listed in a fallback answer
const FALLBACK_SNIPPETS: usize = 3;

/// Characters of each snippet shown in a fallback answer
const FALLBACK_SNIPPET_CHARS: usize = 500;

/// A text completion service
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}

#[derive(Clone)]
pub struct ChatService {
    client: RagClient,
    backend: Option<Arc<dyn CompletionBackend>>,
}

impl ChatService {
    pub fn new(client: RagClient) -> Self {
        Self {
            client,
            backend: None,
        }
    }

    pub fn with_backend(client: RagClient, backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            client,
            backend: Some(backend),
        }
    }

    /// Answer a question about indexed code; never fails
    pub async fn answer(&self, query: &str, repository: Option<&str>, max_results: usize) -> String {
        let chunks = self.client.retrieve(query, repository, max_results).await;

        if chunks.is_empty() {
            tracing::debug!("No chunks for {:?}", query);
            return not_found_answer(query);
        }

        if let Some(backend) = &self.backend {
            let prompt = build_prompt(query, &build_context(&chunks));
            match backend.complete(&prompt).await {
                Ok(answer) => {
                    tracing::info!("Answered with {}", backend.name());
                    return answer;
                }
                Err(e) => {
                    tracing::warn!(
                        "Completion backend {} failed, using snippet answer: {:#}",
                        backend.name(),
                        e
                    );
                }
            }
        }

        fallback_answer(query, &chunks)
    }
}

fn not_found_answer(query: &str) -> String {
    format!(
        "I couldn't find any relevant code for your question: \"{}\". \
         Please make sure the repository has been processed first with a refresh.",
        query
    )
}

fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are an AI assistant helping analyze code from source repositories.\n\n\
         User question: {}\n\n\
         Here is the relevant code context I found:\n{}\n\n\
         Please provide a helpful answer based on the code context above. \
         Be specific about what the code does and how it works, and answer the user's question.\n",
        query, context
    )
}

fn fallback_answer(query: &str, chunks: &[Chunk]) -> String {
    let mut answer = format!(
        "Based on your question \"{}\", I found {} relevant code snippets:\n\n",
        query,
        chunks.len()
    );

    for chunk in chunks.iter().take(FALLBACK_SNIPPETS) {
        answer.push_str(&format!("**File: {}**\n```\n", chunk.file_path));
        answer.push_str(&truncate_chars(&chunk.content, FALLBACK_SNIPPET_CHARS));
        answer.push_str("\n```\n\n");
    }

    answer.push_str("Configure a completion backend for generated answers.");
    answer
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::FileMap;
    use std::sync::Mutex;

    const REPO: &str = "https://github.com/acme/shop";

    struct RecordingBackend {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingBackend {
        fn new(fail: bool) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait::async_trait]
    impl CompletionBackend for RecordingBackend {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                anyhow::bail!("quota exceeded");
            }
            Ok("generated answer".to_string())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    async fn indexed_client(files: &[(&str, &str)]) -> RagClient {
        let client = RagClient::lexical_only(Config::default());
        let files: FileMap = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        client.refresh(REPO, files).await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_answer_without_results() {
        let service = ChatService::new(RagClient::lexical_only(Config::default()));
        let answer = service.answer("where is login", None, 5).await;
        assert!(answer.starts_with("I couldn't find any relevant code for your question: \"where is login\"."));
    }

    #[tokio::test]
    async fn test_answer_uses_backend() {
        let client = indexed_client(&[("Auth.java", "class Auth { void login() {} }")]).await;
        let backend = Arc::new(RecordingBackend::new(false));
        let service = ChatService::with_backend(client, backend.clone());

        let answer = service.answer("login", Some(REPO), 5).await;
        assert_eq!(answer, "generated answer");

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("User question: login"));
        assert!(prompts[0].contains("--- Code Snippet 1 ---"));
    }

    #[tokio::test]
    async fn test_answer_falls_back_on_backend_failure() {
        let client = indexed_client(&[("Auth.java", "class Auth { void login() {} }")]).await;
        let service = ChatService::with_backend(client, Arc::new(RecordingBackend::new(true)));

        let answer = service.answer("login", None, 5).await;
        assert!(answer.starts_with("Based on your question \"login\", I found 1 relevant code snippets:"));
        assert!(answer.contains("**File: Auth.java**"));
    }

    #[test]
    fn test_fallback_lists_at_most_three_truncated_snippets() {
        let long = "a".repeat(600);
        let chunks: Vec<Chunk> = (0..5)
            .map(|i| Chunk::new(long.clone(), format!("f{}.txt", i), REPO, 0))
            .collect();

        let answer = fallback_answer("q", &chunks);
        assert!(answer.contains("I found 5 relevant code snippets"));
        assert_eq!(answer.matches("**File:").count(), 3);
        assert!(answer.contains(&format!("{}...", "a".repeat(500))));
        assert!(!answer.contains(&"a".repeat(501)));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("héllo", 5), "héllo");
        assert_eq!(truncate_chars("", 3), "");
    }
}
