use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use uuid::Uuid;

use crate::application::{EmbeddingService, GenerationService};
use crate::connector::api::SessionStore;
use crate::connector::storage::CorpusStore;
use crate::domain::{DomainError, QueryRequest, QueryResponse, SearchMatch};

/// Rows fetched from the index per query.
const SEARCH_TOP_K: usize = 10;
/// Of those, how many feed the prompt context.
const MAX_CONTEXT_CHUNKS: usize = 3;
/// Context text cap inside the prompt, to keep generation focused.
const MAX_CONTEXT_CHARS: usize = 800;
/// History carried into a grounded prompt (messages, not exchanges).
const HISTORY_WITH_CONTEXT: usize = 8;
/// History carried into an ungrounded prompt.
const HISTORY_WITHOUT_CONTEXT: usize = 12;
/// Match text shown to the client is truncated for display.
const MATCH_PREVIEW_CHARS: usize = 200;

/// Answers one `POST /query`: sweep sessions, retrieve grounding chunks,
/// assemble the prompt, call the generation collaborator, record the
/// exchange.
pub struct QueryUseCase {
    corpus: Arc<CorpusStore>,
    sessions: Arc<SessionStore>,
    embedding_service: Arc<dyn EmbeddingService>,
    generation_service: Arc<dyn GenerationService>,
}

impl QueryUseCase {
    pub fn new(
        corpus: Arc<CorpusStore>,
        sessions: Arc<SessionStore>,
        embedding_service: Arc<dyn EmbeddingService>,
        generation_service: Arc<dyn GenerationService>,
    ) -> Self {
        Self {
            corpus,
            sessions,
            embedding_service,
            generation_service,
        }
    }

    pub async fn execute(&self, request: QueryRequest) -> Result<QueryResponse, DomainError> {
        // Eviction rides along on query traffic; no dedicated timer.
        self.sessions.sweep(Instant::now());

        let conversation_id = request
            .conversation_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let grounded = request.use_context && !self.corpus.is_empty().await;
        info!(
            "Query ({} chars, grounded={grounded}, conversation={conversation_id})",
            request.query.len()
        );

        let (context, matches) = if grounded {
            self.retrieve(&request.query).await?
        } else {
            (String::new(), Vec::new())
        };

        let history = self.sessions.history(&conversation_id);
        let prompt = build_prompt(&request.query, &context, &history, grounded);
        debug!("Prompt assembled ({} chars)", prompt.len());

        let answer = self.generation_service.generate(&prompt).await?;

        self.sessions
            .record_exchange(&conversation_id, &request.query, &answer);

        Ok(QueryResponse {
            answer,
            matches,
            conversation_id,
        })
    }

    /// Embed the query, take the top chunks, and build the prompt context
    /// plus the client-facing match list (unique filenames only).
    async fn retrieve(
        &self,
        query: &str,
    ) -> Result<(String, Vec<SearchMatch>), DomainError> {
        let query_embedding = self.embedding_service.embed(query).await?;
        let hits = self.corpus.search(&query_embedding, SEARCH_TOP_K).await;

        let mut context = String::new();
        let mut matches: Vec<SearchMatch> = Vec::new();

        for (i, hit) in hits.iter().take(MAX_CONTEXT_CHUNKS).enumerate() {
            context.push_str(&format!("[REFERENCE {} from {}]\n", i + 1, hit.filename));
            context.push_str(&hit.text);
            context.push_str(&format!("\n[END REFERENCE {}]\n\n", i + 1));

            // One citation per file: repeated filenames add nothing for the
            // client even when several chunks of the file ranked highly.
            if !matches.iter().any(|m| m.filename == hit.filename) {
                matches.push(SearchMatch {
                    filename: hit.filename.clone(),
                    text: preview(&hit.text),
                    score: hit.score,
                });
            }
        }

        Ok((context, matches))
    }
}

fn preview(text: &str) -> String {
    if text.len() <= MATCH_PREVIEW_CHARS {
        return text.to_string();
    }
    let mut end = MATCH_PREVIEW_CHARS;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn build_prompt(
    query: &str,
    context: &str,
    history: &[(String, String)],
    grounded: bool,
) -> String {
    let mut prompt = String::new();

    if grounded {
        prompt.push_str(
            "You are a helpful emergency first aid assistant. \
             Provide clear, practical advice.\n\n",
        );
        if !context.is_empty() {
            let mut context = context.to_string();
            if context.len() > MAX_CONTEXT_CHARS {
                let mut end = MAX_CONTEXT_CHARS;
                while end > 0 && !context.is_char_boundary(end) {
                    end -= 1;
                }
                context.truncate(end);
                context.push_str("...\n[REMAINING CONTENT TRUNCATED]\n");
            }
            prompt.push_str("REFERENCE MATERIALS:\n");
            prompt.push_str(&context);
            prompt.push_str("\nBased on the above information, please provide helpful advice.\n\n");
        }
    }

    let keep = if grounded {
        HISTORY_WITH_CONTEXT
    } else {
        HISTORY_WITHOUT_CONTEXT
    };
    if !history.is_empty() {
        prompt.push_str("Previous conversation:\n");
        let start = history.len().saturating_sub(keep);
        for (role, text) in &history[start..] {
            prompt.push_str(&format!("{role}: {text}\n"));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("User: {query}\n\nAssistant:"));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::adapter::{MockEmbedding, MockGeneration};
    use crate::domain::DocumentRow;

    fn corpus(dir: &tempfile::TempDir, dimension: usize) -> Arc<CorpusStore> {
        Arc::new(CorpusStore::empty(
            dir.path().join("index.bin"),
            dir.path().join("metadata.jsonl"),
            dimension,
        ))
    }

    fn use_case(corpus: Arc<CorpusStore>, dimension: usize) -> QueryUseCase {
        QueryUseCase::new(
            corpus,
            Arc::new(SessionStore::new()),
            Arc::new(MockEmbedding::with_dimensions(dimension)),
            Arc::new(MockGeneration::with_answer("mock answer")),
        )
    }

    fn request(query: &str, use_context: bool) -> QueryRequest {
        QueryRequest {
            query: query.to_string(),
            conversation_id: None,
            use_context,
        }
    }

    #[tokio::test]
    async fn test_empty_index_answers_without_matches() {
        let dir = tempfile::tempdir().unwrap();
        let uc = use_case(corpus(&dir, 8), 8);

        let response = uc.execute(request("treat a burn", false)).await.unwrap();
        assert_eq!(response.answer, "mock answer");
        assert!(response.matches.is_empty());
        assert!(!response.conversation_id.is_empty());
    }

    #[tokio::test]
    async fn test_matches_deduplicate_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = MockEmbedding::with_dimensions(4);

        // Three of the best hits come from the same file.
        let store = corpus(&dir, 4);
        let query_vec = embedder.embed("burns").await.unwrap();
        let mut vectors = Vec::new();
        let mut rows = Vec::new();
        for (i, filename) in ["a.txt", "a.txt", "b.txt", "a.txt", "b.txt"]
            .iter()
            .enumerate()
        {
            // Place rows at increasing distance from the query embedding.
            let mut v = query_vec.clone();
            v[0] += 0.01 * (i as f32 + 1.0);
            vectors.push(v);
            rows.push(DocumentRow::new(*filename, format!("chunk {i}")));
        }
        store.append_and_flush(&vectors, rows).await.unwrap();

        let uc = use_case(store, 4);
        let response = uc.execute(request("burns", true)).await.unwrap();

        // Top 3 chunks are a.txt, a.txt, b.txt: two unique filenames remain.
        assert_eq!(response.matches.len(), 2);
        assert_eq!(response.matches[0].filename, "a.txt");
        assert_eq!(response.matches[1].filename, "b.txt");
    }

    #[tokio::test]
    async fn test_conversation_id_is_echoed() {
        let dir = tempfile::tempdir().unwrap();
        let uc = use_case(corpus(&dir, 8), 8);

        let response = uc
            .execute(QueryRequest {
                query: "hello".to_string(),
                conversation_id: Some("conv-42".to_string()),
                use_context: false,
            })
            .await
            .unwrap();
        assert_eq!(response.conversation_id, "conv-42");
    }

    #[test]
    fn test_prompt_includes_recent_history_only() {
        let history: Vec<(String, String)> = (0..10)
            .flat_map(|i| {
                vec![
                    ("User".to_string(), format!("q{i}")),
                    ("Assistant".to_string(), format!("a{i}")),
                ]
            })
            .collect();

        let prompt = build_prompt("next", "ctx", &history, true);
        // Grounded prompts keep the last 8 messages.
        assert!(!prompt.contains("q5"));
        assert!(prompt.contains("q6"));
        assert!(prompt.contains("a9"));
        assert!(prompt.ends_with("User: next\n\nAssistant:"));
    }

    #[test]
    fn test_prompt_truncates_oversized_context() {
        let context = "c".repeat(5000);
        let prompt = build_prompt("q", &context, &[], true);
        assert!(prompt.contains("[REMAINING CONTENT TRUNCATED]"));
    }
}
