//! End-to-end dispatch tests: framed request in, status-mapped response out,
//! with mock collaborators behind the use case.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use ragserve::connector::api::{FrameState, ParsedRequest, RequestFramer};
use ragserve::{
    CorpusStore, DocumentRow, DomainError, EmbeddingService, GenerationService, MockEmbedding,
    MockGeneration, PublicDirAssets, QueryUseCase, Router, SessionStore,
};

/// Generation mock that records every prompt it receives.
struct RecordingGeneration {
    prompts: Mutex<Vec<String>>,
}

impl RecordingGeneration {
    fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for RecordingGeneration {
    async fn generate(&self, prompt: &str) -> Result<String, DomainError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("recorded".to_string())
    }
}

struct FailingGeneration;

#[async_trait]
impl GenerationService for FailingGeneration {
    async fn generate(&self, _prompt: &str) -> Result<String, DomainError> {
        Err(DomainError::generation("model server unreachable"))
    }
}

fn frame(raw: &[u8]) -> ParsedRequest {
    match RequestFramer::new().push(raw) {
        FrameState::Complete(req) => req,
        other => panic!("expected Complete, got {other:?}"),
    }
}

fn post_query(body: &str) -> ParsedRequest {
    frame(
        format!(
            "POST /query HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
        .as_bytes(),
    )
}

fn router_with(
    dir: &tempfile::TempDir,
    corpus: Arc<CorpusStore>,
    generation: Arc<dyn GenerationService>,
) -> Router {
    let query_use_case = Arc::new(QueryUseCase::new(
        Arc::clone(&corpus),
        Arc::new(SessionStore::new()),
        Arc::new(MockEmbedding::with_dimensions(8)),
        generation,
    ));
    let assets = Arc::new(PublicDirAssets::new(dir.path().join("public")));
    Router::new(corpus, query_use_case, assets)
}

fn empty_corpus(dir: &tempfile::TempDir) -> Arc<CorpusStore> {
    Arc::new(CorpusStore::empty(
        dir.path().join("index.bin"),
        dir.path().join("metadata.jsonl"),
        8,
    ))
}

async fn populated_corpus(dir: &tempfile::TempDir, texts: &[(&str, &str)]) -> Arc<CorpusStore> {
    let corpus = empty_corpus(dir);
    let embedder = MockEmbedding::with_dimensions(8);
    let mut vectors = Vec::new();
    let mut rows = Vec::new();
    for (filename, text) in texts {
        vectors.push(embedder.embed(text).await.unwrap());
        rows.push(DocumentRow::new(*filename, *text));
    }
    corpus.append_and_flush(&vectors, rows).await.unwrap();
    corpus
}

#[tokio::test]
async fn test_grounded_query_returns_matches() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = populated_corpus(
        &dir,
        &[
            ("burns.txt", "Cool the burn under running water for twenty minutes."),
            ("cuts.txt", "Apply direct pressure to stop the bleeding."),
        ],
    )
    .await;
    let router = router_with(&dir, corpus, Arc::new(MockGeneration::with_answer("ok")));

    let response = router
        .route(&post_query(r#"{"query":"how do I treat a burn"}"#))
        .await;

    assert_eq!(response.status(), 200);
    let parsed: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(parsed["answer"], "ok");
    let matches = parsed["matches"].as_array().unwrap();
    assert!(!matches.is_empty());
    assert!(!parsed["conversation_id"].as_str().unwrap().is_empty());
    for m in matches {
        assert!(m["score"].as_f64().is_some());
        assert!(m["filename"].as_str().unwrap().ends_with(".txt"));
    }
}

#[tokio::test]
async fn test_match_text_is_a_bounded_preview() {
    let dir = tempfile::tempdir().unwrap();
    let long_text = "Wrap the sprained ankle firmly but not tightly. ".repeat(20);
    let corpus = populated_corpus(&dir, &[("sprains.txt", &long_text)]).await;
    let router = router_with(&dir, corpus, Arc::new(MockGeneration::new()));

    let response = router.route(&post_query(r#"{"query":"sprain"}"#)).await;
    let parsed: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    let text = parsed["matches"][0]["text"].as_str().unwrap();

    assert!(text.ends_with("..."));
    assert!(text.len() <= 203, "preview too long: {} bytes", text.len());
}

#[tokio::test]
async fn test_follow_up_carries_conversation_history() {
    let dir = tempfile::tempdir().unwrap();
    let generation = Arc::new(RecordingGeneration::new());
    let router = router_with(
        &dir,
        empty_corpus(&dir),
        Arc::clone(&generation) as Arc<dyn GenerationService>,
    );

    let first = router
        .route(&post_query(
            r#"{"query":"what about nosebleeds","use_context":false}"#,
        ))
        .await;
    let parsed: serde_json::Value = serde_json::from_slice(first.body()).unwrap();
    let conversation_id = parsed["conversation_id"].as_str().unwrap().to_string();

    let follow_up = format!(
        r#"{{"query":"and for children?","conversation_id":"{conversation_id}","use_context":false}}"#
    );
    router.route(&post_query(&follow_up)).await;

    let prompts = generation.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("Previous conversation"));
    assert!(prompts[1].contains("Previous conversation"));
    assert!(prompts[1].contains("what about nosebleeds"));
    assert!(prompts[1].contains("recorded"));
}

#[tokio::test]
async fn test_generation_failure_maps_to_500() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with(&dir, empty_corpus(&dir), Arc::new(FailingGeneration));

    let response = router
        .route(&post_query(r#"{"query":"hi","use_context":false}"#))
        .await;

    assert_eq!(response.status(), 500);
    let parsed: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert!(parsed["error"].as_str().unwrap().contains("unreachable"));
}

#[tokio::test]
async fn test_root_serves_index_html() {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(public.join("index.html"), "<html>first aid</html>").unwrap();

    let router = router_with(&dir, empty_corpus(&dir), Arc::new(MockGeneration::new()));
    let response = router.route(&frame(b"GET / HTTP/1.1\r\n\r\n")).await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.body(), b"<html>first aid</html>");
}

#[tokio::test]
async fn test_path_traversal_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let public = dir.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    std::fs::write(dir.path().join("secret.txt"), "keep out").unwrap();

    let router = router_with(&dir, empty_corpus(&dir), Arc::new(MockGeneration::new()));
    let response = router
        .route(&frame(b"GET /../secret.txt HTTP/1.1\r\n\r\n"))
        .await;

    assert_eq!(response.status(), 403);
}
