//! End-to-end index and answer flows through the HTTP router, backed by the in-memory store and
//! stub providers.

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use docqa::{
    api::{ApiSettings, create_router},
    chunking::TextChunker,
    config::RuntimeMode,
    embedding::{Embedder, EmbeddingClient, EmbeddingClientError},
    llm::{LanguageModel, LlmClientError},
    pipeline::{NOT_FOUND_ANSWER, PipelineService},
    vector_store::{InMemoryVectorStore, SequentialIds},
};
use regex::Regex;
use serde_json::{Value, json};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tower::ServiceExt;

/// Maps texts to fixed directions by keyword so similarity ordering is known in advance.
#[derive(Default)]
struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    fn vector_for(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        if lower.contains("cats") {
            vec![1.0, 0.0, 0.0]
        } else if lower.contains("dogs") {
            vec![0.8, 0.6, 0.0]
        } else if lower.contains("birds") {
            vec![0.6, 0.0, 0.8]
        } else {
            vec![0.0, 0.0, 1.0]
        }
    }
}

#[async_trait]
impl EmbeddingClient for KeywordEmbedder {
    async fn generate_embeddings(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| Self::vector_for(text)).collect())
    }
}

#[derive(Default)]
struct RecordingModel {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmClientError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("Cats sleep on mats [1].".to_string())
    }
}

struct Harness {
    app: Router,
    store: Arc<InMemoryVectorStore>,
    embedder: Arc<KeywordEmbedder>,
    model: Arc<RecordingModel>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(InMemoryVectorStore::new(3));
        let embedder = Arc::new(KeywordEmbedder::default());
        let model = Arc::new(RecordingModel::default());
        let service = PipelineService::new(
            TextChunker::new(1000, 200).expect("chunker"),
            Embedder::new(embedder.clone(), 3),
            store.clone(),
            model.clone(),
            Arc::new(SequentialIds::default()),
            3,
        );
        let settings = ApiSettings {
            runtime_mode: RuntimeMode::Development,
            allowed_origins: Vec::new(),
            index_name: "docs".into(),
        };
        Self {
            app: create_router(Arc::new(service), settings),
            store,
            embedder,
            model,
        }
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    async fn index(&self, text: &str) -> Value {
        let (status, body) = self.post("/api/index", json!({ "documentText": text })).await;
        assert_eq!(status, StatusCode::OK, "index failed: {body}");
        body
    }

    async fn ask(&self, question: &str) -> Value {
        let (status, body) = self.post("/api/answer", json!({ "question": question })).await;
        assert_eq!(status, StatusCode::OK, "answer failed: {body}");
        body
    }

    fn prompts(&self) -> Vec<String> {
        self.model.prompts.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn short_document_becomes_one_record() {
    let harness = Harness::new();

    let body = harness.index("A cat sat on a mat. A dog sat on a log.").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["chunkCount"], 1);
    assert_eq!(body["recordCount"], 1);
    assert!(body["duration"].is_u64());
    assert_eq!(harness.store.len().await, 1);
}

#[tokio::test]
async fn unspaced_multibyte_documents_index_cleanly() {
    let harness = Harness::new();

    let japanese = harness.index(&"猫がマットの上に座った".repeat(200)).await;
    assert_eq!(japanese["success"], true);
    assert_eq!(japanese["chunkCount"], 3);
    assert_eq!(japanese["recordCount"], 3);

    let accented = harness.index(&"ü".repeat(2_500)).await;
    assert_eq!(accented["chunkCount"], 4);
    assert_eq!(harness.store.len().await, 7);
}

#[tokio::test]
async fn oversized_document_is_rejected_before_chunking() {
    let harness = Harness::new();

    let (status, body) = harness
        .post("/api/index", json!({ "documentText": "a".repeat(600_001) }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("documentText"));
    assert_eq!(harness.embedder.calls.load(Ordering::SeqCst), 0);
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn empty_store_answers_not_found() {
    let harness = Harness::new();

    let body = harness.ask("Where do cats sleep?").await;

    assert_eq!(
        body,
        json!({
            "success": true,
            "answer": NOT_FOUND_ANSWER,
            "chunksRetrieved": 0,
            "duration": body["duration"].clone(),
        })
    );
    assert!(harness.prompts().is_empty());
}

#[tokio::test]
async fn prompt_lists_retrieved_chunks_in_relevance_order() {
    let harness = Harness::new();
    for text in ["Birds sleep in nests.", "Dogs sleep on logs.", "Cats sleep on mats."] {
        harness.index(text).await;
    }

    let body = harness.ask("Where do cats sleep?").await;

    assert_eq!(body["chunksRetrieved"], 3);
    assert_eq!(body["answer"], "Cats sleep on mats [1].");

    let prompts = harness.prompts();
    assert_eq!(prompts.len(), 1);
    let items = Regex::new(r"(?m)^\[(\d+)\] (.+)$").unwrap();
    let found: Vec<(String, String)> = items
        .captures_iter(&prompts[0])
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("1".to_string(), "Cats sleep on mats.".to_string()),
            ("2".to_string(), "Dogs sleep on logs.".to_string()),
            ("3".to_string(), "Birds sleep in nests.".to_string()),
        ]
    );
    assert!(prompts[0].contains("Question: Where do cats sleep?"));
}

#[tokio::test]
async fn repeated_questions_retrieve_the_same_context() {
    let harness = Harness::new();
    harness.index("Cats sleep on mats.").await;
    harness.index("Dogs sleep on logs.").await;

    let first = harness.ask("Where do dogs sleep?").await;
    let second = harness.ask("Where do dogs sleep?").await;

    assert_eq!(first["chunksRetrieved"], 2);
    assert_eq!(first["chunksRetrieved"], second["chunksRetrieved"]);
    let prompts = harness.prompts();
    assert_eq!(prompts[0], prompts[1]);
}

#[tokio::test]
async fn metrics_track_both_operations() {
    let harness = Harness::new();
    harness.ask("Anything about cats?").await;
    harness.index("Cats sleep on mats.").await;
    harness.ask("Anything about cats?").await;

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .expect("request");
    let response = harness.app.clone().oneshot(request).await.expect("response");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let metrics: Value = serde_json::from_slice(&bytes).expect("json");

    assert_eq!(
        metrics,
        json!({
            "documentsIndexed": 1,
            "chunksIndexed": 1,
            "questionsAnswered": 2,
            "questionsWithoutContext": 1,
        })
    );
}
