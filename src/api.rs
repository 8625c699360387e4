//! HTTP surface for docqa.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /api/index` – Chunk a document, embed the chunks, and store them in the index.
//!   Body `{ "documentText": string }`; returns `{ success, message, chunkCount, recordCount, duration }`.
//! - `POST /api/answer` – Answer a question from indexed content.
//!   Body `{ "question": string }`; returns `{ success, answer, chunksRetrieved, duration }`.
//! - `GET /health` – Liveness with runtime mode and index name.
//! - `GET /metrics` – Indexing and answering counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools.
//!
//! Failures use `{ success: false, error }`. Validation problems (including malformed JSON) map to
//! 400; everything else maps to 500 with a generic message, plus `details` outside production.

use crate::config::{Config, RuntimeMode};
use crate::pipeline::{
    AnswerQuestionRequest, IndexDocumentRequest, PipelineApi, PipelineError, ValidationError,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

// Room for a maximum-length document of multibyte characters plus JSON escaping.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

const INDEX_FAILURE: &str = "Failed to index document";
const ANSWER_FAILURE: &str = "Failed to answer question";

/// Deployment settings that shape HTTP behavior.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Controls error detail exposure and CORS policy.
    pub runtime_mode: RuntimeMode,
    /// Origins accepted by CORS in production.
    pub allowed_origins: Vec<String>,
    /// Index name reported by `/health`.
    pub index_name: String,
}

impl ApiSettings {
    /// Derive HTTP settings from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            runtime_mode: config.runtime_mode,
            allowed_origins: config.cors_allowed_origins.clone(),
            index_name: config.qdrant_index_name.clone(),
        }
    }
}

struct AppState<S> {
    service: Arc<S>,
    settings: Arc<ApiSettings>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            settings: Arc::clone(&self.settings),
        }
    }
}

/// Build the HTTP router exposing the pipeline.
pub fn create_router<S>(service: Arc<S>, settings: ApiSettings) -> Router
where
    S: PipelineApi + 'static,
{
    let cors = cors_layer(&settings);
    let state = AppState {
        service,
        settings: Arc::new(settings),
    };

    Router::new()
        .route("/api/index", post(index_document::<S>))
        .route("/api/answer", post(answer_question::<S>))
        .route("/health", get(health::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(settings: &ApiSettings) -> CorsLayer {
    match settings.runtime_mode {
        RuntimeMode::Development => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        RuntimeMode::Production => {
            let origins: Vec<HeaderValue> = settings
                .allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            if origins.is_empty() {
                tracing::warn!("No CORS origins configured; cross-origin requests will be refused");
            }
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
        }
    }
}

#[derive(Serialize)]
struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

impl<T> Success<T> {
    fn new(body: T) -> Json<Self> {
        Json(Self {
            success: true,
            body,
        })
    }
}

/// Index a document.
async fn index_document<S>(
    State(state): State<AppState<S>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError>
where
    S: PipelineApi,
{
    let fail = |error: PipelineError| AppError::new(error, INDEX_FAILURE, &state.settings);
    let request = parse_body(body)
        .and_then(|body| IndexDocumentRequest::from_json(&body))
        .map_err(|error| fail(error.into()))?;
    let outcome = state.service.index_document(request).await.map_err(fail)?;
    Ok(Success::new(outcome))
}

/// Answer a question.
async fn answer_question<S>(
    State(state): State<AppState<S>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError>
where
    S: PipelineApi,
{
    let fail = |error: PipelineError| AppError::new(error, ANSWER_FAILURE, &state.settings);
    let request = parse_body(body)
        .and_then(|body| AnswerQuestionRequest::from_json(&body))
        .map_err(|error| fail(error.into()))?;
    let outcome = state.service.answer_question(request).await.map_err(fail)?;
    Ok(Success::new(outcome))
}

fn parse_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ValidationError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ValidationError::InvalidJson(rejection.body_text()))
}

async fn health<S>(State(state): State<AppState<S>>) -> Json<Value>
where
    S: PipelineApi,
{
    Json(json!({
        "status": "ok",
        "mode": state.settings.runtime_mode.as_str(),
        "index": state.settings.index_name,
    }))
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(state): State<AppState<S>>) -> impl IntoResponse
where
    S: PipelineApi,
{
    Json(state.service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "index",
                method: "POST",
                path: "/api/index",
                description: "Chunk a document (up to 500,000 characters), embed each chunk, and store the vectors. Returns { success, message, chunkCount, recordCount, duration }.",
                request_example: Some(json!({ "documentText": "Document contents" })),
            },
            CommandDescriptor {
                name: "answer",
                method: "POST",
                path: "/api/answer",
                description: "Answer a question (up to 1000 characters) from indexed content with bracketed citations. Returns { success, answer, chunksRetrieved, duration }.",
                request_example: Some(json!({ "question": "What does the document say?" })),
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Report liveness, runtime mode, and index name.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return indexing and answering counters.",
                request_example: None,
            },
        ],
    })
}

struct AppError {
    error: PipelineError,
    summary: &'static str,
    expose_details: bool,
}

impl AppError {
    fn new(error: PipelineError, summary: &'static str, settings: &ApiSettings) -> Self {
        Self {
            error,
            summary,
            expose_details: settings.runtime_mode.exposes_error_details(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.error.is_client_error() {
            tracing::warn!(error = %self.error, "Rejected request");
            let body = json!({ "success": false, "error": self.error.to_string() });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }

        let mut body = json!({ "success": false, "error": self.summary });
        if self.expose_details {
            body["details"] = Value::String(self.error.to_string());
        }
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSnapshot;
    use crate::pipeline::{AnswerOutcome, IndexOutcome, NOT_FOUND_ANSWER};
    use crate::vector_store::VectorStoreError;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubPipeline {
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubPipeline {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn outage() -> PipelineError {
            PipelineError::VectorStore(VectorStoreError::IndexNotFound("docs".into()))
        }
    }

    #[async_trait]
    impl PipelineApi for StubPipeline {
        async fn index_document(
            &self,
            request: IndexDocumentRequest,
        ) -> Result<IndexOutcome, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Self::outage());
            }
            Ok(IndexOutcome {
                message: "Document indexed successfully".into(),
                chunk_count: request.document_text().len().div_ceil(10),
                record_count: request.document_text().len().div_ceil(10),
                duration: 5,
            })
        }

        async fn answer_question(
            &self,
            _request: AnswerQuestionRequest,
        ) -> Result<AnswerOutcome, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Self::outage());
            }
            Ok(AnswerOutcome {
                answer: NOT_FOUND_ANSWER.into(),
                chunks_retrieved: 0,
                duration: 3,
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_indexed: 4,
                ..MetricsSnapshot::default()
            }
        }
    }

    fn settings(runtime_mode: RuntimeMode) -> ApiSettings {
        ApiSettings {
            runtime_mode,
            allowed_origins: vec!["https://docs.example.com".into()],
            index_name: "docs".into(),
        }
    }

    async fn send(
        service: Arc<StubPipeline>,
        mode: RuntimeMode,
        method: Method,
        uri: &str,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let app = create_router(service, settings(mode));
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = app.oneshot(request).await.expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn index_success_shape() {
        let service = Arc::new(StubPipeline::default());
        let (status, body) = send(
            service.clone(),
            RuntimeMode::Development,
            Method::POST,
            "/api/index",
            Some(json!({ "documentText": "The cat sat on the mat." }).to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Document indexed successfully");
        assert_eq!(body["chunkCount"], 3);
        assert_eq!(body["recordCount"], 3);
        assert_eq!(body["duration"], 5);
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn oversized_document_is_rejected_before_the_pipeline() {
        let service = Arc::new(StubPipeline::default());
        let text = "x".repeat(600_001);
        let (status, body) = send(
            service.clone(),
            RuntimeMode::Development,
            Method::POST,
            "/api/index",
            Some(json!({ "documentText": text }).to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("500000"));
        assert!(body.get("details").is_none());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_json_is_a_client_error() {
        let service = Arc::new(StubPipeline::default());
        let (status, body) = send(
            service.clone(),
            RuntimeMode::Production,
            Method::POST,
            "/api/answer",
            Some("{\"question\": ".into()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn non_string_question_is_rejected() {
        let service = Arc::new(StubPipeline::default());
        let (status, body) = send(
            service.clone(),
            RuntimeMode::Development,
            Method::POST,
            "/api/answer",
            Some(json!({ "question": ["not", "text"] }).to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "`question` must be a string");
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn not_found_answer_is_a_success() {
        let service = Arc::new(StubPipeline::default());
        let (status, body) = send(
            service,
            RuntimeMode::Development,
            Method::POST,
            "/api/answer",
            Some(json!({ "question": "Anything?" }).to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["chunksRetrieved"], 0);
        assert_eq!(body["answer"], NOT_FOUND_ANSWER);
    }

    #[tokio::test]
    async fn server_errors_hide_details_in_production() {
        let (status, body) = send(
            Arc::new(StubPipeline::failing()),
            RuntimeMode::Production,
            Method::POST,
            "/api/index",
            Some(json!({ "documentText": "text" }).to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "success": false, "error": INDEX_FAILURE }));
    }

    #[tokio::test]
    async fn server_errors_include_details_in_development() {
        let (status, body) = send(
            Arc::new(StubPipeline::failing()),
            RuntimeMode::Development,
            Method::POST,
            "/api/answer",
            Some(json!({ "question": "Why?" }).to_string()),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], ANSWER_FAILURE);
        assert!(body["details"].as_str().unwrap().contains("docs"));
    }

    #[tokio::test]
    async fn health_and_metrics_report_state() {
        let service = Arc::new(StubPipeline::default());
        let (status, health) = send(
            service.clone(),
            RuntimeMode::Production,
            Method::GET,
            "/health",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health, json!({ "status": "ok", "mode": "production", "index": "docs" }));

        let (_, metrics) = send(service, RuntimeMode::Production, Method::GET, "/metrics", None).await;
        assert_eq!(metrics["documentsIndexed"], 4);
        assert_eq!(metrics["questionsAnswered"], 0);
    }

    #[tokio::test]
    async fn commands_catalog_exposes_both_operations() {
        let commands = get_commands().await.0.commands;
        let paths: Vec<_> = commands.iter().map(|command| command.path).collect();
        assert!(paths.contains(&"/api/index"));
        assert!(paths.contains(&"/api/answer"));
        assert!(commands.iter().all(|command| command.method == "GET" || command.request_example.is_some()));
    }
}
