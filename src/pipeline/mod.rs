//! Index and answer orchestration over the chunker, embedder, store, and model.

mod service;
pub mod types;
pub mod validation;

pub use service::{NOT_FOUND_ANSWER, PipelineApi, PipelineService};
pub use types::{AnswerOutcome, IndexOutcome, PipelineError};
pub use validation::{AnswerQuestionRequest, IndexDocumentRequest, ValidationError};
