//! Grounded prompt assembly and answer generation.

use crate::llm::{LanguageModel, LlmClientError};
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;

const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that answers questions using ONLY the context provided below. \
Do not use any outside knowledge. If the answer is not contained in the context, say explicitly that \
the provided context does not contain the answer.";

const CITATION_INSTRUCTION: &str = "Answer the question using only the context above. \
Cite the sources you use with their bracketed numbers, for example [1] or [2][3].";

/// Errors raised while generating an answer.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// No context was supplied; callers must handle empty retrieval first.
    #[error("cannot generate an answer without context")]
    NoContext,
    /// The language model call failed.
    #[error(transparent)]
    Llm(#[from] LlmClientError),
}

/// Build the grounded prompt for `question` over `context`.
///
/// Context items are numbered from 1 in input order and separated by a blank line.
pub fn build_prompt(question: &str, context: &[String]) -> Result<String, AnswerError> {
    if context.is_empty() {
        return Err(AnswerError::NoContext);
    }

    let mut prompt = String::with_capacity(
        SYSTEM_INSTRUCTION.len()
            + CITATION_INSTRUCTION.len()
            + question.len()
            + context.iter().map(|item| item.len() + 8).sum::<usize>()
            + 64,
    );
    prompt.push_str(SYSTEM_INSTRUCTION);
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(question);
    prompt.push_str("\n\nContext:\n");
    for (index, item) in context.iter().enumerate() {
        if index > 0 {
            prompt.push_str("\n\n");
        }
        let _ = write!(prompt, "[{}] {}", index + 1, item);
    }
    prompt.push_str("\n\n");
    prompt.push_str(CITATION_INSTRUCTION);
    Ok(prompt)
}

/// Produces cited answers through a [`LanguageModel`].
#[derive(Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn LanguageModel>,
}

impl AnswerGenerator {
    /// Wrap a language-model client.
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Answer `question` from `context`; the model's text is returned as-is.
    pub async fn generate(&self, question: &str, context: &[String]) -> Result<String, AnswerError> {
        let prompt = build_prompt(question, context)?;
        tracing::debug!(
            context_items = context.len(),
            prompt_chars = prompt.chars().count(),
            "Requesting completion"
        );
        Ok(self.model.complete(&prompt).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingModel {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn complete(&self, prompt: &str) -> Result<String, LlmClientError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(" raw answer [1] \n".to_string())
        }
    }

    fn context(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn prompt_numbers_context_in_order() {
        let prompt = build_prompt("Where did the cat sit?", &context(&["on a mat", "near a dog"]))
            .expect("prompt");
        assert!(prompt.starts_with(SYSTEM_INSTRUCTION));
        assert!(prompt.contains("Question: Where did the cat sit?"));
        assert!(prompt.contains("[1] on a mat\n\n[2] near a dog"));
        assert!(prompt.ends_with(CITATION_INSTRUCTION));
        assert!(prompt.find("[1] on a mat").unwrap() < prompt.find("[2] near a dog").unwrap());
    }

    #[test]
    fn prompt_is_deterministic() {
        let items = context(&["a", "b", "c"]);
        assert_eq!(
            build_prompt("q", &items).unwrap(),
            build_prompt("q", &items).unwrap()
        );
    }

    #[test]
    fn empty_context_is_rejected() {
        assert!(matches!(build_prompt("q", &[]), Err(AnswerError::NoContext)));
    }

    #[tokio::test]
    async fn generate_returns_model_text_unmodified() {
        let model = Arc::new(RecordingModel::default());
        let generator = AnswerGenerator::new(model.clone());
        let answer = generator
            .generate("q", &context(&["only chunk"]))
            .await
            .expect("answer");
        assert_eq!(answer, " raw answer [1] \n");
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("[1] only chunk"));
    }

    #[tokio::test]
    async fn generate_without_context_skips_model() {
        let model = Arc::new(RecordingModel::default());
        let generator = AnswerGenerator::new(model.clone());
        assert!(matches!(
            generator.generate("q", &[]).await,
            Err(AnswerError::NoContext)
        ));
        assert!(model.prompts.lock().unwrap().is_empty());
    }
}
