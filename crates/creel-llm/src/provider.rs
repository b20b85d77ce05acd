//! Core completion trait and request/response types.

use crate::error::{LlmError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A completion service.
///
/// Implementations must be thread-safe: the summarizer calls one provider
/// from many concurrent workers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a request with a single response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the unique identifier for this provider.
    fn provider_id(&self) -> &str;

    /// Send `prompt` to `model` and return the trimmed text.
    ///
    /// An empty answer is an error so callers can count it as a failed call.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let response = self
            .complete(CompletionRequest::new(prompt).with_model(model))
            .await?;
        let text = response.content.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: self.provider_id().to_string(),
            });
        }
        Ok(text.to_string())
    }
}

/// Request for a completion: one user prompt and an optional model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model override; providers fall back to their default model
    pub model: Option<String>,

    /// The user prompt
    pub prompt: String,
}

impl CompletionRequest {
    /// Create a new completion request for `prompt`.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            prompt: prompt.into(),
        }
    }

    /// Select the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Response from a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Stop reason (e.g., "`STOP`", "`length`")
    pub stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;

    #[test]
    fn test_completion_request_builder() {
        let req = CompletionRequest::new("Hello").with_model("gemini-2.0-flash");

        assert_eq!(req.prompt, "Hello");
        assert_eq!(req.model.as_deref(), Some("gemini-2.0-flash"));
    }

    #[tokio::test]
    async fn test_generate_trims_and_passes_model() {
        let provider = MockProvider::fixed("  Hatches are strong.\n");
        let text = provider
            .generate("gemini-2.0-flash", "summarize")
            .await
            .expect("generate");

        assert_eq!(text, "Hatches are strong.");
        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(calls[0].prompt, "summarize");
    }

    #[tokio::test]
    async fn test_generate_rejects_blank_answer() {
        let provider = MockProvider::fixed("   ");
        let err = provider
            .generate("m", "summarize")
            .await
            .expect_err("blank");
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }
}
