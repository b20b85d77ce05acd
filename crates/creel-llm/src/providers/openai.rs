//! `OpenAI` API provider implementation.

use super::common::{build_http_client, ensure_success, StandardMessage};
use crate::error::{LlmError, Result};
use crate::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// `OpenAI` API provider.
///
/// Supports GPT models via `OpenAI`'s chat completions API.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new `OpenAI` provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_model(api_key, "gpt-4o-mini")
    }

    /// Create a new `OpenAI` provider with a specific default model.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            client: build_http_client(Some(120))?,
            base_url: "https://api.openai.com/v1".to_string(),
        })
    }

    /// Replace the HTTP client (timeouts).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Convert internal request to `OpenAI` API format.
    fn to_api_request(&self, request: &CompletionRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: vec![StandardMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
        }
    }

    /// Convert `OpenAI` API response to internal format.
    fn convert_api_response(response: OpenAiResponse) -> Result<CompletionResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseError {
                provider: "openai".to_string(),
                message: "no choices in response".to_string(),
            })?;

        Ok(CompletionResponse {
            content: choice.message.content,
            model: response.model,
            stop_reason: choice.finish_reason,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_request = self.to_api_request(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&api_request)
            .send()
            .await?;
        let response = ensure_success("openai", response).await?;

        let api_response: OpenAiResponse =
            response.json().await.map_err(|e| LlmError::ParseError {
                provider: "openai".to_string(),
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::convert_api_response(api_response)
    }

    fn provider_id(&self) -> &'static str {
        "openai"
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<StandardMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: StandardMessage,
    finish_reason: Option<String>,
}
