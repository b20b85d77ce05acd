//! Google Gemini API provider implementation.

use super::common::{build_http_client, ensure_success};
use crate::error::{LlmError, Result};
use crate::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API provider.
///
/// Calls the `generateContent` endpoint with the prompt as a single user
/// turn.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_model(api_key, "gemini-2.0-flash")
    }

    /// Create a new Gemini provider with a specific default model.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            client: build_http_client(Some(120))?,
        })
    }

    /// Replace the HTTP client (timeouts).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Convert internal request to Gemini API format.
    fn to_api_request(request: &CompletionRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
        }
    }

    /// Convert Gemini API response to internal format.
    fn convert_api_response(model: &str, response: GeminiResponse) -> Result<CompletionResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseError {
                provider: "gemini".to_string(),
                message: "no candidates in response".to_string(),
            })?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: text,
            model: response
                .model_version
                .unwrap_or_else(|| model.to_string()),
            stop_reason: candidate.finish_reason,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.as_deref().unwrap_or(&self.model).to_string();
        let api_request = Self::to_api_request(&request);
        tracing::debug!("Gemini request to {} ({} chars)", model, request.prompt.len());

        let response = self
            .client
            .post(format!("{BASE_URL}/models/{model}:generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&api_request)
            .send()
            .await?;
        let response = ensure_success("gemini", response).await?;

        let api_response: GeminiResponse =
            response.json().await.map_err(|e| LlmError::ParseError {
                provider: "gemini".to_string(),
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::convert_api_response(&model, api_response)
    }

    fn provider_id(&self) -> &'static str {
        "gemini"
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = GeminiProvider::new("test-key").expect("create provider");
        assert_eq!(provider.provider_id(), "gemini");
        assert_eq!(provider.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_api_request_is_single_user_turn() {
        let json = serde_json::to_value(GeminiProvider::to_api_request(
            &CompletionRequest::new("Hello").with_model("gemini-2.0-flash"),
        ))
        .expect("serialize request");

        assert_eq!(json["contents"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_convert_api_response() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Caddis "}, {"text": "hatch."}]},
                "finishReason": "STOP"
            }],
            "modelVersion": "gemini-2.0-flash-001"
        }"#;
        let response: GeminiResponse = serde_json::from_str(raw).expect("parse response");
        let converted =
            GeminiProvider::convert_api_response("gemini-2.0-flash", response).expect("convert");

        assert_eq!(converted.content, "Caddis hatch.");
        assert_eq!(converted.model, "gemini-2.0-flash-001");
        assert_eq!(converted.stop_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_convert_response_without_candidates() {
        let response: GeminiResponse = serde_json::from_str("{}").expect("parse response");
        assert!(matches!(
            GeminiProvider::convert_api_response("m", response),
            Err(LlmError::ParseError { .. })
        ));
    }
}
