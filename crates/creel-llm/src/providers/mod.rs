//! Completion provider implementations.

pub mod common;
pub mod gemini;
pub mod openai;

use std::sync::Arc;

use creel_core::LlmConfig;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;

/// Build the provider named in `config`.
///
/// `api_key` overrides the key stored in the config for that provider.
pub fn provider_from_config(
    config: &LlmConfig,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmProvider>> {
    let client = common::build_http_client(Some(config.timeout_secs))?;
    match config.provider.to_ascii_lowercase().as_str() {
        "gemini" => {
            let key = api_key
                .map(str::to_string)
                .or_else(|| config.gemini_api_key.clone())
                .ok_or_else(|| LlmError::MissingApiKey {
                    provider: "gemini".to_string(),
                })?;
            Ok(Arc::new(GeminiProvider::new(key)?.with_client(client)))
        }
        "openai" => {
            let key = api_key
                .map(str::to_string)
                .or_else(|| config.openai_api_key.clone())
                .ok_or_else(|| LlmError::MissingApiKey {
                    provider: "openai".to_string(),
                })?;
            Ok(Arc::new(OpenAiProvider::new(key)?.with_client(client)))
        }
        other => Err(LlmError::UnknownProvider(other.to_string())),
    }
}
