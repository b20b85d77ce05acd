//! Scripted completion provider for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{LlmError, Result};
use crate::provider::{CompletionRequest, CompletionResponse, LlmProvider};

type Responder = Box<dyn Fn(usize, &str) -> std::result::Result<String, String> + Send + Sync>;

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Model requested
    pub model: Option<String>,
    /// Prompt text
    pub prompt: String,
}

/// Completion provider answering from a closure and recording every call.
pub struct MockProvider {
    responder: Responder,
    counter: AtomicUsize,
    calls: Mutex<Vec<MockCall>>,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl MockProvider {
    /// Answer with `respond(call_index, prompt)`; `Err` becomes an API error.
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(usize, &str) -> std::result::Result<String, String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(respond),
            counter: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_, _| Ok(text.clone()))
    }

    /// Always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_, _| Err(message.clone()))
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst);
        let prompt = request.prompt.clone();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockCall {
                model: request.model.clone(),
                prompt: prompt.clone(),
            });

        match (self.responder)(index, &prompt) {
            Ok(content) => Ok(CompletionResponse {
                content,
                model: request.model.unwrap_or_else(|| "mock".to_string()),
                stop_reason: Some("STOP".to_string()),
            }),
            Err(message) => Err(LlmError::ApiError {
                provider: "mock".to_string(),
                status: 500,
                message,
            }),
        }
    }

    fn provider_id(&self) -> &'static str {
        "mock"
    }
}
