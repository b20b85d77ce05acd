//! Creel LLM - completion service clients.
//!
//! This crate exposes one narrow contract, [`LlmProvider::generate`]
//! (`model + prompt -> text`), with Gemini and `OpenAI` implementations over
//! `reqwest` and a scripted [`testing::MockProvider`].
//!
//! # Example
//!
//! ```rust
//! use creel_llm::{testing::MockProvider, LlmProvider};
//!
//! # async fn example() -> creel_llm::Result<()> {
//! let provider = MockProvider::fixed("The Bow is fishing well.");
//! let summary = provider.generate("gemini-2.0-flash", "Summarize these reports").await?;
//! assert_eq!(summary, "The Bow is fishing well.");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod provider;
pub mod providers;
pub mod testing;

// Re-export commonly used types
pub use error::{LlmError, Result};
pub use provider::{CompletionRequest, CompletionResponse, LlmProvider};
pub use providers::{provider_from_config, GeminiProvider, OpenAiProvider};
