//! Creel Core - Foundation crate for the Creel report gathering workspace.
//!
//! This crate provides shared types, error handling, configuration management,
//! and the URL identity rules that every pipeline depends on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes and enums (`JobId`, `JobKind`)
//! - [`urls`] - URL normalization and domain equality
//!
//! # Example
//!
//! ```rust
//! use creel_core::{urls, AppConfig};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.pipeline.concurrency, 5);
//! assert!(urls::same_domain("https://www.example.com/a", "http://example.com/b?x=1"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;
pub mod urls;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, CrawlConfig, JobsConfig, ListingConfig, LlmConfig,
    PipelineConfig, SummarizerConfig,
};
pub use error::{ConfigError, ConfigResult, CreelError, Result};
pub use types::{JobId, JobKind};
