//! Configuration management for Creel.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/creel/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Fan-out settings shared by every pipeline phase
    pub pipeline: PipelineConfig,
    /// Site crawl settings
    pub crawl: CrawlConfig,
    /// Map-reduce summarization settings
    pub summarizer: SummarizerConfig,
    /// Business listing search settings
    pub listing: ListingConfig,
    /// Completion service settings
    pub llm: LlmConfig,
    /// Job store settings
    pub jobs: JobsConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults if missing.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `CREEL_CONCURRENCY`: Override pipeline fan-out limit
    /// - `CREEL_HEADLESS`: Override browser headless mode (true/false)
    /// - `CREEL_GEMINI_API_KEY`: Gemini API key
    /// - `CREEL_OPENAI_API_KEY`: `OpenAI` API key
    /// - `CREEL_SERP_API_KEY`: Listing search API key
    /// - `CREEL_DATABASE_PATH`: Job store database file
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup function.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("CREEL_CONCURRENCY") {
            if let Ok(concurrency) = val.parse() {
                self.pipeline.concurrency = concurrency;
                tracing::debug!("Override pipeline.concurrency from env: {}", concurrency);
            }
        }

        if let Some(val) = lookup("CREEL_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(key) = lookup("CREEL_GEMINI_API_KEY") {
            self.llm.gemini_api_key = Some(key);
        }

        if let Some(key) = lookup("CREEL_OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key);
        }

        if let Some(key) = lookup("CREEL_SERP_API_KEY") {
            self.listing.api_key = Some(key);
        }

        if let Some(path) = lookup("CREEL_DATABASE_PATH") {
            tracing::debug!("Override jobs.database_path from env: {}", path);
            self.jobs.database_path = Some(PathBuf::from(path));
        }
    }

    /// Reject values that would make a pipeline unable to run.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pipeline.concurrency == 0 {
            return Err(invalid("pipeline.concurrency", "must be at least 1"));
        }
        if self.listing.page_size == 0 {
            return Err(invalid("listing.page_size", "must be at least 1"));
        }
        if self.browser.load_attempts == 0 {
            return Err(invalid("browser.load_attempts", "must be at least 1"));
        }
        if self.crawl.default_depth == 0 {
            return Err(invalid("crawl.default_depth", "must be at least 1"));
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| invalid("config_path", "no parent directory"))?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/creel/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("org", "creel", "creel").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/creel`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("org", "creel", "creel").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Resolve the job database path, defaulting into the data directory.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.jobs.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("jobs.db")),
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Extra Chromium launch arguments
    pub launch_args: Vec<String>,
    /// Per-navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Delay between navigation attempts in milliseconds
    pub retry_backoff_ms: u64,
    /// Total navigation attempts per load
    pub load_attempts: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            launch_args: vec!["--start-maximized".to_string(), "--no-sandbox".to_string()],
            navigation_timeout_secs: 15,
            retry_backoff_ms: 1000,
            load_attempts: 2,
        }
    }
}

/// Fan-out settings shared by every pipeline phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of work units in flight per phase
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { concurrency: 5 }
    }
}

/// Site crawl settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Distinct URLs visited per site when the job does not say otherwise
    pub default_depth: usize,
    /// CSS selector used when a site row carries none
    pub default_selector: String,
    /// Attach the visited/to-visit listing as a secondary file
    pub include_site_list: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            default_depth: 25,
            default_selector: "body".to_string(),
            include_site_list: false,
        }
    }
}

/// Map-reduce summarization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Estimated token budget per chunk
    pub token_limit: usize,
    /// Model used for both map and reduce calls
    pub model: String,
    /// Prompt appended after each chunk
    pub summary_prompt: String,
    /// Prompt placed before the joined chunk summaries
    pub merge_prompt: String,
    /// Reports older than this many days are dropped
    pub max_age_days: i64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            token_limit: 50_000,
            model: "gemini-2.0-flash".to_string(),
            summary_prompt: "Summarize the fishing reports above by river. Keep flies, \
                             flows, water temperatures and dates."
                .to_string(),
            merge_prompt: "Merge the following per-section summaries into one report \
                           grouped by river, removing duplicates."
                .to_string(),
            max_age_days: 30,
        }
    }
}

/// Business listing search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Search API base URL
    pub base_url: String,
    /// Search engine name passed to the API
    pub engine: String,
    /// Records requested per page
    pub page_size: usize,
    /// Cap on total records when the job does not say otherwise
    pub default_max_results: usize,
    /// API key (never written to disk)
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://serpapi.com/search.json".to_string(),
            engine: "google_maps".to_string(),
            page_size: 20,
            default_max_results: 100,
            api_key: None,
        }
    }
}

/// Completion service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider: `gemini` or `openai`
    pub provider: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Gemini API key (never written to disk)
    #[serde(skip)]
    pub gemini_api_key: Option<String>,
    /// `OpenAI` API key (never written to disk)
    #[serde(skip)]
    pub openai_api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            timeout_secs: 120,
            gemini_api_key: None,
            openai_api_key: None,
        }
    }
}

/// Job store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// `SQLite` database file; defaults into the data directory
    pub database_path: Option<PathBuf>,
    /// Completed jobs kept per kind by the cleanup command
    pub keep_completed_per_kind: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            keep_completed_per_kind: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.concurrency, 5);
        assert_eq!(config.browser.navigation_timeout_secs, 15);
        assert_eq!(config.browser.load_attempts, 2);
        assert_eq!(config.listing.page_size, 20);
        assert_eq!(config.jobs.keep_completed_per_kind, 5);
        assert!(config.browser.headless);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_skips_secrets() {
        let mut config = AppConfig::default();
        config.llm.gemini_api_key = Some("secret".to_string());
        config.listing.api_key = Some("serp-secret".to_string());

        let toml_str = toml::to_string_pretty(&config).expect("serialize config");
        assert!(toml_str.contains("[browser]"));
        assert!(toml_str.contains("[summarizer]"));
        assert!(!toml_str.contains("secret"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert!(parsed.llm.gemini_api_key.is_none());
        assert_eq!(parsed.summarizer.model, config.summarizer.model);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.crawl.default_depth = 7;
        config.pipeline.concurrency = 2;
        fs::write(
            &config_path,
            toml::to_string_pretty(&config).expect("serialize config"),
        )
        .expect("write config file");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert_eq!(loaded.crawl.default_depth, 7);
        assert_eq!(loaded.pipeline.concurrency, 2);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded = AppConfig::load_from(&tmp.path().join("absent.toml")).expect("load config");
        assert_eq!(loaded.pipeline.concurrency, 5);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CREEL_CONCURRENCY", "9"),
            ("CREEL_HEADLESS", "false"),
            ("CREEL_SERP_API_KEY", "serp"),
            ("CREEL_DATABASE_PATH", "/tmp/creel.db"),
        ]);

        let mut config = AppConfig::default();
        config.apply_env(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.pipeline.concurrency, 9);
        assert!(!config.browser.headless);
        assert_eq!(config.listing.api_key.as_deref(), Some("serp"));
        assert_eq!(
            config.database_path().expect("database path"),
            PathBuf::from("/tmp/creel.db")
        );
    }

    #[test]
    fn test_unparseable_env_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|key| (key == "CREEL_CONCURRENCY").then(|| "many".to_string()));
        assert_eq!(config.pipeline.concurrency, 5);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[crawl]
default_depth = 12

[pipeline]
concurrency = 3
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.crawl.default_depth, 12);
        assert_eq!(config.pipeline.concurrency, 3);
        assert_eq!(config.crawl.default_selector, "body");
        assert!(config.browser.headless);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = AppConfig::default();
        config.pipeline.concurrency = 0;
        let err = config.validate().expect_err("zero concurrency is invalid");
        assert!(err.to_string().contains("pipeline.concurrency"));
    }
}
