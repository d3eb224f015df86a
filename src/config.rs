// src/config.rs
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::IngestError;

const ENV_PATH: &str = "NEWS_INGESTOR_CONFIG";
const DEFAULT_PATH: &str = "config/ingestor.toml";

/// Runtime configuration for an ingest run. Every field has a default so a
/// missing config file just means "run with defaults".
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// SQLite database URL for the canonical record store.
    pub database_url: String,
    /// Trailing window for provider date filters, in hours.
    pub window_hours: i64,
    /// Timeout for every outbound HTTP call.
    pub http_timeout_secs: u64,
    /// Attempts per (provider, keyword) unit; only transient failures are
    /// retried.
    pub fetch_attempts: u32,
    /// Page-load timeout for headless rendering.
    pub page_load_timeout_secs: u64,
    /// Render retries per feed entry, on top of the first attempt.
    pub render_retries: u32,
    /// Extracted body shorter than this falls back to whole-page text.
    pub min_text_len: usize,
    /// Sources processed concurrently.
    pub max_concurrent_sources: usize,
    /// Concurrent headless browser sessions.
    pub max_concurrent_renders: usize,
    /// Error messages kept per category in each source report.
    pub report_errors_per_category: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:news.db".to_string(),
            window_hours: 24,
            http_timeout_secs: 30,
            fetch_attempts: 1,
            page_load_timeout_secs: 15,
            render_retries: 1,
            min_text_len: 100,
            max_concurrent_sources: 4,
            max_concurrent_renders: 3,
            report_errors_per_category: 5,
        }
    }
}

impl IngestConfig {
    /// Load from an explicit TOML path.
    pub fn load_from(path: &Path) -> Result<Self, IngestError> {
        let content = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("reading config from {}: {e}", path.display()))
        })?;
        let mut cfg: IngestConfig = toml::from_str(&content)
            .map_err(|e| IngestError::Config(format!("parsing {}: {e}", path.display())))?;
        cfg.apply_env();
        Ok(cfg)
    }

    /// Load using `$NEWS_INGESTOR_CONFIG`, then `config/ingestor.toml`,
    /// then defaults. A path set via the env var must exist.
    pub fn load_default() -> Result<Self, IngestError> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = Path::new(&p);
            if !pb.exists() {
                return Err(IngestError::Config(format!(
                    "{ENV_PATH} points to non-existent path {p}"
                )));
            }
            return Self::load_from(pb);
        }
        let fallback = Path::new(DEFAULT_PATH);
        if fallback.exists() {
            return Self::load_from(fallback);
        }
        let mut cfg = Self::default();
        cfg.apply_env();
        Ok(cfg)
    }

    /// `DATABASE_URL` wins over both file and default.
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database_url = url;
            }
        }
    }
}
