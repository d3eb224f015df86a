// src/providers/mod.rs
pub mod currents;
pub mod gnews;
pub mod newsapi;
pub mod newsdata;
pub mod worldnews;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use metrics::{counter, histogram};
use sha2::{Digest, Sha256};

use crate::error::IngestError;
use crate::model::{ArticleDraft, Keyword, ProviderConfig};

/// One bounded fetch for a (provider, keyword) unit of work. Purely
/// functional aside from the HTTP call; writing to the store is the
/// orchestrator's job.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(
        &self,
        provider: &ProviderConfig,
        keyword: &Keyword,
    ) -> Result<Vec<ArticleDraft>, IngestError>;
}

/// Trailing date window applied where the vendor supports a date filter.
#[derive(Debug, Clone)]
pub struct FetchWindow {
    pub start: DateTime<Utc>,
}

impl FetchWindow {
    pub fn last_hours(hours: i64) -> Self {
        Self {
            start: Utc::now() - Duration::hours(hours),
        }
    }

    pub fn as_date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn as_rfc3339(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Vendor-specific request/response contract plugged into `VendorAdapter`.
///
/// Implementations stay pure: query construction and body mapping only, so
/// each vendor is testable against canned responses without a network.
pub trait Vendor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Query parameters for one keyword. Only parameters the vendor
    /// actually supports; the window is ignored by vendors without a date
    /// filter.
    fn query(
        &self,
        provider: &ProviderConfig,
        keyword: &Keyword,
        window: &FetchWindow,
    ) -> Vec<(&'static str, String)>;

    /// Map the vendor response body onto canonical drafts. Absent optional
    /// fields become empty strings.
    fn parse(&self, body: &str, keyword: &Keyword) -> Result<Vec<ArticleDraft>, IngestError>;
}

/// Shared fetch skeleton: credential check, request construction, one
/// bounded HTTP call, status classification, vendor parse. The HTTP client
/// is injected (it carries the global request timeout), so adapters hold
/// no process-wide state.
pub struct VendorAdapter<V> {
    vendor: V,
    http: reqwest::Client,
    window_hours: i64,
}

impl<V: Vendor> VendorAdapter<V> {
    pub fn new(vendor: V, http: reqwest::Client, window_hours: i64) -> Self {
        Self {
            vendor,
            http,
            window_hours,
        }
    }
}

#[async_trait]
impl<V: Vendor> SourceAdapter for VendorAdapter<V> {
    fn name(&self) -> &'static str {
        self.vendor.name()
    }

    async fn fetch(
        &self,
        provider: &ProviderConfig,
        keyword: &Keyword,
    ) -> Result<Vec<ArticleDraft>, IngestError> {
        if provider.secret.trim().is_empty() {
            return Err(IngestError::Config(format!(
                "provider '{}' has no API credential",
                provider.name
            )));
        }

        let window = FetchWindow::last_hours(self.window_hours);
        let query = self.vendor.query(provider, keyword, &window);

        let t0 = std::time::Instant::now();
        let resp = self
            .http
            .get(&provider.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(IngestError::from_reqwest)?;
        let status = resp.status();
        let body = resp.text().await.map_err(IngestError::from_reqwest)?;
        histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if !status.is_success() {
            return Err(IngestError::from_status(status.as_u16(), &body));
        }

        let drafts = self.vendor.parse(&body, keyword)?;
        counter!("ingest_articles_fetched_total").increment(drafts.len() as u64);
        Ok(drafts)
    }
}

/// Stable fallback identity for vendors that expose no article id. Keyed
/// off the URL, which repeats across runs for the same article.
pub fn ref_from_url(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("url:{:x}", hasher.finalize())
}
