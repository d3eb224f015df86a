// src/pipeline.rs
//! Ingestion orchestrator: enumerates enabled sources, fans work units out
//! over a bounded pool, applies the retry policy, and aggregates a run
//! report. Per-unit failures never abort sibling units.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::error::{ErrorCategory, IngestError};
use crate::feeds::{render::PageRenderer, FeedAdapter};
use crate::model::{ArticleDraft, Keyword, ProviderConfig, SourceRef, UpsertOutcome};
use crate::providers::{
    currents::Currents, gnews::GNews, newsapi::NewsApi, newsdata::NewsData,
    worldnews::WorldNews, SourceAdapter, VendorAdapter,
};
use crate::store::{ArticleStore, ConfigSource, DedupGate};

/// One-time metrics registration (so series show up wherever a recorder
/// is installed).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_articles_fetched_total",
            "Articles returned by source adapters."
        );
        describe_counter!(
            "ingest_articles_inserted_total",
            "Articles written to the record store."
        );
        describe_counter!(
            "ingest_articles_skipped_total",
            "Articles skipped by the dedup gate."
        );
        describe_counter!("ingest_source_errors_total", "Adapter fetch/parse errors.");
        describe_counter!(
            "ingest_render_failures_total",
            "Headless render attempts that failed."
        );
        describe_counter!(
            "ingest_video_skipped_total",
            "Feed entries skipped as video-host links."
        );
        describe_counter!("ingest_feed_entries_total", "Entries parsed from feeds.");
        describe_histogram!("ingest_fetch_ms", "Provider fetch time in milliseconds.");
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when an ingest run last finished."
        );
    });
}

/// Per-source counters plus the first few error messages per category.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
    errors: Vec<(ErrorCategory, String)>,
}

impl SourceReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            fetched: 0,
            inserted: 0,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[(ErrorCategory, String)] {
        &self.errors
    }

    fn record_error(&mut self, err: &IngestError, per_category_cap: usize) {
        let category = err.category();
        let seen = self.errors.iter().filter(|(c, _)| *c == category).count();
        if seen < per_category_cap {
            self.errors.push((category, err.to_string()));
        }
    }
}

/// Aggregate of one run. Per-item failures live in the per-source counts;
/// the run itself completed if this struct exists at all.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn total_fetched(&self) -> usize {
        self.sources.iter().map(|s| s.fetched).sum()
    }

    pub fn total_inserted(&self) -> usize {
        self.sources.iter().map(|s| s.inserted).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.sources.iter().map(|s| s.skipped).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.sources.iter().map(|s| s.failed).sum()
    }

    pub fn log(&self) {
        for s in &self.sources {
            info!(
                source = %s.source,
                fetched = s.fetched,
                inserted = s.inserted,
                skipped = s.skipped,
                failed = s.failed,
                "source run finished"
            );
            for (category, message) in &s.errors {
                warn!(source = %s.source, category = ?category, %message, "run error");
            }
        }
        info!(
            fetched = self.total_fetched(),
            inserted = self.total_inserted(),
            skipped = self.total_skipped(),
            failed = self.total_failed(),
            "ingest run finished"
        );
    }
}

/// The orchestrator. Construction wires every dependency explicitly; there
/// is no process-wide state to reset between tests.
pub struct Ingestor {
    cfg: IngestConfig,
    http: reqwest::Client,
    config_source: Arc<dyn ConfigSource>,
    gate: DedupGate,
    feeds: FeedAdapter,
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl Ingestor {
    pub fn new(
        cfg: IngestConfig,
        config_source: Arc<dyn ConfigSource>,
        store: Arc<dyn ArticleStore>,
        renderer: Arc<dyn PageRenderer>,
    ) -> Result<Self, IngestError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()
            .map_err(|e| IngestError::Config(format!("http client: {e}")))?;

        let render_slots = Arc::new(Semaphore::new(cfg.max_concurrent_renders.max(1)));
        let feeds = FeedAdapter::new(renderer, render_slots, &cfg);

        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(VendorAdapter::new(NewsApi, http.clone(), cfg.window_hours)),
            Box::new(VendorAdapter::new(NewsData, http.clone(), cfg.window_hours)),
            Box::new(VendorAdapter::new(Currents, http.clone(), cfg.window_hours)),
            Box::new(VendorAdapter::new(WorldNews, http.clone(), cfg.window_hours)),
            Box::new(VendorAdapter::new(GNews, http.clone(), cfg.window_hours)),
        ];

        Ok(Self {
            cfg,
            http,
            config_source,
            gate: DedupGate::new(store),
            feeds,
            adapters,
        })
    }

    /// Replace the vendor registry. Used by tests to run the orchestrator
    /// against stub adapters.
    pub fn with_adapters(mut self, adapters: Vec<Box<dyn SourceAdapter>>) -> Self {
        self.adapters = adapters;
        self
    }

    /// Match a configured provider to its adapter by normalized name, so
    /// "News API", "newsapi" and "NewsAPI.org" all resolve the same way.
    fn adapter_for(&self, provider: &ProviderConfig) -> Option<&dyn SourceAdapter> {
        let wanted = normalize_name(&provider.name);
        self.adapters
            .iter()
            .find(|a| wanted.starts_with(&normalize_name(a.name())))
            .map(|a| a.as_ref())
    }

    /// Run every enabled API provider. Fails only when configuration
    /// cannot be read at all; everything past that point is isolated into
    /// the report.
    pub async fn run_providers(&self) -> Result<RunReport, IngestError> {
        ensure_metrics_described();
        let providers = self.config_source.enabled_providers().await?;
        info!(count = providers.len(), "starting provider run");

        let sources = stream::iter(
            providers
                .into_iter()
                .map(|(provider, keywords)| self.run_provider(provider, keywords)),
        )
        .buffer_unordered(self.cfg.max_concurrent_sources.max(1))
        .collect::<Vec<_>>()
        .await;

        gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        Ok(RunReport { sources })
    }

    /// Run every enabled feed.
    pub async fn run_feeds(&self) -> Result<RunReport, IngestError> {
        ensure_metrics_described();
        let feeds = self.config_source.enabled_feeds().await?;
        info!(count = feeds.len(), "starting feed run");

        let sources = stream::iter(feeds.into_iter().map(|feed| self.run_feed(feed)))
            .buffer_unordered(self.cfg.max_concurrent_sources.max(1))
            .collect::<Vec<_>>()
            .await;

        gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        Ok(RunReport { sources })
    }

    async fn run_provider(&self, provider: ProviderConfig, keywords: Vec<Keyword>) -> SourceReport {
        let mut report = SourceReport::new(&provider.name);
        let cap = self.cfg.report_errors_per_category;

        let Some(adapter) = self.adapter_for(&provider) else {
            let err = IngestError::Config(format!(
                "no adapter registered for provider '{}'",
                provider.name
            ));
            warn!(provider = %provider.name, error = %err, "provider skipped");
            report.failed += 1;
            report.record_error(&err, cap);
            return report;
        };

        for keyword in &keywords {
            match self.fetch_with_retry(adapter, &provider, keyword).await {
                Ok(drafts) => {
                    report.fetched += drafts.len();
                    self.upsert_drafts(
                        SourceRef::Provider(provider.id),
                        Some(keyword.id),
                        &drafts,
                        &mut report,
                    )
                    .await;
                }
                Err(e) => {
                    counter!("ingest_source_errors_total").increment(1);
                    warn!(
                        provider = %provider.name,
                        keyword = %keyword.text,
                        category = ?e.category(),
                        error = %e,
                        "keyword fetch failed"
                    );
                    report.failed += 1;
                    report.record_error(&e, cap);
                    // Credentials or the vendor contract are broken;
                    // remaining keywords would fail identically.
                    if matches!(
                        e,
                        IngestError::Config(_) | IngestError::VendorRejection { .. }
                    ) {
                        break;
                    }
                }
            }
        }
        report
    }

    async fn run_feed(&self, feed: crate::model::FeedConfig) -> SourceReport {
        let mut report = SourceReport::new(&feed.name);
        let cap = self.cfg.report_errors_per_category;

        match self.feeds.fetch(&self.http, &self.gate, &feed).await {
            Ok(batch) => {
                report.fetched = batch.drafts.len();
                report.skipped += batch.already_stored + batch.skipped_video;
                report.failed += batch.failed;
                self.upsert_drafts(SourceRef::Feed(feed.id), None, &batch.drafts, &mut report)
                    .await;
            }
            Err(e) => {
                counter!("ingest_source_errors_total").increment(1);
                warn!(feed = %feed.name, category = ?e.category(), error = %e, "feed failed");
                report.failed += 1;
                report.record_error(&e, cap);
            }
        }
        report
    }

    async fn upsert_drafts(
        &self,
        source: SourceRef,
        keyword_id: Option<i64>,
        drafts: &[ArticleDraft],
        report: &mut SourceReport,
    ) {
        for draft in drafts {
            match self.gate.upsert(source, keyword_id, draft).await {
                Ok(UpsertOutcome::Inserted) => {
                    counter!("ingest_articles_inserted_total").increment(1);
                    report.inserted += 1;
                }
                Ok(UpsertOutcome::Skipped) => {
                    counter!("ingest_articles_skipped_total").increment(1);
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(external_ref = %draft.external_ref, error = %e, "insert failed");
                    report.failed += 1;
                    report.record_error(&e, self.cfg.report_errors_per_category);
                }
            }
        }
    }

    /// Bounded retry of transient failures only. API adapters default to a
    /// single attempt; the feed path carries its own render retry budget.
    async fn fetch_with_retry(
        &self,
        adapter: &dyn SourceAdapter,
        provider: &ProviderConfig,
        keyword: &Keyword,
    ) -> Result<Vec<ArticleDraft>, IngestError> {
        let attempts = self.cfg.fetch_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match adapter.fetch(provider, keyword).await {
                Ok(drafts) => return Ok(drafts),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(
                        provider = %provider.name,
                        keyword = %keyword.text,
                        attempt,
                        error = %e,
                        "transient fetch failure, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
