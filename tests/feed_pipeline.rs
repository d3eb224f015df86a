// tests/feed_pipeline.rs
// Feed adapter state machine against fixture documents: dedup pre-check,
// indirection links, video filter, layered extraction, sentinel bodies.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use news_ingestor::feeds::render::PageRenderer;
use news_ingestor::feeds::{FeedAdapter, CONTENT_UNAVAILABLE};
use news_ingestor::model::FeedConfig;
use news_ingestor::store::memory::MemoryStore;
use news_ingestor::store::DedupGate;
use news_ingestor::{IngestConfig, IngestError, SourceRef};

const FEED: &str = include_str!("fixtures/feed_rss.xml");
const PAGE: &str = include_str!("fixtures/article_page.html");

struct CannedRenderer {
    calls: AtomicUsize,
}

#[async_trait]
impl PageRenderer for CannedRenderer {
    async fn render(&self, _url: &str, _timeout: Duration) -> Result<String, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PAGE.to_string())
    }
}

struct FailingRenderer {
    calls: AtomicUsize,
}

#[async_trait]
impl PageRenderer for FailingRenderer {
    async fn render(&self, url: &str, _timeout: Duration) -> Result<String, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(IngestError::Transient(format!("render timed out: {url}")))
    }
}

fn feed() -> FeedConfig {
    FeedConfig {
        id: 1,
        name: "Aggregated Local News".to_string(),
        endpoint: "https://aggregator.example/rss".to_string(),
        enabled: true,
    }
}

fn adapter(renderer: Arc<dyn PageRenderer>) -> FeedAdapter {
    FeedAdapter::new(
        renderer,
        Arc::new(Semaphore::new(2)),
        &IngestConfig::default(),
    )
}

async fn run_once(adapter: &FeedAdapter, gate: &DedupGate, store_feed: &FeedConfig) -> usize {
    let batch = adapter.ingest_document(gate, store_feed, FEED).await.unwrap();
    let mut inserted = 0;
    for draft in &batch.drafts {
        if gate
            .upsert(SourceRef::Feed(store_feed.id), None, draft)
            .await
            .unwrap()
            == news_ingestor::UpsertOutcome::Inserted
        {
            inserted += 1;
        }
    }
    inserted
}

#[tokio::test]
async fn video_entries_are_hard_skipped_across_runs() {
    let store = Arc::new(MemoryStore::new());
    let gate = DedupGate::new(store.clone());
    let renderer = Arc::new(CannedRenderer {
        calls: AtomicUsize::new(0),
    });
    let adapter = adapter(renderer.clone());
    let feed = feed();

    run_once(&adapter, &gate, &feed).await;
    run_once(&adapter, &gate, &feed).await;

    // Entry E1 resolves to a video host: zero extraction attempts, zero
    // stored records, on both runs.
    assert!(!store
        .records()
        .iter()
        .any(|r| r.external_ref == "E1"));
    // The two non-video entries were stored exactly once.
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn second_run_skips_stored_entries_without_rendering() {
    let store = Arc::new(MemoryStore::new());
    let gate = DedupGate::new(store.clone());
    let renderer = Arc::new(CannedRenderer {
        calls: AtomicUsize::new(0),
    });
    let adapter = adapter(renderer.clone());
    let feed = feed();

    let inserted = run_once(&adapter, &gate, &feed).await;
    assert_eq!(inserted, 2);
    let first_run_renders = renderer.calls.load(Ordering::SeqCst);
    assert_eq!(first_run_renders, 2);

    // Re-run with unchanged upstream data: the pre-check skips both
    // entries before any page load.
    let batch = adapter.ingest_document(&gate, &feed, FEED).await.unwrap();
    assert!(batch.drafts.is_empty());
    assert_eq!(batch.already_stored, 2);
    assert_eq!(batch.skipped_video, 1);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), first_run_renders);
}

#[tokio::test]
async fn extraction_takes_article_body_and_entry_summary() {
    let store = Arc::new(MemoryStore::new());
    let gate = DedupGate::new(store.clone());
    let renderer = Arc::new(CannedRenderer {
        calls: AtomicUsize::new(0),
    });
    let adapter = adapter(renderer);
    let feed = feed();

    let batch = adapter.ingest_document(&gate, &feed, FEED).await.unwrap();
    let budget = batch
        .drafts
        .iter()
        .find(|d| d.external_ref == "E2")
        .unwrap();

    // Body comes from the rendered page's article container.
    assert!(budget.news_text.contains("marathon briefing"));
    assert!(!budget.news_text.contains("analytics"));
    // Summary comes from the entry itself, HTML-stripped.
    assert_eq!(budget.summary, "The council met to discuss the budget.");
    assert_eq!(budget.title, "Council & budget briefing");
    assert_eq!(budget.authors, "Jane Doe");
    // The indirection wrapper was resolved away.
    assert_eq!(budget.url, "https://news.example/budget-briefing");
    assert_eq!(budget.published_date, "Mon, 06 May 2024 09:00:00 GMT");
}

#[tokio::test]
async fn exhausted_render_budget_keeps_record_with_sentinel() {
    let store = Arc::new(MemoryStore::new());
    let gate = DedupGate::new(store.clone());
    let renderer = Arc::new(FailingRenderer {
        calls: AtomicUsize::new(0),
    });
    let adapter = adapter(renderer.clone());
    let feed = feed();

    let inserted = run_once(&adapter, &gate, &feed).await;

    // Entries are kept, not dropped: metadata is still valuable.
    assert_eq!(inserted, 2);
    for record in store.records() {
        assert_eq!(record.news_text, CONTENT_UNAVAILABLE);
        assert!(!record.title.is_empty());
    }
    // Default budget is one retry: two attempts per non-video entry.
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn feed_records_carry_feed_ref_and_no_keyword() {
    let store = Arc::new(MemoryStore::new());
    let gate = DedupGate::new(store.clone());
    let renderer = Arc::new(CannedRenderer {
        calls: AtomicUsize::new(0),
    });
    let adapter = adapter(renderer);
    let feed = feed();

    run_once(&adapter, &gate, &feed).await;
    for record in store.records() {
        assert_eq!(record.source, SourceRef::Feed(1));
        assert_eq!(record.keyword_id, None);
    }
}
