// tests/ingest_pipeline.rs
// Failure isolation in the orchestrator: one bad keyword, vendor, or
// provider never takes down its siblings.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use news_ingestor::feeds::render::PageRenderer;
use news_ingestor::model::{Keyword, ProviderConfig};
use news_ingestor::providers::SourceAdapter;
use news_ingestor::store::memory::MemoryStore;
use news_ingestor::{ArticleDraft, ErrorCategory, IngestConfig, IngestError, Ingestor};

struct NullRenderer;

#[async_trait]
impl PageRenderer for NullRenderer {
    async fn render(&self, _url: &str, _timeout: Duration) -> Result<String, IngestError> {
        Ok(String::new())
    }
}

/// Adapter that fails for keywords named "bad" and counts every call.
struct FlakyAdapter {
    name: &'static str,
    calls: Arc<AtomicUsize>,
    rejection: bool,
}

#[async_trait]
impl SourceAdapter for FlakyAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(
        &self,
        provider: &ProviderConfig,
        keyword: &Keyword,
    ) -> Result<Vec<ArticleDraft>, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if keyword.text == "bad" {
            if self.rejection {
                return Err(IngestError::VendorRejection {
                    status: 401,
                    message: "invalid key".to_string(),
                });
            }
            return Err(IngestError::Transient("upstream hiccup".to_string()));
        }
        Ok(vec![ArticleDraft {
            external_ref: format!("{}-{}", provider.id, keyword.text),
            title: keyword.text.clone(),
            ..Default::default()
        }])
    }
}

fn keyword(id: i64, text: &str) -> Keyword {
    Keyword {
        id,
        text: text.to_string(),
        language: None,
        region: None,
        category: None,
    }
}

fn provider(id: i64, name: &str) -> ProviderConfig {
    ProviderConfig {
        id,
        name: name.to_string(),
        endpoint: "https://stub.example".to_string(),
        secret: "k".to_string(),
        enabled: true,
    }
}

fn ingestor(store: Arc<MemoryStore>, adapters: Vec<Box<dyn SourceAdapter>>) -> Ingestor {
    Ingestor::new(
        IngestConfig::default(),
        store.clone(),
        store,
        Arc::new(NullRenderer),
    )
    .unwrap()
    .with_adapters(adapters)
}

#[tokio::test]
async fn transient_keyword_failure_does_not_block_siblings() {
    let store = Arc::new(MemoryStore::new());
    store.add_provider(
        provider(1, "Flaky News"),
        vec![keyword(1, "bad"), keyword(2, "good")],
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let ingestor = ingestor(
        store.clone(),
        vec![Box::new(FlakyAdapter {
            name: "Flaky",
            calls: calls.clone(),
            rejection: false,
        })],
    );

    let report = ingestor.run_providers().await.unwrap();
    assert_eq!(report.total_failed(), 1);
    assert_eq!(report.total_inserted(), 1);
    // Both keywords were attempted despite the first failing.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.len(), 1);

    let errors = report.sources[0].errors();
    assert!(errors
        .iter()
        .any(|(c, m)| *c == ErrorCategory::Transient && m.contains("hiccup")));
}

#[tokio::test]
async fn vendor_rejection_stops_that_provider_only() {
    let store = Arc::new(MemoryStore::new());
    store.add_provider(
        provider(1, "Broken News"),
        vec![keyword(1, "bad"), keyword(2, "good")],
    );
    store.add_provider(provider(2, "Healthy Wire"), vec![keyword(3, "good")]);

    let broken_calls = Arc::new(AtomicUsize::new(0));
    let healthy_calls = Arc::new(AtomicUsize::new(0));
    let ingestor = ingestor(
        store.clone(),
        vec![
            Box::new(FlakyAdapter {
                name: "Broken",
                calls: broken_calls.clone(),
                rejection: true,
            }),
            Box::new(FlakyAdapter {
                name: "Healthy",
                calls: healthy_calls.clone(),
                rejection: false,
            }),
        ],
    );

    let report = ingestor.run_providers().await.unwrap();

    // A rejection means credentials are broken: remaining keywords for
    // that vendor are not attempted.
    assert_eq!(broken_calls.load(Ordering::SeqCst), 1);
    // The sibling provider still ran to completion.
    assert_eq!(healthy_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.len(), 1);

    let broken = report
        .sources
        .iter()
        .find(|s| s.source == "Broken News")
        .unwrap();
    assert!(broken
        .errors()
        .iter()
        .any(|(c, _)| *c == ErrorCategory::VendorRejection));
}

#[tokio::test]
async fn unknown_provider_is_reported_not_fatal() {
    let store = Arc::new(MemoryStore::new());
    store.add_provider(provider(1, "Mystery Vendor"), vec![keyword(1, "good")]);
    store.add_provider(provider(2, "Flaky News"), vec![keyword(2, "good")]);

    let calls = Arc::new(AtomicUsize::new(0));
    let ingestor = ingestor(
        store.clone(),
        vec![Box::new(FlakyAdapter {
            name: "Flaky",
            calls: calls.clone(),
            rejection: false,
        })],
    );

    let report = ingestor.run_providers().await.unwrap();
    let mystery = report
        .sources
        .iter()
        .find(|s| s.source == "Mystery Vendor")
        .unwrap();
    assert_eq!(mystery.failed, 1);
    assert!(mystery
        .errors()
        .iter()
        .any(|(c, _)| *c == ErrorCategory::Config));
    // The recognized provider still ingested.
    assert_eq!(store.len(), 1);
}
