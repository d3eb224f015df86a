// tests/store_sqlite.rs
// SQLite store semantics: schema, gate, conflict handling, downstream
// claim flow, and the read-only configuration queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use news_ingestor::model::Keyword;
use news_ingestor::store::sqlite::SqliteStore;
use news_ingestor::store::{ArticleStore, ConfigSource, DedupGate};
use news_ingestor::{ArticleDraft, SourceRef, UpsertOutcome};

async fn temp_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}/test.db", dir.path().display());
    let store = SqliteStore::connect(&url).await.unwrap();
    (dir, store)
}

fn draft(external_ref: &str) -> ArticleDraft {
    let mut metadata = BTreeMap::new();
    metadata.insert("source".to_string(), "Example Times".to_string());
    ArticleDraft {
        external_ref: external_ref.to_string(),
        title: "Title".to_string(),
        news_text: "Body".to_string(),
        summary: "Summary".to_string(),
        authors: "Jane Doe".to_string(),
        url: "https://news.example/x".to_string(),
        published_date: "2024-05-06T09:15:00Z".to_string(),
        language: "en".to_string(),
        metadata,
    }
}

#[tokio::test]
async fn insert_conflict_is_skipped_not_error() {
    let (_dir, store) = temp_store().await;
    let provider_id = store.add_provider("News API", "https://x", "k", true).await.unwrap();
    let source = SourceRef::Provider(provider_id);

    // Direct double insert, bypassing the pre-check: the partial unique
    // index turns the second into a no-op.
    assert_eq!(
        store.insert(source, None, &draft("r1")).await.unwrap(),
        UpsertOutcome::Inserted
    );
    assert_eq!(
        store.insert(source, None, &draft("r1")).await.unwrap(),
        UpsertOutcome::Skipped
    );
    assert!(store.exists(source, "r1").await.unwrap());
    assert!(!store.exists(source, "r2").await.unwrap());
}

#[tokio::test]
async fn same_ref_under_different_sources_is_distinct() {
    let (_dir, store) = temp_store().await;
    let provider_id = store.add_provider("News API", "https://x", "k", true).await.unwrap();
    let feed_id = store.add_feed("Some Feed", "https://y", true).await.unwrap();

    let store = Arc::new(store);
    let gate = DedupGate::new(store.clone());
    assert_eq!(
        gate.upsert(SourceRef::Provider(provider_id), None, &draft("shared"))
            .await
            .unwrap(),
        UpsertOutcome::Inserted
    );
    assert_eq!(
        gate.upsert(SourceRef::Feed(feed_id), None, &draft("shared"))
            .await
            .unwrap(),
        UpsertOutcome::Inserted
    );
    assert_eq!(
        gate.upsert(SourceRef::Feed(feed_id), None, &draft("shared"))
            .await
            .unwrap(),
        UpsertOutcome::Skipped
    );
}

#[tokio::test]
async fn unprocessed_round_trip_preserves_fields() {
    let (_dir, store) = temp_store().await;
    let feed_id = store.add_feed("Some Feed", "https://y", true).await.unwrap();
    store
        .insert(SourceRef::Feed(feed_id), None, &draft("e1"))
        .await
        .unwrap();

    let pending = store.unprocessed().await.unwrap();
    assert_eq!(pending.len(), 1);
    let rec = &pending[0];
    assert_eq!(rec.source, SourceRef::Feed(feed_id));
    assert_eq!(rec.keyword_id, None);
    assert_eq!(rec.external_ref, "e1");
    assert_eq!(rec.published_date, "2024-05-06T09:15:00Z");
    assert_eq!(rec.metadata.get("source").unwrap(), "Example Times");
    assert!(rec.processed_at.is_none());

    store.mark_processed(rec.id).await.unwrap();
    assert!(store.unprocessed().await.unwrap().is_empty());
}

#[tokio::test]
async fn config_queries_filter_disabled_and_join_keywords() {
    let (_dir, store) = temp_store().await;
    let enabled = store.add_provider("News API", "https://x", "k", true).await.unwrap();
    store.add_provider("Old Vendor", "https://old", "k", false).await.unwrap();
    store.add_feed("Live Feed", "https://feed", true).await.unwrap();
    store.add_feed("Dead Feed", "https://dead", false).await.unwrap();

    store
        .add_keyword_for_provider(
            enabled,
            &Keyword {
                id: 0,
                text: "library".to_string(),
                language: Some("en".to_string()),
                region: None,
                category: None,
            },
        )
        .await
        .unwrap();

    let providers = store.enabled_providers().await.unwrap();
    assert_eq!(providers.len(), 1);
    let (provider, keywords) = &providers[0];
    assert_eq!(provider.name, "News API");
    assert_eq!(keywords.len(), 1);
    assert_eq!(keywords[0].text, "library");
    assert_eq!(keywords[0].language.as_deref(), Some("en"));

    let feeds = store.enabled_feeds().await.unwrap();
    assert_eq!(feeds.len(), 1);
    assert_eq!(feeds[0].name, "Live Feed");
}
