// src/store/memory.rs
//! In-memory store used by integration tests and embedded setups. Mirrors
//! the SQLite semantics, including conflict-as-skip on insert.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::IngestError;
use crate::model::{
    ArticleDraft, ArticleRecord, FeedConfig, Keyword, ProviderConfig, SourceRef, UpsertOutcome,
};
use crate::store::{ArticleStore, ConfigSource};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    records: Vec<ArticleRecord>,
    providers: Vec<(ProviderConfig, Vec<Keyword>)>,
    feeds: Vec<FeedConfig>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&self, provider: ProviderConfig, keywords: Vec<Keyword>) {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.providers.push((provider, keywords));
    }

    pub fn add_feed(&self, feed: FeedConfig) {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        inner.feeds.push(feed);
    }

    pub fn records(&self) -> Vec<ArticleRecord> {
        self.inner
            .lock()
            .expect("memory store mutex poisoned")
            .records
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("memory store mutex poisoned")
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn exists(&self, source: SourceRef, external_ref: &str) -> Result<bool, IngestError> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner
            .records
            .iter()
            .any(|r| r.source == source && r.external_ref == external_ref))
    }

    async fn insert(
        &self,
        source: SourceRef,
        keyword_id: Option<i64>,
        draft: &ArticleDraft,
    ) -> Result<UpsertOutcome, IngestError> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        if inner
            .records
            .iter()
            .any(|r| r.source == source && r.external_ref == draft.external_ref)
        {
            return Ok(UpsertOutcome::Skipped);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.push(ArticleRecord {
            id,
            source,
            keyword_id,
            external_ref: draft.external_ref.clone(),
            title: draft.title.clone(),
            news_text: draft.news_text.clone(),
            summary: draft.summary.clone(),
            authors: draft.authors.clone(),
            url: draft.url.clone(),
            published_date: draft.published_date.clone(),
            language: draft.language.clone(),
            metadata: draft.metadata.clone(),
            created_at: Utc::now(),
            processed_at: None,
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn unprocessed(&self) -> Result<Vec<ArticleRecord>, IngestError> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner
            .records
            .iter()
            .filter(|r| r.processed_at.is_none())
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, id: i64) -> Result<(), IngestError> {
        let mut inner = self.inner.lock().expect("memory store mutex poisoned");
        if let Some(rec) = inner.records.iter_mut().find(|r| r.id == id) {
            rec.processed_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigSource for MemoryStore {
    async fn enabled_providers(
        &self,
    ) -> Result<Vec<(ProviderConfig, Vec<Keyword>)>, IngestError> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner
            .providers
            .iter()
            .filter(|(p, _)| p.enabled)
            .cloned()
            .collect())
    }

    async fn enabled_feeds(&self) -> Result<Vec<FeedConfig>, IngestError> {
        let inner = self.inner.lock().expect("memory store mutex poisoned");
        Ok(inner.feeds.iter().filter(|f| f.enabled).cloned().collect())
    }
}
