// src/store/mod.rs
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::IngestError;
use crate::model::{
    ArticleDraft, ArticleRecord, FeedConfig, Keyword, ProviderConfig, SourceRef, UpsertOutcome,
};

/// Canonical record store. Insert-only from the pipeline's point of view;
/// `mark_processed` exists for the downstream consumer side of the
/// contract and is never called during ingestion.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Is there already a record with this identity for this source?
    async fn exists(&self, source: SourceRef, external_ref: &str) -> Result<bool, IngestError>;

    /// Insert unless a record with the same (source, external_ref) already
    /// exists. A conflict is `Skipped`, not an error, so concurrent
    /// writers stay safe.
    async fn insert(
        &self,
        source: SourceRef,
        keyword_id: Option<i64>,
        draft: &ArticleDraft,
    ) -> Result<UpsertOutcome, IngestError>;

    /// Rows not yet claimed by a downstream consumer
    /// (`processed_at IS NULL`), oldest first.
    async fn unprocessed(&self) -> Result<Vec<ArticleRecord>, IngestError>;

    /// Downstream claim.
    async fn mark_processed(&self, id: i64) -> Result<(), IngestError>;
}

/// Read-only view of the admin collaborator's configuration tables.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Enabled providers with their associated keywords.
    async fn enabled_providers(&self)
        -> Result<Vec<(ProviderConfig, Vec<Keyword>)>, IngestError>;

    async fn enabled_feeds(&self) -> Result<Vec<FeedConfig>, IngestError>;
}

/// Existence-check-then-insert gate shared by every adapter path.
///
/// The pre-check keeps re-runs cheap (feed entries skip their page fetch
/// entirely on a hit); the insert itself still treats an index conflict as
/// `Skipped`, so the gate holds even with concurrent writers.
#[derive(Clone)]
pub struct DedupGate {
    store: Arc<dyn ArticleStore>,
}

impl DedupGate {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    pub async fn exists(
        &self,
        source: SourceRef,
        external_ref: &str,
    ) -> Result<bool, IngestError> {
        self.store.exists(source, external_ref).await
    }

    pub async fn upsert(
        &self,
        source: SourceRef,
        keyword_id: Option<i64>,
        draft: &ArticleDraft,
    ) -> Result<UpsertOutcome, IngestError> {
        if self.store.exists(source, &draft.external_ref).await? {
            return Ok(UpsertOutcome::Skipped);
        }
        self.store.insert(source, keyword_id, draft).await
    }
}
