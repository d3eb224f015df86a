// src/model.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin of a stored record: an API provider or a feed, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceRef {
    Provider(i64),
    Feed(i64),
}

impl SourceRef {
    pub fn provider_id(&self) -> Option<i64> {
        match self {
            SourceRef::Provider(id) => Some(*id),
            SourceRef::Feed(_) => None,
        }
    }

    pub fn feed_id(&self) -> Option<i64> {
        match self {
            SourceRef::Provider(_) => None,
            SourceRef::Feed(id) => Some(*id),
        }
    }
}

/// Normalized, source-independent article produced by an adapter.
///
/// Absent optional vendor fields map to empty strings, never null, so
/// downstream text handling stays total. `published_date` keeps the
/// vendor-native string form and is not reparsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDraft {
    /// Identity used for deduplication: the vendor's article id, the feed
    /// entry id, or a synthesized hash when the source has none.
    pub external_ref: String,
    pub title: String,
    pub news_text: String,
    pub summary: String,
    /// Free-text author list, comma-joined.
    pub authors: String,
    pub url: String,
    pub published_date: String,
    pub language: String,
    /// Vendor-specific sidecar (category tags, source name, sentiment).
    /// Serialized to JSON only at the store boundary.
    pub metadata: BTreeMap<String, String>,
}

/// A row from the canonical record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub id: i64,
    pub source: SourceRef,
    /// Search keyword that produced this result; None for feed entries.
    pub keyword_id: Option<i64>,
    pub external_ref: String,
    pub title: String,
    pub news_text: String,
    pub summary: String,
    pub authors: String,
    pub url: String,
    pub published_date: String,
    pub language: String,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    /// Set by a downstream consumer when it claims the record; ingestion
    /// only ever writes NULL here.
    pub processed_at: Option<DateTime<Utc>>,
}

/// Outcome of a gated insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Skipped,
}

/// API provider configuration, owned by the admin collaborator and read
/// here without ever being mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: i64,
    pub name: String,
    /// Base URL of the vendor's search endpoint.
    pub endpoint: String,
    /// API key or token. Empty means the adapter fails fast with a
    /// configuration error.
    pub secret: String,
    pub enabled: bool,
}

/// Search keyword parameterizing a provider fetch. Every field except
/// `text` is optional and vendor-dependent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub id: i64,
    pub text: String,
    pub language: Option<String>,
    pub region: Option<String>,
    pub category: Option<String>,
}

/// RSS/Atom feed configuration. Feeds carry no keywords; every enabled
/// feed is polled in full each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub id: i64,
    pub name: String,
    pub endpoint: String,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ref_is_exclusive() {
        let p = SourceRef::Provider(3);
        assert_eq!(p.provider_id(), Some(3));
        assert_eq!(p.feed_id(), None);

        let f = SourceRef::Feed(7);
        assert_eq!(f.provider_id(), None);
        assert_eq!(f.feed_id(), Some(7));
    }
}
