// src/store/sqlite.rs
use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::error::IngestError;
use crate::model::{
    ArticleDraft, ArticleRecord, FeedConfig, Keyword, ProviderConfig, SourceRef, UpsertOutcome,
};
use crate::store::{ArticleStore, ConfigSource};

/// Schema is applied on connect; every statement is idempotent. The two
/// partial unique indexes back the dedup gate: an insert that loses a race
/// lands on `ON CONFLICT DO NOTHING` and is reported as skipped.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS news_providers (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    endpoint    TEXT NOT NULL,
    secret      TEXT NOT NULL DEFAULT '',
    enabled     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS feed_providers (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    endpoint    TEXT NOT NULL,
    enabled     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS search_keywords (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword     TEXT NOT NULL,
    language    TEXT,
    region      TEXT,
    category    TEXT
);

CREATE TABLE IF NOT EXISTS keyword_news_provider (
    keyword_id       INTEGER NOT NULL REFERENCES search_keywords(id),
    news_provider_id INTEGER NOT NULL REFERENCES news_providers(id),
    PRIMARY KEY (keyword_id, news_provider_id)
);

CREATE TABLE IF NOT EXISTS news (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    external_ref   TEXT NOT NULL,
    title          TEXT NOT NULL,
    news_text      TEXT NOT NULL DEFAULT '',
    summary        TEXT NOT NULL DEFAULT '',
    authors        TEXT NOT NULL DEFAULT '',
    url            TEXT NOT NULL DEFAULT '',
    published_date TEXT NOT NULL DEFAULT '',
    language       TEXT NOT NULL DEFAULT '',
    metadata       TEXT NOT NULL DEFAULT '{}',
    provider_id    INTEGER REFERENCES news_providers(id),
    feed_id        INTEGER REFERENCES feed_providers(id),
    keyword_id     INTEGER REFERENCES search_keywords(id),
    created_at     TEXT NOT NULL,
    processed_at   TEXT,
    CHECK ((provider_id IS NULL) <> (feed_id IS NULL))
);

CREATE UNIQUE INDEX IF NOT EXISTS ux_news_provider_ref
    ON news(provider_id, external_ref) WHERE provider_id IS NOT NULL;
CREATE UNIQUE INDEX IF NOT EXISTS ux_news_feed_ref
    ON news(feed_id, external_ref) WHERE feed_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS ix_news_unprocessed
    ON news(processed_at) WHERE processed_at IS NULL;
"#;

/// SQLite-backed canonical record store, also serving the read-only
/// configuration queries.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self, IngestError> {
        let opts = SqliteConnectOptions::from_str(database_url)
            .map_err(IngestError::Store)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Bootstrap helpers. The admin collaborator owns these tables in
    // production; these exist for seeding and tests.

    pub async fn add_provider(
        &self,
        name: &str,
        endpoint: &str,
        secret: &str,
        enabled: bool,
    ) -> Result<i64, IngestError> {
        let res =
            sqlx::query("INSERT INTO news_providers (name, endpoint, secret, enabled) VALUES (?, ?, ?, ?)")
                .bind(name)
                .bind(endpoint)
                .bind(secret)
                .bind(enabled)
                .execute(&self.pool)
                .await?;
        Ok(res.last_insert_rowid())
    }

    pub async fn add_feed(
        &self,
        name: &str,
        endpoint: &str,
        enabled: bool,
    ) -> Result<i64, IngestError> {
        let res = sqlx::query("INSERT INTO feed_providers (name, endpoint, enabled) VALUES (?, ?, ?)")
            .bind(name)
            .bind(endpoint)
            .bind(enabled)
            .execute(&self.pool)
            .await?;
        Ok(res.last_insert_rowid())
    }

    pub async fn add_keyword_for_provider(
        &self,
        provider_id: i64,
        keyword: &Keyword,
    ) -> Result<i64, IngestError> {
        let res = sqlx::query(
            "INSERT INTO search_keywords (keyword, language, region, category) VALUES (?, ?, ?, ?)",
        )
        .bind(&keyword.text)
        .bind(&keyword.language)
        .bind(&keyword.region)
        .bind(&keyword.category)
        .execute(&self.pool)
        .await?;
        let keyword_id = res.last_insert_rowid();
        sqlx::query("INSERT INTO keyword_news_provider (keyword_id, news_provider_id) VALUES (?, ?)")
            .bind(keyword_id)
            .bind(provider_id)
            .execute(&self.pool)
            .await?;
        Ok(keyword_id)
    }

    fn record_from_row(row: &SqliteRow) -> Result<ArticleRecord, IngestError> {
        let provider_id: Option<i64> = row.get("provider_id");
        let feed_id: Option<i64> = row.get("feed_id");
        let source = match (provider_id, feed_id) {
            (Some(id), None) => SourceRef::Provider(id),
            (None, Some(id)) => SourceRef::Feed(id),
            // Unreachable past the CHECK constraint.
            _ => {
                return Err(IngestError::Parse(
                    "news row violates exactly-one-source invariant".to_string(),
                ))
            }
        };
        let metadata_json: String = row.get("metadata");
        let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata_json)
            .map_err(|e| IngestError::Parse(format!("metadata sidecar: {e}")))?;
        Ok(ArticleRecord {
            id: row.get("id"),
            source,
            keyword_id: row.get("keyword_id"),
            external_ref: row.get("external_ref"),
            title: row.get("title"),
            news_text: row.get("news_text"),
            summary: row.get("summary"),
            authors: row.get("authors"),
            url: row.get("url"),
            published_date: row.get("published_date"),
            language: row.get("language"),
            metadata,
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
            processed_at: row.get::<Option<DateTime<Utc>>, _>("processed_at"),
        })
    }
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn exists(&self, source: SourceRef, external_ref: &str) -> Result<bool, IngestError> {
        let count: i64 = match source {
            SourceRef::Provider(id) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM news WHERE provider_id = ? AND external_ref = ?",
                )
                .bind(id)
                .bind(external_ref)
                .fetch_one(&self.pool)
                .await?
            }
            SourceRef::Feed(id) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM news WHERE feed_id = ? AND external_ref = ?",
                )
                .bind(id)
                .bind(external_ref)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(count > 0)
    }

    async fn insert(
        &self,
        source: SourceRef,
        keyword_id: Option<i64>,
        draft: &ArticleDraft,
    ) -> Result<UpsertOutcome, IngestError> {
        let metadata_json = serde_json::to_string(&draft.metadata)
            .map_err(|e| IngestError::Parse(format!("metadata sidecar: {e}")))?;
        let res = sqlx::query(
            r#"
            INSERT INTO news (
                external_ref, title, news_text, summary, authors, url,
                published_date, language, metadata,
                provider_id, feed_id, keyword_id, created_at, processed_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&draft.external_ref)
        .bind(&draft.title)
        .bind(&draft.news_text)
        .bind(&draft.summary)
        .bind(&draft.authors)
        .bind(&draft.url)
        .bind(&draft.published_date)
        .bind(&draft.language)
        .bind(metadata_json)
        .bind(source.provider_id())
        .bind(source.feed_id())
        .bind(keyword_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            Ok(UpsertOutcome::Skipped)
        } else {
            Ok(UpsertOutcome::Inserted)
        }
    }

    async fn unprocessed(&self) -> Result<Vec<ArticleRecord>, IngestError> {
        let rows = sqlx::query("SELECT * FROM news WHERE processed_at IS NULL ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::record_from_row).collect()
    }

    async fn mark_processed(&self, id: i64) -> Result<(), IngestError> {
        sqlx::query("UPDATE news SET processed_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigSource for SqliteStore {
    async fn enabled_providers(
        &self,
    ) -> Result<Vec<(ProviderConfig, Vec<Keyword>)>, IngestError> {
        let provider_rows = sqlx::query(
            "SELECT id, name, endpoint, secret, enabled FROM news_providers WHERE enabled = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(provider_rows.len());
        for row in provider_rows {
            let provider = ProviderConfig {
                id: row.get("id"),
                name: row.get("name"),
                endpoint: row.get("endpoint"),
                secret: row.get("secret"),
                enabled: row.get("enabled"),
            };
            let keyword_rows = sqlx::query(
                r#"
                SELECT k.id, k.keyword, k.language, k.region, k.category
                FROM search_keywords k
                JOIN keyword_news_provider j ON j.keyword_id = k.id
                WHERE j.news_provider_id = ?
                ORDER BY k.id
                "#,
            )
            .bind(provider.id)
            .fetch_all(&self.pool)
            .await?;
            let keywords = keyword_rows
                .iter()
                .map(|k| Keyword {
                    id: k.get("id"),
                    text: k.get("keyword"),
                    language: k.get("language"),
                    region: k.get("region"),
                    category: k.get("category"),
                })
                .collect();
            out.push((provider, keywords));
        }
        Ok(out)
    }

    async fn enabled_feeds(&self) -> Result<Vec<FeedConfig>, IngestError> {
        let rows = sqlx::query(
            "SELECT id, name, endpoint, enabled FROM feed_providers WHERE enabled = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| FeedConfig {
                id: row.get("id"),
                name: row.get("name"),
                endpoint: row.get("endpoint"),
                enabled: row.get("enabled"),
            })
            .collect())
    }
}
