// src/providers/gnews.rs
//! GNews search endpoint. Supports language and country filters but no
//! category; the date filter takes a full RFC 3339 timestamp.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{ref_from_url, FetchWindow, Vendor};
use crate::error::IngestError;
use crate::model::{ArticleDraft, Keyword, ProviderConfig};

pub struct GNews;

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<Source>,
}

#[derive(Debug, Deserialize)]
struct Source {
    name: Option<String>,
}

impl Vendor for GNews {
    fn name(&self) -> &'static str {
        "GNews"
    }

    fn query(
        &self,
        provider: &ProviderConfig,
        keyword: &Keyword,
        window: &FetchWindow,
    ) -> Vec<(&'static str, String)> {
        let mut q = vec![
            ("q", keyword.text.clone()),
            ("max", "20".to_string()),
            ("from", window.as_rfc3339()),
            ("apikey", provider.secret.clone()),
            (
                "lang",
                keyword.language.clone().unwrap_or_else(|| "en".to_string()),
            ),
        ];
        if let Some(region) = &keyword.region {
            q.push(("country", region.clone()));
        }
        q
    }

    fn parse(&self, body: &str, keyword: &Keyword) -> Result<Vec<ArticleDraft>, IngestError> {
        let resp: Response = serde_json::from_str(body)
            .map_err(|e| IngestError::Parse(format!("gnews response: {e}")))?;

        Ok(resp
            .articles
            .into_iter()
            .map(|a| {
                let url = a.url.unwrap_or_default();
                let mut metadata = BTreeMap::new();
                if let Some(name) = a.source.and_then(|s| s.name).filter(|n| !n.is_empty()) {
                    metadata.insert("source".to_string(), name);
                }
                ArticleDraft {
                    // GNews exposes no article id.
                    external_ref: ref_from_url(&url),
                    title: a.title.unwrap_or_default(),
                    news_text: a.content.unwrap_or_default(),
                    summary: a.description.unwrap_or_default(),
                    authors: String::new(),
                    url,
                    published_date: a.published_at.unwrap_or_default(),
                    language: keyword.language.clone().unwrap_or_else(|| "en".to_string()),
                    metadata,
                }
            })
            .collect())
    }
}
