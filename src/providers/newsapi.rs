// src/providers/newsapi.rs
//! NewsAPI.org `everything` search.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{ref_from_url, FetchWindow, Vendor};
use crate::error::IngestError;
use crate::model::{ArticleDraft, Keyword, ProviderConfig};

pub struct NewsApi;

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    source: Option<Source>,
    author: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Source {
    name: Option<String>,
}

impl Vendor for NewsApi {
    fn name(&self) -> &'static str {
        "NewsAPI"
    }

    fn query(
        &self,
        provider: &ProviderConfig,
        keyword: &Keyword,
        window: &FetchWindow,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("q", keyword.text.clone()),
            ("pageSize", "20".to_string()),
            ("from", window.as_date()),
            ("sortBy", "publishedAt".to_string()),
            ("apiKey", provider.secret.clone()),
            (
                "language",
                keyword.language.clone().unwrap_or_else(|| "en".to_string()),
            ),
        ]
    }

    fn parse(&self, body: &str, keyword: &Keyword) -> Result<Vec<ArticleDraft>, IngestError> {
        let resp: Response = serde_json::from_str(body)
            .map_err(|e| IngestError::Parse(format!("newsapi response: {e}")))?;

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
                    // NewsAPI exposes no article id.
                    external_ref: ref_from_url(&url),
                    title: a.title.unwrap_or_default(),
                    news_text: a.content.unwrap_or_default(),
                    summary: a.description.unwrap_or_default(),
                    authors: a.author.unwrap_or_default(),
                    url,
                    published_date: a.published_at.unwrap_or_default(),
                    language: keyword.language.clone().unwrap_or_else(|| "en".to_string()),
                    metadata,
                }
            })
            .collect())
    }
}
