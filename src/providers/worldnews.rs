// src/providers/worldnews.rs
//! World News API `search-news`. The only vendor here returning full
//! article text and a sentiment score.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{ref_from_url, FetchWindow, Vendor};
use crate::error::IngestError;
use crate::model::{ArticleDraft, Keyword, ProviderConfig};

pub struct WorldNews;

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    news: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: Option<i64>,
    title: Option<String>,
    text: Option<String>,
    summary: Option<String>,
    url: Option<String>,
    authors: Option<Vec<String>>,
    publish_date: Option<String>,
    language: Option<String>,
    sentiment: Option<f64>,
}

impl Vendor for WorldNews {
    fn name(&self) -> &'static str {
        "WorldNews"
    }

    fn query(
        &self,
        provider: &ProviderConfig,
        keyword: &Keyword,
        window: &FetchWindow,
    ) -> Vec<(&'static str, String)> {
        let mut q = vec![
            ("text", keyword.text.clone()),
            ("number", "20".to_string()),
            ("earliest-publish-date", window.as_date()),
            ("sort", "publish-time".to_string()),
            ("sort-direction", "desc".to_string()),
            ("api-key", provider.secret.clone()),
        ];
        if let Some(language) = &keyword.language {
            q.push(("language", language.clone()));
        }
        if let Some(region) = &keyword.region {
            q.push(("source-country", region.clone()));
        }
        if let Some(category) = &keyword.category {
            q.push(("categories", category.clone()));
        }
        q
    }

    fn parse(&self, body: &str, _keyword: &Keyword) -> Result<Vec<ArticleDraft>, IngestError> {
        let resp: Response = serde_json::from_str(body)
            .map_err(|e| IngestError::Parse(format!("worldnews response: {e}")))?;

        Ok(resp
            .news
            .into_iter()
            .map(|item| {
                let url = item.url.unwrap_or_default();
                let published_date = item.publish_date.unwrap_or_default();
                let mut metadata = BTreeMap::new();
                if let Some(sentiment) = item.sentiment {
                    metadata.insert("sentiment".to_string(), sentiment.to_string());
                }
                if !published_date.is_empty() {
                    metadata.insert("published_date".to_string(), published_date.clone());
                }
                ArticleDraft {
                    external_ref: item
                        .id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| ref_from_url(&url)),
                    title: item.title.unwrap_or_default(),
                    news_text: item.text.unwrap_or_default(),
                    summary: item.summary.unwrap_or_default(),
                    authors: item
                        .authors
                        .map(|a| a.join(", "))
                        .unwrap_or_default(),
                    url,
                    published_date,
                    language: item.language.unwrap_or_default(),
                    metadata,
                }
            })
            .collect())
    }
}
