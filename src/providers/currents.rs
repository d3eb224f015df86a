// src/providers/currents.rs
//! Currents API keyword search.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{ref_from_url, FetchWindow, Vendor};
use crate::error::IngestError;
use crate::model::{ArticleDraft, Keyword, ProviderConfig};

pub struct Currents;

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    news: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    author: Option<String>,
    published: Option<String>,
    language: Option<String>,
    category: Option<Vec<String>>,
}

impl Vendor for Currents {
    fn name(&self) -> &'static str {
        "Currents"
    }

    fn query(
        &self,
        provider: &ProviderConfig,
        keyword: &Keyword,
        window: &FetchWindow,
    ) -> Vec<(&'static str, String)> {
        let mut q = vec![
            ("keyword", keyword.text.clone()),
            // type 1 restricts results to news articles.
            ("type", "1".to_string()),
            ("page_size", "20".to_string()),
            ("start_date", window.as_date()),
            ("apiKey", provider.secret.clone()),
            (
                "language",
                keyword.language.clone().unwrap_or_else(|| "en".to_string()),
            ),
        ];
        if let Some(category) = &keyword.category {
            q.push(("category", category.clone()));
        }
        if let Some(region) = &keyword.region {
            q.push(("country", region.clone()));
        }
        q
    }

    fn parse(&self, body: &str, _keyword: &Keyword) -> Result<Vec<ArticleDraft>, IngestError> {
        let resp: Response = serde_json::from_str(body)
            .map_err(|e| IngestError::Parse(format!("currents response: {e}")))?;

        Ok(resp
            .news
            .into_iter()
            .map(|item| {
                let url = item.url.unwrap_or_default();
                let description = item.description.unwrap_or_default();
                let mut metadata = BTreeMap::new();
                if let Some(category) = item.category.filter(|c| !c.is_empty()) {
                    metadata.insert("category".to_string(), category.join(", "));
                }
                ArticleDraft {
                    external_ref: item
                        .id
                        .filter(|id| !id.is_empty())
                        .unwrap_or_else(|| ref_from_url(&url)),
                    title: item.title.unwrap_or_default(),
                    news_text: description.clone(),
                    summary: description,
                    authors: item.author.unwrap_or_default(),
                    url,
                    published_date: item.published.unwrap_or_default(),
                    language: item.language.unwrap_or_default(),
                    metadata,
                }
            })
            .collect())
    }
}
