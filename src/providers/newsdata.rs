// src/providers/newsdata.rs
//! NewsData.io `latest` search. No date parameter on this endpoint; the
//! vendor's `removeduplicate` flag does server-side dedup instead.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{ref_from_url, FetchWindow, Vendor};
use crate::error::IngestError;
use crate::model::{ArticleDraft, Keyword, ProviderConfig};

pub struct NewsData;

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    results: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    article_id: Option<String>,
    title: Option<String>,
    link: Option<String>,
    creator: Option<Vec<String>>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    language: Option<String>,
    keywords: Option<Vec<String>>,
}

impl Vendor for NewsData {
    fn name(&self) -> &'static str {
        "NewsData"
    }

    fn query(
        &self,
        provider: &ProviderConfig,
        keyword: &Keyword,
        _window: &FetchWindow,
    ) -> Vec<(&'static str, String)> {
        let mut q = vec![
            ("q", keyword.text.clone()),
            ("removeduplicate", "1".to_string()),
            ("apikey", provider.secret.clone()),
        ];
        if let Some(language) = &keyword.language {
            q.push(("language", language.clone()));
        }
        if let Some(region) = &keyword.region {
            q.push(("country", region.clone()));
        }
        if let Some(category) = &keyword.category {
            q.push(("category", category.clone()));
        }
        q
    }

    fn parse(&self, body: &str, _keyword: &Keyword) -> Result<Vec<ArticleDraft>, IngestError> {
        let resp: Response = serde_json::from_str(body)
            .map_err(|e| IngestError::Parse(format!("newsdata response: {e}")))?;

        Ok(resp
            .results
            .into_iter()
            .map(|item| {
                let url = item.link.unwrap_or_default();
                let description = item.description.unwrap_or_default();
                let mut metadata = BTreeMap::new();
                if let Some(keywords) = item.keywords.filter(|k| !k.is_empty()) {
                    metadata.insert("keywords".to_string(), keywords.join(", "));
                }
                ArticleDraft {
                    external_ref: item
                        .article_id
                        .filter(|id| !id.is_empty())
                        .unwrap_or_else(|| ref_from_url(&url)),
                    title: item.title.unwrap_or_default(),
                    // NewsData returns no full body on search; the
                    // description is the best text available.
                    news_text: description.clone(),
                    summary: description,
                    authors: item
                        .creator
                        .map(|c| c.join(", "))
                        .unwrap_or_default(),
                    url,
                    published_date: item.pub_date.unwrap_or_default(),
                    language: item.language.unwrap_or_default(),
                    metadata,
                }
            })
            .collect())
    }
}
