// tests/providers_worldnews.rs
use news_ingestor::model::{Keyword, ProviderConfig};
use news_ingestor::providers::worldnews::WorldNews;
use news_ingestor::providers::{FetchWindow, Vendor};

fn provider() -> ProviderConfig {
    ProviderConfig {
        id: 4,
        name: "World News API".to_string(),
        endpoint: "https://worldnews.example/search-news".to_string(),
        secret: "k".to_string(),
        enabled: true,
    }
}

fn keyword() -> Keyword {
    Keyword {
        id: 14,
        text: "museum".to_string(),
        language: Some("en".to_string()),
        region: None,
        category: None,
    }
}

#[test]
fn query_sorts_newest_first_within_window() {
    let window = FetchWindow::last_hours(24);
    let q = WorldNews.query(&provider(), &keyword(), &window);
    assert!(q.contains(&("text", "museum".to_string())));
    assert!(q.contains(&("earliest-publish-date", window.as_date())));
    assert!(q.contains(&("sort", "publish-time".to_string())));
    assert!(q.contains(&("sort-direction", "desc".to_string())));
    assert!(!q.iter().any(|(k, _)| *k == "source-country"));
}

#[test]
fn numeric_ids_become_refs_and_sentiment_lands_in_metadata() {
    let body = include_str!("fixtures/worldnews.json");
    let drafts = WorldNews.parse(body, &keyword()).unwrap();
    assert_eq!(drafts.len(), 2);

    assert_eq!(drafts[0].external_ref, "248817362");
    assert_eq!(drafts[0].authors, "D. Critic, E. Columnist");
    assert_eq!(drafts[0].metadata.get("sentiment").unwrap(), "0.412");
    assert!(drafts[0].news_text.starts_with("After two years"));

    assert!(drafts[1].external_ref.starts_with("url:"));
    assert_eq!(drafts[1].authors, "");
    assert_eq!(drafts[1].summary, "");
    assert_eq!(drafts[1].news_text, "");
    assert!(drafts[1].metadata.get("sentiment").is_none());
}
