// tests/providers_gnews.rs
use news_ingestor::model::{Keyword, ProviderConfig};
use news_ingestor::providers::gnews::GNews;
use news_ingestor::providers::{FetchWindow, Vendor};

fn provider() -> ProviderConfig {
    ProviderConfig {
        id: 5,
        name: "GNews".to_string(),
        endpoint: "https://gnews.example/api/v4/search".to_string(),
        secret: "k".to_string(),
        enabled: true,
    }
}

fn keyword() -> Keyword {
    Keyword {
        id: 15,
        text: "reading".to_string(),
        language: None,
        region: Some("ca".to_string()),
        category: Some("ignored".to_string()),
    }
}

#[test]
fn query_uses_rfc3339_window_and_skips_category() {
    let window = FetchWindow::last_hours(24);
    let q = GNews.query(&provider(), &keyword(), &window);
    assert!(q.contains(&("from", window.as_rfc3339())));
    assert!(q.contains(&("lang", "en".to_string())));
    assert!(q.contains(&("country", "ca".to_string())));
    // This vendor has no category filter; the keyword's category is not
    // sent as a bogus parameter.
    assert!(!q.iter().any(|(k, _)| *k == "category"));
}

#[test]
fn maps_fixture_with_url_hash_refs() {
    let body = include_str!("fixtures/gnews.json");
    let drafts = GNews.parse(body, &keyword()).unwrap();
    assert_eq!(drafts.len(), 2);

    assert!(drafts[0].external_ref.starts_with("url:"));
    assert_eq!(drafts[0].metadata.get("source").unwrap(), "Example Gazette");
    assert_eq!(drafts[0].language, "en");

    assert_eq!(drafts[1].summary, "");
    assert_eq!(drafts[1].news_text, "");
    assert!(drafts[1].metadata.is_empty());
}
