// src/feeds/mod.rs
pub mod extract;
pub mod render;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::model::{ArticleDraft, FeedConfig, SourceRef};
use crate::store::DedupGate;
use render::PageRenderer;

/// Body stored when extraction exhausts its retry budget. The entry is
/// kept: title, summary, and metadata stay valuable without body text.
pub const CONTENT_UNAVAILABLE: &str = "[Content could not be loaded]";

/// One feed entry, normalized from either RSS or Atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Stable entry id, or a hash of title+link when the feed has none.
    pub id: String,
    pub title: String,
    pub link: String,
    /// Vendor-native date string, stored as-is.
    pub published: String,
    pub authors: String,
    /// Entry's own content/summary, raw HTML.
    pub summary_html: String,
}

/// Why an entry produced no draft. Both are normal outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyStored,
    VideoHost,
}

/// Result of walking one feed.
#[derive(Debug, Default)]
pub struct FeedBatch {
    pub drafts: Vec<ArticleDraft>,
    pub already_stored: usize,
    pub skipped_video: usize,
    pub failed: usize,
}

// --- Feed document parsing -------------------------------------------------

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
    // quick-xml's serde deserializer matches on the element's local name,
    // so `<dc:creator>` binds to a field named `creator` (no prefix).
    creator: Option<String>,
    #[serde(rename = "content:encoded")]
    content_encoded: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
    author: Option<AtomAuthor>,
}

/// Atom text construct: the type attribute must be tolerated even though
/// only the text matters here.
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

impl FeedEntry {
    fn from_rss(item: RssItem) -> Self {
        let title = item.title.unwrap_or_default();
        let link = item.link.unwrap_or_default();
        let id = item
            .guid
            .and_then(|g| g.value)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| synth_ref(&title, &link));
        Self {
            id,
            title,
            link,
            published: item.pub_date.unwrap_or_default(),
            authors: item.author.or(item.creator).unwrap_or_default(),
            summary_html: item
                .content_encoded
                .or(item.description)
                .unwrap_or_default(),
        }
    }

    fn from_atom(entry: AtomEntry) -> Self {
        let title = entry.title.and_then(|t| t.value).unwrap_or_default();
        let link = entry
            .links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .and_then(|l| l.href.clone())
            .unwrap_or_default();
        let id = entry
            .id
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| synth_ref(&title, &link));
        Self {
            id,
            title,
            link,
            published: entry.published.or(entry.updated).unwrap_or_default(),
            authors: entry.author.and_then(|a| a.name).unwrap_or_default(),
            summary_html: entry
                .content
                .or(entry.summary)
                .and_then(|t| t.value)
                .unwrap_or_default(),
        }
    }
}

/// Parse a feed document, dispatching on the root element so a
/// well-formed non-feed document (an HTML error page, say) is a parse
/// error rather than an empty feed.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, IngestError> {
    let cleaned = scrub_entities(xml);
    match root_element(&cleaned).as_deref() {
        Some("rss") => {
            let rss: Rss = from_str(&cleaned)
                .map_err(|e| IngestError::Parse(format!("rss document: {e}")))?;
            Ok(rss.channel.items.into_iter().map(FeedEntry::from_rss).collect())
        }
        Some("feed") => {
            let feed: AtomFeed = from_str(&cleaned)
                .map_err(|e| IngestError::Parse(format!("atom document: {e}")))?;
            Ok(feed.entries.into_iter().map(FeedEntry::from_atom).collect())
        }
        other => Err(IngestError::Parse(format!(
            "unrecognized feed root element: {other:?}"
        ))),
    }
}

fn root_element(xml: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(quick_xml::events::Event::Start(start)) => {
                return Some(String::from_utf8_lossy(start.local_name().as_ref()).into_owned())
            }
            Ok(quick_xml::events::Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Named HTML entities inside otherwise-valid feed XML trip strict
/// parsers; replace the common ones up front.
fn scrub_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

fn synth_ref(title: &str, link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(link.as_bytes());
    format!("{:x}", hasher.finalize())
}

// --- Entry URL handling ----------------------------------------------------

/// Aggregator feeds often wrap the real article URL in a query parameter
/// of an indirection link. Resolve before fetching.
pub fn resolve_entry_url(link: &str) -> String {
    if let Ok(parsed) = Url::parse(link) {
        for (key, value) in parsed.query_pairs() {
            if key == "url" {
                return value.into_owned();
            }
        }
    }
    link.to_string()
}

static VIDEO_HOSTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|\.)(youtube\.com|youtu\.be|vimeo\.com|dailymotion\.com|twitch\.tv)$")
        .expect("static regex")
});

/// Video-hosting links carry no extractable article text; they are
/// skipped outright, before any page load.
pub fn is_video_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| VIDEO_HOSTS.is_match(h)))
        .unwrap_or(false)
}

/// Decode entities, drop tags, collapse whitespace. Used for feed titles
/// and entry summaries, which routinely arrive as HTML fragments.
pub fn strip_html(s: &str) -> String {
    static RE_TAGS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

    let decoded = html_escape::decode_html_entities(s).to_string();
    let no_tags = RE_TAGS.replace_all(&decoded, "");
    RE_WS.replace_all(&no_tags, " ").trim().to_string()
}

// --- Feed adapter ----------------------------------------------------------

enum EntryOutcome {
    Draft(ArticleDraft),
    Skipped(SkipReason),
}

/// Walks a feed: parse, per-entry dedup pre-check, link resolution, video
/// filter, layered extraction. A single entry never takes the feed down.
pub struct FeedAdapter {
    renderer: Arc<dyn PageRenderer>,
    render_slots: Arc<Semaphore>,
    page_load_timeout: Duration,
    render_retries: u32,
    min_text_len: usize,
}

impl FeedAdapter {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        render_slots: Arc<Semaphore>,
        cfg: &IngestConfig,
    ) -> Self {
        Self {
            renderer,
            render_slots,
            page_load_timeout: Duration::from_secs(cfg.page_load_timeout_secs),
            render_retries: cfg.render_retries,
            min_text_len: cfg.min_text_len,
        }
    }

    /// Fetch the feed document and walk every entry through the state
    /// machine. Fails only on feed-level problems (unreachable endpoint,
    /// malformed document); per-entry problems are absorbed into the
    /// batch counts.
    pub async fn fetch(
        &self,
        http: &reqwest::Client,
        gate: &DedupGate,
        feed: &FeedConfig,
    ) -> Result<FeedBatch, IngestError> {
        let resp = http
            .get(&feed.endpoint)
            .send()
            .await
            .map_err(IngestError::from_reqwest)?;
        let status = resp.status();
        let body = resp.text().await.map_err(IngestError::from_reqwest)?;
        if !status.is_success() {
            return Err(IngestError::from_status(status.as_u16(), &body));
        }
        self.ingest_document(gate, feed, &body).await
    }

    /// Walk an already-fetched feed document. Split from `fetch` so the
    /// whole entry state machine runs against fixture documents.
    pub async fn ingest_document(
        &self,
        gate: &DedupGate,
        feed: &FeedConfig,
        body: &str,
    ) -> Result<FeedBatch, IngestError> {
        let entries = parse_feed(body)?;
        counter!("ingest_feed_entries_total").increment(entries.len() as u64);
        debug!(feed = %feed.name, entries = entries.len(), "feed parsed");

        let mut batch = FeedBatch::default();
        for entry in entries {
            match self.process_entry(gate, feed, entry).await {
                Ok(EntryOutcome::Draft(draft)) => batch.drafts.push(draft),
                Ok(EntryOutcome::Skipped(SkipReason::AlreadyStored)) => batch.already_stored += 1,
                Ok(EntryOutcome::Skipped(SkipReason::VideoHost)) => batch.skipped_video += 1,
                Err(e) => {
                    warn!(feed = %feed.name, error = %e, "feed entry failed");
                    batch.failed += 1;
                }
            }
        }
        Ok(batch)
    }

    async fn process_entry(
        &self,
        gate: &DedupGate,
        feed: &FeedConfig,
        entry: FeedEntry,
    ) -> Result<EntryOutcome, IngestError> {
        // Pre-check before any page load; the gate re-checks at insert.
        if gate.exists(SourceRef::Feed(feed.id), &entry.id).await? {
            debug!(feed = %feed.name, id = %entry.id, "entry already stored");
            return Ok(EntryOutcome::Skipped(SkipReason::AlreadyStored));
        }

        let article_url = resolve_entry_url(&entry.link);
        if is_video_url(&article_url) {
            counter!("ingest_video_skipped_total").increment(1);
            debug!(feed = %feed.name, url = %article_url, "video link skipped");
            return Ok(EntryOutcome::Skipped(SkipReason::VideoHost));
        }

        let news_text = self.extract_with_retry(&article_url).await;

        Ok(EntryOutcome::Draft(ArticleDraft {
            external_ref: entry.id,
            title: strip_html(&entry.title),
            news_text,
            summary: strip_html(&entry.summary_html),
            authors: entry.authors,
            url: article_url,
            published_date: entry.published,
            language: String::new(),
            metadata: BTreeMap::new(),
        }))
    }

    /// Layered extraction with a bounded retry budget. Never fails: an
    /// exhausted budget yields the sentinel body so the entry's title and
    /// summary are still recorded.
    async fn extract_with_retry(&self, url: &str) -> String {
        let attempts = self.render_retries + 1;
        for attempt in 1..=attempts {
            let _permit = self
                .render_slots
                .acquire()
                .await
                .expect("render semaphore closed");
            match self.renderer.render(url, self.page_load_timeout).await {
                Ok(html) => {
                    let text = extract::extract_article_text(&html, self.min_text_len);
                    if !text.is_empty() {
                        return text;
                    }
                    warn!(%url, attempt, "rendered page yielded no text");
                }
                Err(e) => {
                    counter!("ingest_render_failures_total").increment(1);
                    warn!(%url, attempt, error = %e, "page render failed");
                }
            }
        }
        CONTENT_UNAVAILABLE.to_string()
    }
}
