// src/feeds/extract.rs
//! Body-text extraction from rendered article pages. Pure: takes HTML in,
//! gives text out, so the whole strategy is testable against canned pages.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

/// Article container candidates, highest priority first. The first
/// selector with a usable match wins; among multiple matches the element
/// with the most text is taken.
const CANDIDATE_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    ".article-body",
    ".article-content",
    ".post-content",
    ".entry-content",
    ".story-body",
    "#content",
];

/// Tags whose text never belongs to an article body.
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "iframe", "noscript", "aside",
];

/// Tags that end a line of running text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "blockquote", "tr", "table", "figure",
];

static CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    CANDIDATE_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
});

/// Extract article body text from a rendered page.
///
/// Picks the best candidate container; a result shorter than `min_len`
/// falls back to the text of the whole rendered page.
pub fn extract_article_text(html: &str, min_len: usize) -> String {
    let doc = Html::parse_document(html);

    let mut candidate: Option<String> = None;
    for selector in CANDIDATES.iter() {
        let best = doc
            .select(selector)
            .map(clean_text)
            .max_by_key(|t| t.len())
            .filter(|t| !t.is_empty());
        if let Some(text) = best {
            candidate = Some(text);
            break;
        }
    }

    match candidate {
        Some(text) if text.len() >= min_len => text,
        // Candidate missing or too small: take the whole rendered page.
        _ => clean_text(doc.root_element()),
    }
}

/// Text of an element with script/style/nav/chrome stripped and blank
/// lines collapsed.
fn clean_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect(el, &mut out);
    collapse(&out)
}

fn collect(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                if EXCLUDED_TAGS.contains(&name) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect(child_el, out);
                }
                if BLOCK_TAGS.contains(&name) {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Keep non-empty lines, single-space each line's internal whitespace.
fn collapse(s: &str) -> String {
    s.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
