//! Agency listing-page adapter.
//!
//! Many funding agencies publish calls as plain HTML listing pages with no
//! API. This adapter fetches each configured page, collects anchor links whose
//! text looks like a call announcement, and emits one draft per link. Sponsor,
//! country, and tags come from the instance configuration; a submission
//! deadline is sniffed out of the link text when one is present.
//!
//! Markup scanning is minimal and hand-rolled: anchor tags only, no DOM.
//!
//! # Configuration
//!
//! ```toml
//! [adapters.agency.icmr]
//! base = "https://www.icmr.gov.in/"
//! pages = ["https://www.icmr.gov.in/opportunities"]
//! sponsor = "Indian Council of Medical Research"
//! country = "India"
//! tags = ["medical-research"]
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::{AgencyConfig, IngestConfig};
use crate::error::FetchError;
use crate::models::CfpDraft;
use crate::traits::Adapter;

/// Link text must contain one of these to count as a call announcement.
const KEYWORDS: &[&str] = &[
    "call",
    "grant",
    "fund",
    "funding",
    "proposal",
    "fellowship",
    "scheme",
    "schemes",
    "research",
    "programme",
    "program",
];

/// Links whose text contains any of these are navigation noise, not calls.
const EXCLUDE: &[&str] = &["faq", "faqs", "form", "forms", "guideline", "guidelines"];

pub struct AgencyAdapter {
    name: String,
    config: AgencyConfig,
    client: reqwest::Client,
}

impl AgencyAdapter {
    pub fn new(name: &str, config: AgencyConfig, ingest: &IngestConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(ingest.http_timeout_secs))
            .user_agent(ingest.user_agent.clone())
            .build()?;

        Ok(Self {
            name: format!("agency:{}", name),
            config,
            client,
        })
    }

    async fn fetch_page(&self, page: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(page)
            .send()
            .await
            .map_err(|e| FetchError::http(page, e))?;

        if !resp.status().is_success() {
            return Err(FetchError::status(page, resp.status().as_u16()));
        }

        resp.text()
            .await
            .map_err(|e| FetchError::decode(page, e.to_string()))
    }
}

#[async_trait]
impl Adapter for AgencyAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Call announcements scraped from agency listing pages"
    }

    async fn fetch(&self) -> Result<Vec<CfpDraft>, FetchError> {
        let mut drafts = Vec::new();
        let mut first_error: Option<FetchError> = None;
        let mut any_page_ok = false;

        for page in &self.config.pages {
            let html = match self.fetch_page(page).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(source = %self.name, page = %page, error = %e, "listing page fetch failed");
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            any_page_ok = true;
            drafts.extend(parse_listing(&self.name, &self.config, &html));
        }

        // Only a total outage fails the adapter; single dead pages are skipped.
        if !any_page_ok {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        Ok(drafts)
    }
}

// ============ Listing extraction ============

/// Collect call-looking links from one listing page and map them to drafts.
/// Links are deduplicated by (lowercased text, fragment-stripped URL).
pub(crate) fn parse_listing(source: &str, config: &AgencyConfig, html: &str) -> Vec<CfpDraft> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut drafts = Vec::new();

    for (text, href) in extract_links(html) {
        if !looks_like_call(&text) {
            continue;
        }

        let url = absolutize(&config.base, &href);
        let key = (text.to_lowercase(), strip_fragment(&url).to_string());
        if !seen.insert(key) {
            continue;
        }

        let source_id = strip_fragment(&url).trim_end_matches('/').to_string();
        let mut draft = CfpDraft::new(source, &source_id, &text, &url);
        draft.sponsor = config.sponsor.clone();
        draft.country = config.country.clone();
        draft.tags = config.tags.clone();
        draft.deadline = extract_deadline(&text);
        drafts.push(draft);
    }

    drafts
}

/// Extract `(text, href)` pairs from anchor tags. Inner markup is stripped
/// and whitespace collapsed; anchors without an href or text are dropped.
fn extract_links(html: &str) -> Vec<(String, String)> {
    let mut links = Vec::new();
    // ASCII-only lowering keeps byte offsets aligned with the original
    let lower = html.to_ascii_lowercase();
    let mut pos = 0;

    while let Some(start) = lower[pos..].find("<a") {
        let tag_start = pos + start;

        // "<a" must be a whole tag name, not a prefix of <abbr>, <article>, ...
        match lower[tag_start + 2..].chars().next() {
            Some(c) if c.is_whitespace() || c == '>' => {}
            _ => {
                pos = tag_start + 2;
                continue;
            }
        }

        let Some(tag_end_rel) = html[tag_start..].find('>') else {
            break;
        };
        let tag_end = tag_start + tag_end_rel;
        let tag = &html[tag_start..tag_end];

        let Some(close_rel) = lower[tag_end..].find("</a>") else {
            break;
        };
        let close = tag_end + close_rel;

        let text = collapse_whitespace(&strip_tags(&html[tag_end + 1..close]));
        if let Some(href) = extract_href(tag) {
            if !text.is_empty() && !href.is_empty() {
                links.push((text, href));
            }
        }

        pos = close + "</a>".len();
    }

    links
}

/// Pull the href attribute value out of an opening `<a ...` tag.
fn extract_href(tag: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let idx = lower.find("href")?;
    let rest = &tag[idx + "href".len()..];
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=')?;
    let rest = rest.trim_start();

    let quote = rest.chars().next()?;
    if quote == '"' || quote == '\'' {
        let inner = &rest[1..];
        let end = inner.find(quote)?;
        Some(inner[..end].trim().to_string())
    } else {
        // Unquoted attribute value runs to the next whitespace
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        Some(rest[..end].trim().to_string())
    }
}

/// Remove nested tags from anchor inner HTML.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keyword filter for call announcements, shared vocabulary across agencies.
pub(crate) fn looks_like_call(text: &str) -> bool {
    let lower = text.to_lowercase();
    if EXCLUDE.iter().any(|x| lower.contains(x)) {
        return false;
    }
    KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Resolve a possibly-relative href against the agency base URL.
fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    if let Some(rest) = href.strip_prefix("//") {
        let scheme = base.split("://").next().unwrap_or("https");
        return format!("{}://{}", scheme, rest);
    }

    let origin = match base.find("://") {
        Some(idx) => {
            let after = idx + "://".len();
            match base[after..].find('/') {
                Some(slash) => &base[..after + slash],
                None => base.trim_end_matches('/'),
            }
        }
        None => base.trim_end_matches('/'),
    };

    if let Some(path) = href.strip_prefix('/') {
        return format!("{}/{}", origin, path);
    }

    // Relative to the base's directory
    let dir = match base.rfind('/') {
        Some(idx) if idx > base.find("://").map(|i| i + 2).unwrap_or(0) => &base[..idx],
        _ => base.trim_end_matches('/'),
    };
    format!("{}/{}", dir, href)
}

fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

/// Look for a date anywhere in the link text. Agencies write deadlines in a
/// handful of formats; anything unrecognized is simply left unset.
pub(crate) fn extract_deadline(text: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = text
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '/' && c != '-'))
        .filter(|t| !t.is_empty())
        .collect();

    for (i, token) in tokens.iter().enumerate() {
        for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(token, fmt) {
                return Some(date);
            }
        }

        // "12 January 2026" spans three tokens
        if i + 2 < tokens.len() {
            let window = format!("{} {} {}", token, tokens[i + 1], tokens[i + 2]);
            for fmt in ["%d %B %Y", "%d %b %Y"] {
                if let Ok(date) = NaiveDate::parse_from_str(&window, fmt) {
                    return Some(date);
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AgencyConfig {
        AgencyConfig {
            base: "https://agency.example.org/".to_string(),
            pages: vec!["https://agency.example.org/opportunities".to_string()],
            sponsor: Some("Example Agency".to_string()),
            country: Some("India".to_string()),
            tags: vec!["science".to_string()],
        }
    }

    #[test]
    fn extracts_anchor_text_and_href() {
        let html = r#"
            <ul>
              <li><a href="/calls/quantum-2026">Call for Proposals: <b>Quantum</b> Research</a></li>
              <li><A HREF='https://other.example.org/fellowship'>Fellowship Announcement</A></li>
              <li><a name="anchor-only">No href here</a></li>
            </ul>
        "#;

        let links = extract_links(html);
        assert_eq!(links.len(), 2);
        assert_eq!(
            links[0],
            (
                "Call for Proposals: Quantum Research".to_string(),
                "/calls/quantum-2026".to_string()
            )
        );
        assert_eq!(links[1].1, "https://other.example.org/fellowship");
    }

    #[test]
    fn call_keyword_filter() {
        assert!(looks_like_call("Call for Proposals 2026"));
        assert!(looks_like_call("Research Fellowship Scheme"));
        assert!(!looks_like_call("Contact Us"));
        // Excluded words win even when a keyword is present
        assert!(!looks_like_call("Application form for research grants"));
        assert!(!looks_like_call("FAQs about funding"));
    }

    #[test]
    fn absolutize_variants() {
        let base = "https://agency.example.org/pages/listing.html";
        assert_eq!(
            absolutize(base, "https://x.org/a"),
            "https://x.org/a"
        );
        assert_eq!(
            absolutize(base, "//cdn.example.org/a"),
            "https://cdn.example.org/a"
        );
        assert_eq!(
            absolutize(base, "/calls/one"),
            "https://agency.example.org/calls/one"
        );
        assert_eq!(
            absolutize(base, "two.html"),
            "https://agency.example.org/pages/two.html"
        );
    }

    #[test]
    fn deadline_formats() {
        assert_eq!(
            extract_deadline("Call for proposals (deadline 2026-03-01)"),
            NaiveDate::from_ymd_opt(2026, 3, 1)
        );
        assert_eq!(
            extract_deadline("Apply by 15/04/2026."),
            NaiveDate::from_ymd_opt(2026, 4, 15)
        );
        assert_eq!(
            extract_deadline("Last date: 12 January 2026"),
            NaiveDate::from_ymd_opt(2026, 1, 12)
        );
        assert_eq!(
            extract_deadline("Last date: 5 Mar 2026"),
            NaiveDate::from_ymd_opt(2026, 3, 5)
        );
        assert_eq!(extract_deadline("Call for proposals"), None);
    }

    #[test]
    fn listing_produces_deduped_drafts() {
        let html = r#"
            <a href="/calls/alpha">Call for Proposals: Alpha</a>
            <a href="/calls/alpha#details">Call for Proposals: Alpha</a>
            <a href="/calls/beta">Research Grant Beta — apply by 2026-05-01</a>
            <a href="/about">About the agency</a>
        "#;

        let drafts = parse_listing("agency:example", &test_config(), html);
        assert_eq!(drafts.len(), 2);

        let alpha = &drafts[0];
        assert_eq!(alpha.source, "agency:example");
        assert_eq!(alpha.source_id, "https://agency.example.org/calls/alpha");
        assert_eq!(alpha.sponsor.as_deref(), Some("Example Agency"));
        assert_eq!(alpha.country.as_deref(), Some("India"));
        assert_eq!(alpha.tags, vec!["science".to_string()]);

        let beta = &drafts[1];
        assert_eq!(beta.deadline, NaiveDate::from_ymd_opt(2026, 5, 1));
    }
}
