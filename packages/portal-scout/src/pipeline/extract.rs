//! Best-effort field extraction from one ticket node.

use scraper::ElementRef;
use tracing::{debug, warn};
use url::Url;

use crate::types::record::TicketRecord;

use super::markers::{find_date_text, find_status_text};
use super::text::{inline_text, text_nodes, truncate_chars};

/// Preview length for `content`.
pub const CONTENT_PREVIEW_CHARS: usize = 200;

/// Cap for `raw_text`.
pub const RAW_TEXT_CHARS: usize = 500;

const ID_ATTRIBUTES: &[&str] = &["data-ticket-id", "data-issue-id"];

const TITLE_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "a", "span", "div"];

const CONTENT_TAGS: &[&str] = &["p", "div", "span"];

/// Turns discovered nodes into [`TicketRecord`]s.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    base_url: Option<Url>,
    source: String,
}

impl RecordExtractor {
    /// `base_url` resolves relative links; an unparseable one is ignored.
    pub fn new(base_url: &str, source: impl Into<String>) -> Self {
        let base_url = match Url::parse(base_url) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(base_url = %base_url, error = %e, "Ignoring unparseable base URL");
                None
            }
        };

        Self {
            base_url,
            source: source.into(),
        }
    }

    /// Extract a record. Missing fields are never a reason to drop the
    /// node: they stay empty, down to a record with only `source` set.
    pub fn extract(&self, node: ElementRef<'_>) -> TicketRecord {
        let raw_text = inline_text(node);
        let id = ID_ATTRIBUTES
            .iter()
            .find_map(|attr| node.value().attr(attr))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or_default()
            .to_string();
        let href = first_link(node).unwrap_or_default().to_string();

        if raw_text.is_empty() && id.is_empty() && href.is_empty() {
            debug!(tag = node.value().name(), "Ticket node has no text, id, or link");
        }

        let fragments: Vec<&str> = text_nodes(node).collect();

        TicketRecord {
            id,
            title: self.title(node),
            date: find_date_text(&fragments).unwrap_or_default().to_string(),
            status: find_status_text(&fragments).unwrap_or_default().to_string(),
            content: content_preview(node),
            full_url: self.resolve(&href),
            url: href,
            source: self.source.clone(),
            raw_text: truncate_chars(&raw_text, RAW_TEXT_CHARS),
            interactions: Vec::new(),
        }
    }

    fn title(&self, node: ElementRef<'_>) -> String {
        TITLE_TAGS
            .iter()
            .find_map(|tag| {
                descendants(node)
                    .filter(|el| el.value().name() == *tag)
                    .map(inline_text)
                    .find(|text| !text.is_empty())
            })
            .unwrap_or_default()
    }

    fn resolve(&self, href: &str) -> String {
        if href.is_empty() {
            return String::new();
        }

        match &self.base_url {
            Some(base) => base
                .join(href)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }
}

/// Strict descendants (the node itself excluded).
fn descendants<'a>(node: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    node.descendants().skip(1).filter_map(ElementRef::wrap)
}

fn first_link<'a>(node: ElementRef<'a>) -> Option<&'a str> {
    node.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a")
        .find_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
}

fn content_preview(node: ElementRef<'_>) -> String {
    descendants(node)
        .filter(|el| CONTENT_TAGS.contains(&el.value().name()))
        .map(inline_text)
        .find(|text| !text.is_empty())
        .map(|text| truncate_chars(&text, CONTENT_PREVIEW_CHARS))
        .unwrap_or_default()
}
