//! Reply-thread extraction from a ticket's detail page.
//!
//! Strategy A looks for structured conversation containers. Portals keep
//! renaming those, so when none are found Strategy B falls back to the
//! `dir="ltr"` bodies that reply text is rendered into.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::browser::Browser;
use crate::error::{Result, ScoutError};
use crate::selector::{resolve, SelectorList};
use crate::types::profile::{groups, SiteProfile};
use crate::types::record::{InteractionKind, InteractionRecord, TicketRecord};
use crate::wait::{wait_for_ready, WaitConfig};

use super::crossref::CrossReferenceScanner;
use super::markers::find_timestamp_text;
use super::text::{flatten_text, inline_text, text_nodes, truncate_chars};

/// Most interactions kept per ticket.
pub const MAX_INTERACTIONS: usize = 10;

/// Cap on one interaction's flattened content.
pub const INTERACTION_CONTENT_CHARS: usize = 2000;

/// How many ancestor levels are searched for a timestamp or author.
/// The walk also stops below any ancestor shared with another match.
const CONTEXT_DEPTH: usize = 3;

/// Attribute-based candidates first, then class names.
const DEFAULT_CONTAINERS: &str = "[data-testid='conversation-content'], [data-conversation-id], \
     [data-comment-id], [role='article'], .conversation-item, .thread-item, .message, .comment, \
     .reply, .activity-item, .ticket-conversation, .conversation, .messages, .comments, .replies";

const DEFAULT_AUTHORS: &str = ".author, .user, .name, .username, .by, [itemprop='author']";

const LTR_BODY: &str = "div[dir='ltr']";

/// Keyword groups, checked in order against lowercased text.
const KIND_KEYWORDS: &[(InteractionKind, &[&str])] = &[
    (InteractionKind::CustomerResponse, &["customer", "客戶", "客户"]),
    (InteractionKind::AgentResponse, &["agent", "客服"]),
    (InteractionKind::TicketCreated, &["created", "opened", "建立"]),
    (InteractionKind::TicketClosed, &["closed", "resolved", "已關閉", "已解決"]),
];

/// Which strategy produced a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStrategy {
    Containers,
    LtrBodies,
}

/// Keyword classification, `None` when nothing matched.
pub fn classify(text: &str) -> Option<InteractionKind> {
    let lower = text.to_lowercase();
    KIND_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(kind, _)| *kind)
}

/// Extracts interaction threads from ticket detail pages.
#[derive(Debug, Clone)]
pub struct InteractionExtractor {
    containers: SelectorList,
    authors: SelectorList,
    cross_references: Option<CrossReferenceScanner>,
    wait: WaitConfig,
}

impl Default for InteractionExtractor {
    fn default() -> Self {
        Self {
            containers: SelectorList::new(DEFAULT_CONTAINERS),
            authors: SelectorList::new(DEFAULT_AUTHORS),
            cross_references: None,
            wait: WaitConfig::default(),
        }
    }
}

impl InteractionExtractor {
    /// Use a profile's container/author overrides and tracker config.
    pub fn from_profile(profile: &SiteProfile, wait: WaitConfig) -> Self {
        let defaults = Self::default();
        Self {
            containers: profile
                .optional_selector(groups::INTERACTION_CONTAINER)
                .cloned()
                .unwrap_or(defaults.containers),
            authors: profile
                .optional_selector(groups::INTERACTION_AUTHOR)
                .cloned()
                .unwrap_or(defaults.authors),
            cross_references: profile
                .cross_reference
                .as_ref()
                .and_then(CrossReferenceScanner::new),
            wait,
        }
    }

    pub fn with_cross_references(mut self, scanner: Option<CrossReferenceScanner>) -> Self {
        self.cross_references = scanner;
        self
    }

    /// Visit the record's detail page and extract its thread.
    ///
    /// Page-level failures (no URL, failed load, page never ready) yield an
    /// empty thread. Only a dead browser session is returned as an error.
    pub async fn extract<B>(&self, browser: &B, record: &TicketRecord) -> Result<Vec<InteractionRecord>>
    where
        B: Browser + ?Sized,
    {
        Ok(self.fetch(browser, record).await?.unwrap_or_default())
    }

    /// Like [`extract`](Self::extract), but `None` when the page could not
    /// be loaded, so callers can count failed visits.
    pub async fn fetch<B>(&self, browser: &B, record: &TicketRecord) -> Result<Option<Vec<InteractionRecord>>>
    where
        B: Browser + ?Sized,
    {
        if record.full_url.is_empty() {
            debug!(ticket = %record.label(), "No detail URL, skipping interactions");
            return Ok(Some(Vec::new()));
        }

        let page = async {
            browser.navigate(&record.full_url).await?;
            wait_for_ready(browser, &self.wait).await?;
            browser.content().await
        };

        let html = match page.await {
            Ok(html) => html,
            Err(e) if e.is_session_failure() => return Err(e),
            Err(e) => {
                warn!(url = %record.full_url, error = %e, "Detail page unavailable");
                return Ok(None);
            }
        };

        let (strategy, interactions) = self.parse(&html);
        info!(
            ticket = %record.label(),
            strategy = ?strategy,
            count = interactions.len(),
            "Extracted interactions"
        );
        Ok(Some(interactions))
    }

    /// Parse a detail page snapshot.
    pub fn parse(&self, html: &str) -> (Option<ThreadStrategy>, Vec<InteractionRecord>) {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let containers = self.find_containers(root);
        if !containers.is_empty() {
            let interactions = self.collect(containers, InteractionKind::Other);
            return (Some(ThreadStrategy::Containers), interactions);
        }

        let bodies = ltr_bodies(root);
        if !bodies.is_empty() {
            debug!(found = bodies.len(), "No conversation containers, using ltr bodies");
            let interactions = self.collect(bodies, InteractionKind::Response);
            return (Some(ThreadStrategy::LtrBodies), interactions);
        }

        (None, Vec::new())
    }

    /// All matches of the first container candidate that matches anything.
    fn find_containers<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.containers
            .locators()
            .iter()
            .filter_map(|locator| Selector::parse(&locator.to_css()).ok())
            .map(|selector| root.select(&selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }

    fn collect(&self, nodes: Vec<ElementRef<'_>>, default_kind: InteractionKind) -> Vec<InteractionRecord> {
        nodes
            .iter()
            .filter_map(|&node| match self.interaction(node, &nodes, default_kind) {
                Ok(interaction) => Some(interaction),
                Err(e) => {
                    debug!(error = %e, "Skipping interaction node");
                    None
                }
            })
            .take(MAX_INTERACTIONS)
            .collect()
    }

    fn interaction<'a>(
        &self,
        node: ElementRef<'a>,
        matched: &[ElementRef<'a>],
        default_kind: InteractionKind,
    ) -> Result<InteractionRecord> {
        let content = truncate_chars(&flatten_text(node), INTERACTION_CONTENT_CHARS);
        let timestamp = context_chain(node, matched)
            .find_map(find_timestamp)
            .unwrap_or_default();

        if content.is_empty() && timestamp.is_empty() {
            return Err(ScoutError::ExtractionAborted {
                reason: format!("<{}> has neither text nor timestamp", node.value().name()),
            });
        }

        let author = context_chain(node, matched)
            .find_map(|scope| {
                resolve(&self.authors, scope)
                    .ok()
                    .map(|resolved| inline_text(resolved.element))
                    .filter(|author| !author.is_empty())
            })
            .unwrap_or_default();

        let cross_references = self
            .cross_references
            .as_ref()
            .map(|scanner| scanner.scan(&content))
            .unwrap_or_default();

        Ok(InteractionRecord {
            kind: classify(&content).unwrap_or(default_kind),
            timestamp,
            author,
            content,
            cross_references,
        })
    }
}

/// The node, then up to [`CONTEXT_DEPTH`] element ancestors that hold no
/// other matched node.
fn context_chain<'a, 'b>(
    node: ElementRef<'a>,
    matched: &'b [ElementRef<'a>],
) -> impl Iterator<Item = ElementRef<'a>> + 'b
where
    'a: 'b,
{
    std::iter::once(node).chain(
        node.ancestors()
            .filter_map(ElementRef::wrap)
            .take(CONTEXT_DEPTH)
            .take_while(move |ancestor| !holds_other(*ancestor, node, matched)),
    )
}

fn holds_other(ancestor: ElementRef<'_>, node: ElementRef<'_>, matched: &[ElementRef<'_>]) -> bool {
    matched.iter().any(|other| {
        other.id() != node.id() && other.ancestors().any(|a| a.id() == ancestor.id())
    })
}

/// `<time>` first, then date-looking text.
fn find_timestamp(scope: ElementRef<'_>) -> Option<String> {
    let time_tag = scope
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "time");
    if let Some(time) = time_tag {
        let text = inline_text(time);
        if !text.is_empty() {
            return Some(text);
        }
        if let Some(datetime) = time.value().attr("datetime") {
            return Some(datetime.trim().to_string());
        }
    }

    let fragments: Vec<&str> = text_nodes(scope).collect();
    find_timestamp_text(&fragments).map(String::from)
}

/// Outermost `div[dir=ltr]` elements, in document order.
fn ltr_bodies(root: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let Ok(selector) = Selector::parse(LTR_BODY) else {
        return Vec::new();
    };

    root.select(&selector)
        .filter(|div| {
            !div.ancestors()
                .filter_map(ElementRef::wrap)
                .any(|el| el.value().name() == "div" && el.value().attr("dir") == Some("ltr"))
        })
        .collect()
}
