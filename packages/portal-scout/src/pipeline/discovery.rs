//! Ticket node discovery on a dashboard page.
//!
//! Structural strategies are tried in order and the first one that matches
//! anything wins. When none match, nodes are recovered from date-looking
//! text instead, which tolerates markup nobody wrote a selector for.

use scraper::{ElementRef, Node, Selector};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

use crate::selector::{Locator, SelectorList};

use super::markers::has_calendar_token;

/// Default cap on discovered nodes.
pub const DEFAULT_MAX_TICKETS: usize = 50;

/// Ancestor tags accepted as the container of a date-looking text node.
const FALLBACK_CONTAINERS: &[&str] = &["tr", "li", "div"];

/// One structural way to find ticket nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// A profile- or built-in selector candidate
    Locator(Locator),
    /// `tr` elements with at least one `td` child
    RowsWithCells,
    /// `li` elements containing a link
    ListItemsWithLinks,
}

impl Strategy {
    fn css(candidate: &str) -> Option<Self> {
        Locator::parse(candidate).map(Strategy::Locator)
    }

    fn find_all<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        match self {
            Strategy::Locator(locator) => match Selector::parse(&locator.to_css()) {
                Ok(selector) => scope.select(&selector).collect(),
                Err(_) => Vec::new(),
            },
            Strategy::RowsWithCells => descendants_named(scope, "tr")
                .filter(|row| {
                    row.children()
                        .filter_map(ElementRef::wrap)
                        .any(|cell| cell.value().name() == "td")
                })
                .collect(),
            Strategy::ListItemsWithLinks => descendants_named(scope, "li")
                .filter(|item| {
                    item.descendants()
                        .filter_map(ElementRef::wrap)
                        .any(|el| el.value().name() == "a")
                })
                .collect(),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Locator(locator) => write!(f, "{}", locator),
            Strategy::RowsWithCells => f.write_str("tr with td"),
            Strategy::ListItemsWithLinks => f.write_str("li with a"),
        }
    }
}

fn descendants_named<'a>(
    scope: ElementRef<'a>,
    name: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    scope
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == name)
}

/// Built-in strategies, most specific first.
pub fn default_strategies() -> Vec<Strategy> {
    let mut strategies: Vec<Strategy> = [
        "tr[data-ticket-id]",
        "tr[data-issue-id]",
        ".ticket-item",
        ".issue-item",
        ".conversation-item",
        ".ticket-row",
        ".issue-row",
    ]
    .into_iter()
    .filter_map(Strategy::css)
    .collect();

    strategies.push(Strategy::RowsWithCells);
    strategies.push(Strategy::ListItemsWithLinks);
    strategies.extend([".item", ".entry", ".record"].into_iter().filter_map(Strategy::css));
    strategies
}

/// What discovery found and how.
#[derive(Debug)]
pub struct Discovered<'a> {
    pub nodes: Vec<ElementRef<'a>>,
    /// Winning strategy, `None` when the text fallback was used
    pub strategy: Option<Strategy>,
}

/// Locates ticket-like nodes on a dashboard.
#[derive(Debug, Clone)]
pub struct TicketDiscovery {
    strategies: Vec<Strategy>,
    max_count: usize,
}

impl Default for TicketDiscovery {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TICKETS)
    }
}

impl TicketDiscovery {
    pub fn new(max_count: usize) -> Self {
        Self {
            strategies: default_strategies(),
            max_count,
        }
    }

    /// Try a profile's own row selectors before the built-in ones.
    pub fn with_preferred(mut self, candidates: Option<&SelectorList>) -> Self {
        if let Some(candidates) = candidates {
            let mut strategies: Vec<Strategy> = candidates
                .locators()
                .into_iter()
                .map(Strategy::Locator)
                .collect();
            strategies.append(&mut self.strategies);
            self.strategies = strategies;
        }
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Ticket nodes under `scope`, in document order, at most `max_count`.
    pub fn find<'a>(&self, scope: ElementRef<'a>) -> Discovered<'a> {
        for strategy in &self.strategies {
            let mut nodes = strategy.find_all(scope);
            if nodes.is_empty() {
                continue;
            }

            info!(strategy = %strategy, found = nodes.len(), "Ticket strategy matched");
            nodes.truncate(self.max_count);
            return Discovered {
                nodes,
                strategy: Some(strategy.clone()),
            };
        }

        debug!("No structural strategy matched, falling back to date text");
        let nodes = self.find_by_date_text(scope);
        info!(found = nodes.len(), "Date-text fallback finished");
        Discovered {
            nodes,
            strategy: None,
        }
    }

    fn find_by_date_text<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();

        for node in scope.descendants() {
            if nodes.len() >= self.max_count {
                break;
            }

            let Node::Text(text) = node.value() else {
                continue;
            };
            if !has_calendar_token(text) {
                continue;
            }

            let container = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .take_while(|el| !matches!(el.value().name(), "script" | "style" | "head"))
                .find(|el| FALLBACK_CONTAINERS.contains(&el.value().name()));

            if let Some(container) = container {
                if seen.insert(container.id()) {
                    nodes.push(container);
                }
            }
        }

        nodes
    }
}
