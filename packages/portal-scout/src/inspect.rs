//! Offline inspection of a saved portal page.
//!
//! Runs the same selector resolution, discovery, and extraction a live scan
//! would, against HTML on disk. Used to tune a profile without logging in.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::pipeline::{RecordExtractor, TicketDiscovery};
use crate::selector::resolve;
use crate::types::profile::{groups, SiteProfile};
use crate::types::record::TicketRecord;

/// Containers worth reporting when tuning ticket discovery.
const CONTAINER_CANDIDATES: &[&str] = &[
    ".ticket", ".tickets", ".ticket-list", ".issue", ".issues", ".issue-list",
    ".conversation", ".conversations", ".message", ".messages", ".dashboard",
    ".recent-activity", ".timeline", ".feed", ".table", ".list", ".grid", ".items",
    "[data-ticket-id]", "[data-issue-id]", "[data-conversation-id]",
];

#[derive(Debug, Clone, Serialize)]
pub struct InputSummary {
    pub kind: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormSummary {
    pub action: String,
    pub method: String,
    pub id: String,
    pub inputs: Vec<InputSummary>,
}

/// Which candidate of a profile selector group matched, if any.
#[derive(Debug, Clone, Serialize)]
pub struct GroupResolution {
    pub group: String,
    pub matched: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerMatch {
    pub selector: String,
    pub count: usize,
}

/// Everything learned from one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageInspection {
    pub title: String,
    pub forms: Vec<FormSummary>,
    pub groups: Vec<GroupResolution>,
    pub containers: Vec<ContainerMatch>,
    pub tables: usize,
    pub lists: usize,
    /// Winning discovery strategy; `None` means the date-text fallback ran
    pub strategy: Option<String>,
    pub records: Vec<TicketRecord>,
}

/// Inspect a saved HTML file.
pub fn inspect_file(path: impl AsRef<Path>, profile: &SiteProfile, max_tickets: usize) -> Result<PageInspection> {
    let html = std::fs::read_to_string(path)?;
    Ok(inspect_html(&html, profile, max_tickets))
}

/// Inspect an HTML snapshot.
pub fn inspect_html(html: &str, profile: &SiteProfile, max_tickets: usize) -> PageInspection {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut group_names: Vec<&String> = profile.selectors.keys().collect();
    group_names.sort();
    let resolutions = group_names
        .into_iter()
        .map(|group| GroupResolution {
            group: group.clone(),
            matched: profile.selectors.get(group).and_then(|candidates| {
                resolve(candidates, root)
                    .ok()
                    .map(|resolved| resolved.locator.to_string())
            }),
        })
        .collect();

    let containers = CONTAINER_CANDIDATES
        .iter()
        .filter_map(|candidate| {
            let count = count(root, candidate);
            (count > 0).then(|| ContainerMatch {
                selector: candidate.to_string(),
                count,
            })
        })
        .collect();

    let discovery = TicketDiscovery::new(max_tickets)
        .with_preferred(profile.optional_selector(groups::TICKET_ITEM));
    let extractor = RecordExtractor::new(&profile.base_url, profile.source.clone());
    let found = discovery.find(root);
    let records = found
        .nodes
        .into_iter()
        .map(|node| extractor.extract(node))
        .collect();

    PageInspection {
        title: first_text(root, "title"),
        forms: forms(root),
        groups: resolutions,
        containers,
        tables: count(root, "table"),
        lists: count(root, "ul") + count(root, "ol"),
        strategy: found.strategy.map(|s| s.to_string()),
        records,
    }
}

fn count(root: ElementRef<'_>, css: &str) -> usize {
    Selector::parse(css)
        .map(|selector| root.select(&selector).count())
        .unwrap_or(0)
}

fn first_text(root: ElementRef<'_>, css: &str) -> String {
    Selector::parse(css)
        .ok()
        .and_then(|selector| root.select(&selector).next().map(crate::pipeline::text::inline_text))
        .unwrap_or_default()
}

fn attr(el: ElementRef<'_>, name: &str) -> String {
    el.value().attr(name).unwrap_or_default().to_string()
}

fn forms(root: ElementRef<'_>) -> Vec<FormSummary> {
    let (Ok(form_sel), Ok(input_sel)) = (Selector::parse("form"), Selector::parse("input")) else {
        return Vec::new();
    };

    root.select(&form_sel)
        .map(|form| FormSummary {
            action: attr(form, "action"),
            method: attr(form, "method"),
            id: attr(form, "id"),
            inputs: form
                .select(&input_sel)
                .map(|input| InputSummary {
                    kind: attr(input, "type"),
                    name: attr(input, "name"),
                    id: attr(input, "id"),
                    placeholder: attr(input, "placeholder"),
                })
                .collect(),
        })
        .collect()
}
