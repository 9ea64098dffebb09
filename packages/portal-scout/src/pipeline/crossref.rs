//! Issue-tracker references inside reply text.

use regex::Regex;
use std::collections::HashSet;
use tracing::warn;

use crate::types::profile::CrossReferenceConfig;
use crate::types::record::CrossReference;

/// Characters of surrounding text kept on each side of a match.
const CONTEXT_CHARS: usize = 40;

/// Finds `KEY-123` ticket ids and `<tracker>/browse/KEY-123` links.
#[derive(Debug, Clone)]
pub struct CrossReferenceScanner {
    tracker_url: String,
    link: Regex,
    bare: Regex,
}

impl CrossReferenceScanner {
    /// Build from profile config. `None` when there are no project keys.
    pub fn new(config: &CrossReferenceConfig) -> Option<Self> {
        let keys: Vec<String> = config
            .project_keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();
        if keys.is_empty() {
            return None;
        }

        let tracker_url = config.tracker_url.trim_end_matches('/').to_string();
        let alternation = keys.join("|");
        let link = format!(
            r"{}/browse/((?:{})-\d+)",
            regex::escape(&tracker_url),
            alternation
        );
        let bare = format!(r"\b((?:{})-\d+)\b", alternation);

        match (Regex::new(&link), Regex::new(&bare)) {
            (Ok(link), Ok(bare)) => Some(Self {
                tracker_url,
                link,
                bare,
            }),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Cross-reference pattern rejected");
                None
            }
        }
    }

    /// Unique references in `text`, links first, then bare ids.
    pub fn scan(&self, text: &str) -> Vec<CrossReference> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for regex in [&self.link, &self.bare] {
            for caps in regex.captures_iter(text) {
                let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                if !seen.insert(id.as_str().to_string()) {
                    continue;
                }

                found.push(CrossReference {
                    ticket_id: id.as_str().to_string(),
                    url: format!("{}/browse/{}", self.tracker_url, id.as_str()),
                    context: context_around(text, whole.start(), whole.end()),
                });
            }
        }

        found
    }
}

/// Up to [`CONTEXT_CHARS`] characters either side of `start..end`.
fn context_around(text: &str, start: usize, end: usize) -> String {
    let before = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let after = text[end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    text[before..after]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
