//! Keyword and pattern vocabularies shared by the scrapers.
//!
//! Portals render dates and statuses as free text, so fields are located by
//! substring markers rather than by structure.

use regex::Regex;
use std::sync::LazyLock;

/// A four-digit 21st-century year not embedded in a longer number.
///
/// No `\b`: a year directly followed by `年` has no ASCII word boundary.
static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)20\d{2}(?:\D|$)").unwrap());

/// English month names, abbreviated or full.
static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\b",
    )
    .unwrap()
});

/// One entry in the ordered date-marker list.
#[derive(Debug, Clone, Copy)]
enum DateMarker {
    Year,
    Month,
    /// Case-insensitive substring
    Phrase(&'static str),
}

impl DateMarker {
    fn matches(&self, text: &str) -> bool {
        match self {
            DateMarker::Year => RE_YEAR.is_match(text),
            DateMarker::Month => RE_MONTH.is_match(text),
            DateMarker::Phrase(phrase) => text.to_lowercase().contains(phrase),
        }
    }
}

/// Markers tried in order when picking a record's date text.
const DATE_MARKERS: &[DateMarker] = &[
    DateMarker::Year,
    DateMarker::Month,
    DateMarker::Phrase("hours ago"),
    DateMarker::Phrase("days ago"),
    DateMarker::Phrase("minutes ago"),
    DateMarker::Phrase("ago"),
    DateMarker::Phrase("today"),
    DateMarker::Phrase("yesterday"),
    DateMarker::Phrase("分鐘前"),
    DateMarker::Phrase("小時前"),
    DateMarker::Phrase("天前"),
];

/// Looser vocabulary for reply timestamps, tried after [`DATE_MARKERS`].
const TIMESTAMP_MARKERS: &[&str] = &["前", "hours", "days", "minutes", "小時", "天", "分鐘"];

/// Status vocabulary, matched case-insensitively as substrings.
pub const STATUS_KEYWORDS: &[&str] = &[
    "open", "closed", "pending", "resolved", "active", "inactive", "new", "old", "high", "low",
    "medium",
];

/// Whether `text` carries a calendar token (year or month name).
///
/// This is the discovery fallback signal; relative phrases are too common in
/// page chrome to identify ticket rows.
pub fn has_calendar_token(text: &str) -> bool {
    RE_YEAR.is_match(text) || RE_MONTH.is_match(text)
}

/// Pick the date text from a node's text fragments.
///
/// Marker-major: the first marker that matches any fragment wins, and the
/// first matching fragment for that marker is returned whole.
pub fn find_date_text<'a>(fragments: &[&'a str]) -> Option<&'a str> {
    DATE_MARKERS
        .iter()
        .find_map(|marker| fragments.iter().copied().find(|f| marker.matches(f)))
}

/// Like [`find_date_text`], then falls back to looser duration words.
pub fn find_timestamp_text<'a>(fragments: &[&'a str]) -> Option<&'a str> {
    find_date_text(fragments).or_else(|| {
        TIMESTAMP_MARKERS.iter().find_map(|marker| {
            fragments
                .iter()
                .copied()
                .find(|f| f.to_lowercase().contains(marker))
        })
    })
}

/// First fragment containing a status keyword, keyword-major.
pub fn find_status_text<'a>(fragments: &[&'a str]) -> Option<&'a str> {
    STATUS_KEYWORDS.iter().find_map(|keyword| {
        fragments
            .iter()
            .copied()
            .find(|f| f.to_lowercase().contains(keyword))
    })
}
