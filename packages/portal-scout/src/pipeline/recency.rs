//! Trailing-window date filter.
//!
//! Date text comes straight from the page, so evaluation is layered:
//! relative phrases, then "N days ago", then absolute formats, then a
//! generic "ago" marker. When the text is ambiguous the filter accepts.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

use crate::types::record::TicketRecord;

/// Phrases that are always inside any window.
const ALWAYS_RECENT: &[&str] = &[
    "hours ago",
    "hour ago",
    "minutes ago",
    "minute ago",
    "mins ago",
    "seconds ago",
    "just now",
    "today",
    "yesterday",
    "今天",
    "昨天",
    "剛剛",
    "小時前",
    "小时前",
    "分鐘前",
    "分钟前",
];

const DAYS_AGO_MARKERS: &[&str] = &["day ago", "days ago", "天前"];

const GENERIC_AGO_MARKERS: &[&str] = &["ago", "前"];

static RE_DAYS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:days?\s*ago|天前)").unwrap());

static RE_MONTH_DAY_CJK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})月(\d{1,2})日$").unwrap());

/// Date-looking substrings inside longer text, most specific first.
static RE_EMBEDDED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\d{4}[-/]\d{1,2}[-/]\d{1,2}|\d{1,2}/\d{1,2}/\d{4}|\d{4}年\d{1,2}月\d{1,2}日|\d{1,2}日\d{1,2}月\d{4}年|\d{1,2}月\d{1,2}日|(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.? \d{1,2}, \d{4}",
    )
    .unwrap()
});

/// Absolute date formats, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y年%m月%d日",
    "%d日%m月%Y年",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Why a date text was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// "today", "3 hours ago", ...
    Relative,
    /// "N days ago"; `None` when N could not be read
    DaysAgo(Option<i64>),
    /// Parsed to a calendar date
    Absolute(NaiveDate),
    /// Unparsed but contains "ago"/"前"
    AgoMarker,
    /// Nothing recognizable
    Unrecognized,
    Empty,
}

impl Verdict {
    fn accepted(&self, today: NaiveDate, window_days: u32) -> bool {
        let window = i64::from(window_days);
        match self {
            Verdict::Relative | Verdict::AgoMarker => true,
            Verdict::DaysAgo(Some(days)) => *days <= window,
            Verdict::DaysAgo(None) => true,
            Verdict::Absolute(date) => (today - *date).num_days() <= window,
            Verdict::Unrecognized | Verdict::Empty => false,
        }
    }
}

/// Decides whether a record falls inside a trailing-day window.
#[derive(Debug, Clone, Copy)]
pub struct RecencyFilter {
    today: NaiveDate,
}

impl RecencyFilter {
    /// Filter anchored on an explicit date.
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Filter anchored on the local date.
    pub fn today() -> Self {
        Self::new(Local::now().date_naive())
    }

    pub fn is_within_window(&self, record: &TicketRecord, window_days: u32) -> bool {
        self.accepts(&record.date, window_days)
    }

    pub fn accepts(&self, date_text: &str, window_days: u32) -> bool {
        self.evaluate(date_text)
            .accepted(self.today, window_days)
    }

    /// Classify date text without applying a window.
    pub fn evaluate(&self, date_text: &str) -> Verdict {
        let text = date_text.trim();
        if text.is_empty() {
            return Verdict::Empty;
        }
        let lower = text.to_lowercase();

        if ALWAYS_RECENT.iter().any(|phrase| lower.contains(phrase)) {
            return Verdict::Relative;
        }

        if DAYS_AGO_MARKERS.iter().any(|marker| lower.contains(marker)) {
            let days = RE_DAYS_AGO
                .captures(&lower)
                .and_then(|caps| caps[1].parse::<i64>().ok());
            return Verdict::DaysAgo(days);
        }

        if let Some(date) = self.parse_absolute(text) {
            return Verdict::Absolute(date);
        }

        if GENERIC_AGO_MARKERS.iter().any(|marker| lower.contains(marker)) {
            return Verdict::AgoMarker;
        }

        Verdict::Unrecognized
    }

    fn parse_absolute(&self, text: &str) -> Option<NaiveDate> {
        self.parse_exact(text).or_else(|| {
            RE_EMBEDDED_DATE
                .find_iter(text)
                .find_map(|m| self.parse_exact(m.as_str()))
        })
    }

    fn parse_exact(&self, text: &str) -> Option<NaiveDate> {
        if let Some(date) = DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        {
            return Some(date);
        }

        if let Some(caps) = RE_MONTH_DAY_CJK.captures(text) {
            let month: u32 = caps[1].parse().ok()?;
            let day: u32 = caps[2].parse().ok()?;
            return self.month_day_without_year(month, day);
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.date_naive());
        }

        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .map(|dt| dt.date())
    }

    /// A yearless date is this year's, unless that lands in the future.
    fn month_day_without_year(&self, month: u32, day: u32) -> Option<NaiveDate> {
        let this_year = NaiveDate::from_ymd_opt(self.today.year(), month, day);
        match this_year {
            Some(date) if date <= self.today => Some(date),
            _ => NaiveDate::from_ymd_opt(self.today.year() - 1, month, day),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> RecencyFilter {
        RecencyFilter::new(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap())
    }

    #[test]
    fn test_relative_phrases_ignore_window() {
        for phrase in [
            "today",
            "Today 09:12",
            "3 hours ago",
            "an hour ago",
            "12 minutes ago",
            "yesterday",
            "5分鐘前",
            "2小時前",
            "今天",
        ] {
            assert!(filter().accepts(phrase, 0), "{} should be accepted", phrase);
        }
    }

    #[test]
    fn test_days_ago_boundary() {
        for n in 1..=30u32 {
            let text = format!("{} days ago", n);
            assert!(filter().accepts(&text, n), "{} in window {}", text, n);
            assert!(!filter().accepts(&text, n - 1), "{} outside window {}", text, n - 1);
        }
        assert!(filter().accepts("3天前", 3));
        assert!(!filter().accepts("3天前", 2));
    }

    #[test]
    fn test_unreadable_day_count_is_accepted() {
        assert_eq!(filter().evaluate("a day ago"), Verdict::DaysAgo(None));
        assert!(filter().accepts("a day ago", 0));
    }

    #[test]
    fn test_iso_boundary() {
        let f = filter();
        assert!(f.accepts("2024-05-10", 10));
        assert!(!f.accepts("2024-05-09", 10));
    }

    #[test]
    fn test_absolute_formats() {
        let f = filter();
        let may_15 = Verdict::Absolute(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
        assert_eq!(f.evaluate("2024/05/15"), may_15);
        assert_eq!(f.evaluate("05/15/2024"), may_15);
        assert_eq!(f.evaluate("15/05/2024"), may_15);
        assert_eq!(f.evaluate("2024年5月15日"), may_15);
        assert_eq!(f.evaluate("15日5月2024年"), may_15);
        assert_eq!(f.evaluate("5月15日"), may_15);
        assert_eq!(f.evaluate("2024-05-15T08:30:00Z"), may_15);
        assert_eq!(f.evaluate("2024-05-15 08:30"), may_15);
        assert_eq!(f.evaluate("Updated May 15, 2024 by Jane"), may_15);
        assert_eq!(f.evaluate("Created 2024-05-15"), may_15);
    }

    #[test]
    fn test_yearless_future_date_rolls_back() {
        assert_eq!(
            filter().evaluate("12月24日"),
            Verdict::Absolute(NaiveDate::from_ymd_opt(2023, 12, 24).unwrap())
        );
    }

    #[test]
    fn test_fallbacks() {
        let f = filter();
        assert_eq!(f.evaluate("a while ago"), Verdict::AgoMarker);
        assert!(f.accepts("a while ago", 1));
        assert!(f.accepts("不久前", 1));
        assert!(!f.accepts("Printer jammed", 10));
        assert!(!f.accepts("", 10));
        assert!(!f.accepts("   ", 10));
    }

    #[test]
    fn test_record_window() {
        let record = TicketRecord {
            date: "15 days ago".into(),
            ..Default::default()
        };
        assert!(!filter().is_within_window(&record, 10));
        assert!(filter().is_within_window(&record, 15));
    }
}
