//! Report artifacts: JSON dump, two CSV tables, Markdown and HTML digests.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::scan::{ScanOutcome, ScanStats};
use crate::types::record::TicketRecord;

use super::categorize::{categorize, category_counts, status_counts, Category};

const RECORD_COLUMNS: [&str; 9] = [
    "ID",
    "Title",
    "Date",
    "Status",
    "Content",
    "URL",
    "Source",
    "Full_URL",
    "Interaction_Count",
];

const INTERACTION_COLUMNS: [&str; 7] = [
    "Ticket_ID",
    "Ticket_Title",
    "Interaction_Timestamp",
    "Author",
    "Content",
    "Type",
    "Cross_References",
];

/// Full JSON dump, also the summarizer's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    pub report_date: DateTime<Local>,
    pub profile: String,
    pub source: String,
    pub scan_days: u32,
    pub stats: ScanStats,
    pub total_activities: usize,
    pub categories: BTreeMap<Category, usize>,
    pub status_stats: BTreeMap<String, usize>,
    pub activities: Vec<TicketRecord>,
}

impl ReportDocument {
    pub fn from_outcome(outcome: &ScanOutcome) -> Self {
        Self {
            report_date: Local::now(),
            profile: outcome.profile.clone(),
            source: outcome.source.clone(),
            scan_days: outcome.window_days,
            stats: outcome.stats.clone(),
            total_activities: outcome.records.len(),
            categories: category_counts(&outcome.records),
            status_stats: status_counts(&outcome.records),
            activities: outcome.records.clone(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Paths of one set of written artifacts.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub records_csv: PathBuf,
    pub interactions_csv: PathBuf,
    pub markdown: PathBuf,
    pub html: PathBuf,
}

/// Writes timestamped artifacts into one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    timestamp: String,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            timestamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
        }
    }

    /// Override the file-name timestamp.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every artifact for a scan.
    pub fn write_all(&self, outcome: &ScanOutcome) -> Result<ReportPaths> {
        fs::create_dir_all(&self.output_dir)?;

        let document = ReportDocument::from_outcome(outcome);
        let source = &outcome.source;

        let paths = ReportPaths {
            json: self.path(source, "activities", "json"),
            records_csv: self.path(source, "activities", "csv"),
            interactions_csv: self.path(source, "interactions", "csv"),
            markdown: self.path(source, "activities", "md"),
            html: self.path(source, "activities", "html"),
        };

        write_json(&paths.json, &document)?;
        write_records_csv(&paths.records_csv, &document.activities)?;
        write_interactions_csv(&paths.interactions_csv, &document.activities)?;
        fs::write(&paths.markdown, render_markdown(&document))?;
        fs::write(&paths.html, render_html(&document))?;

        info!(
            dir = %self.output_dir.display(),
            records = document.total_activities,
            "Reports written"
        );
        Ok(paths)
    }

    fn path(&self, source: &str, kind: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}_{}.{}", source, kind, self.timestamp, extension))
    }
}

pub fn write_json(path: &Path, document: &ReportDocument) -> Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn write_records_csv(path: &Path, records: &[TicketRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(RECORD_COLUMNS)?;

    for record in records {
        let interaction_count = record.interactions.len().to_string();
        writer.write_record([
            record.id.as_str(),
            record.title.as_str(),
            record.date.as_str(),
            record.status.as_str(),
            record.content.as_str(),
            record.url.as_str(),
            record.source.as_str(),
            record.full_url.as_str(),
            interaction_count.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_interactions_csv(path: &Path, records: &[TicketRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(INTERACTION_COLUMNS)?;

    for record in records {
        for interaction in &record.interactions {
            let references = interaction
                .cross_references
                .iter()
                .map(|r| r.ticket_id.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            writer.write_record([
                record.id.as_str(),
                record.title.as_str(),
                interaction.timestamp.as_str(),
                interaction.author.as_str(),
                interaction.content.as_str(),
                interaction.kind.as_str(),
                references.as_str(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Human-readable digest.
pub fn render_markdown(document: &ReportDocument) -> String {
    let stats = &document.stats;
    let mut lines = vec![
        format!("# {} activity report", document.profile),
        String::new(),
        format!(
            "**Generated**: {}",
            document.report_date.format("%Y-%m-%d %H:%M:%S")
        ),
        format!("**Window**: last {} days", document.scan_days),
        format!("**Activities**: {}", document.total_activities),
        String::new(),
        "## Scan coverage".to_string(),
        String::new(),
        format!(
            "- Ticket nodes discovered: {}",
            stats.nodes_discovered
        ),
        format!("- Records extracted: {}", stats.records_extracted),
        format!("- Records in window: {}", stats.records_in_window),
        format!(
            "- Detail pages loaded: {} of {}",
            stats.detail_pages_visited.saturating_sub(stats.detail_pages_failed),
            stats.detail_pages_visited
        ),
        String::new(),
        "## Categories".to_string(),
        String::new(),
    ];

    for (category, count) in &document.categories {
        if *count > 0 {
            lines.push(format!("- {}: {}", category, count));
        }
    }
    lines.push(String::new());

    lines.push("## Activities".to_string());
    lines.push(String::new());
    for (index, record) in document.activities.iter().enumerate() {
        lines.push(format!("### {}. {}", index + 1, record.label()));
        lines.push(String::new());
        lines.push(format!("- **Category**: {}", categorize(record)));
        for (label, value) in [
            ("ID", &record.id),
            ("Date", &record.date),
            ("Status", &record.status),
            ("Content", &record.content),
            ("URL", &record.full_url),
        ] {
            if !value.is_empty() {
                lines.push(format!("- **{}**: {}", label, value));
            }
        }

        if !record.interactions.is_empty() {
            lines.push(format!("- **Interactions** ({}):", record.interactions.len()));
            for interaction in &record.interactions {
                let who = if interaction.author.is_empty() {
                    "unknown"
                } else {
                    interaction.author.as_str()
                };
                let preview: String = interaction
                    .content
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .chars()
                    .take(120)
                    .collect();
                lines.push(format!(
                    "  - [{}] {} ({}): {}",
                    interaction.kind, who, interaction.timestamp, preview
                ));
            }
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Standalone HTML digest, written whether or not a summary is generated.
pub fn render_html(document: &ReportDocument) -> String {
    let stats = &document.stats;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>{} activity report</title>\n",
        escape_html(&document.profile)
    ));
    html.push_str(HTML_STYLE);
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!(
        "<h1>{} activity report</h1>\n<p class=\"meta\">Generated {} &middot; last {} days &middot; {} activities</p>\n",
        escape_html(&document.profile),
        document.report_date.format("%Y-%m-%d %H:%M:%S"),
        document.scan_days,
        document.total_activities
    ));

    html.push_str("<h2>Scan coverage</h2>\n<ul>\n");
    for (label, value) in [
        ("Ticket nodes discovered", stats.nodes_discovered),
        ("Records extracted", stats.records_extracted),
        ("Records in window", stats.records_in_window),
        ("Detail pages visited", stats.detail_pages_visited),
        ("Detail pages failed", stats.detail_pages_failed),
    ] {
        html.push_str(&format!("<li>{}: {}</li>\n", label, value));
    }
    html.push_str("</ul>\n");

    html.push_str("<h2>Categories</h2>\n<ul>\n");
    for (category, count) in document.categories.iter().filter(|(_, count)| **count > 0) {
        html.push_str(&format!("<li>{}: {}</li>\n", escape_html(&category.to_string()), count));
    }
    html.push_str("</ul>\n");

    html.push_str("<h2>Activities</h2>\n<table>\n");
    html.push_str("<tr><th>Date</th><th>Title</th><th>Status</th><th>Category</th><th>Replies</th></tr>\n");
    for record in &document.activities {
        let title = if record.full_url.is_empty() {
            escape_html(record.label())
        } else {
            format!(
                "<a href=\"{}\">{}</a>",
                escape_html(&record.full_url),
                escape_html(record.label())
            )
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&record.date),
            title,
            escape_html(&record.status),
            escape_html(&categorize(record).to_string()),
            record.interactions.len()
        ));
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

const HTML_STYLE: &str = "<style>\n\
body { font-family: sans-serif; margin: 2em; color: #222; }\n\
.meta { color: #666; }\n\
table { border-collapse: collapse; width: 100%; }\n\
th, td { border: 1px solid #ddd; padding: 6px 8px; text-align: left; vertical-align: top; }\n\
th { background: #f4f4f4; }\n\
</style>\n";

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
