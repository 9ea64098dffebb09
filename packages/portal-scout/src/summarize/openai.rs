//! OpenAI-compatible chat completions summarizer.

use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::report::ReportDocument;
use crate::types::credentials::SecretString;

use super::Summarizer;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You write weekly activity reports for a field application \
engineering team. Answer with a single self-contained HTML document and nothing else.";

/// Errors from one summary attempt.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("model returned no content")]
    Empty,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report error: {0}")]
    Report(#[from] crate::error::ScoutError),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Summarizer backed by `POST {base_url}/chat/completions`.
pub struct OpenAiSummarizer {
    http_client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(api_key: impl Into<SecretString>, model: impl Into<String>) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    /// Set a custom base URL (proxies, compatible providers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn try_summarize(&self, json_path: &Path, output_dir: &Path) -> Result<PathBuf, SummaryError> {
        let document = ReportDocument::from_file(json_path)?;
        let prompt = build_prompt(&document)?;
        debug!(chars = prompt.chars().count(), model = %self.model, "Sending summary prompt");

        let html = self.complete(&prompt).await?;
        let html = strip_code_fence(&html);
        if html.trim().is_empty() {
            return Err(SummaryError::Empty);
        }

        tokio::fs::create_dir_all(output_dir).await?;
        let path = output_dir.join(format!(
            "weekly_report_{}.html",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        tokio::fs::write(&path, html).await?;
        Ok(path)
    }

    async fn complete(&self, prompt: &str) -> Result<String, SummaryError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.3,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| SummaryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SummaryError::Api(format!("{}: {}", status, error_text)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SummaryError::Parse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(SummaryError::Empty)
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, json_path: &Path, output_dir: &Path) -> Option<PathBuf> {
        match self.try_summarize(json_path, output_dir).await {
            Ok(path) => {
                info!(path = %path.display(), "Summary written");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Summary failed, continuing without it");
                None
            }
        }
    }
}

fn build_prompt(document: &ReportDocument) -> Result<String, SummaryError> {
    let data = serde_json::to_string_pretty(document)
        .map_err(|e| SummaryError::Parse(e.to_string()))?;

    Ok(format!(
        "Summarize the following {total} ticket activities from {profile} over the last \
         {days} days as an HTML table.\n\
         \n\
         One row per ticket with columns: Ticket ID, Title, Date, Status, Tracker references, \
         Highlights. Ticket ids appear in `full_url` as `/tickets/<id>` when the `id` field is \
         empty. Tracker references are listed under each interaction's `cross_references`; \
         link each one to its `url`. Highlights should condense the interactions into one or \
         two sentences about what was done for the customer.\n\
         \n\
         Data:\n{data}",
        total = document.total_activities,
        profile = document.profile,
        days = document.scan_days,
        data = data,
    ))
}

/// Drop a Markdown code fence the model may wrap its HTML in.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{ScanOutcome, ScanStats};
    use crate::report::ReportWriter;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```html\n<p>x</p>\n```"), "<p>x</p>");
        assert_eq!(strip_code_fence("  <p>x</p> "), "<p>x</p>");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = ScanOutcome {
            profile: "eService".into(),
            source: "eservice".into(),
            started_at: Local::now(),
            window_days: 7,
            records: Vec::new(),
            stats: ScanStats::default(),
        };
        let paths = ReportWriter::new(dir.path())
            .with_timestamp("20240520_120000")
            .write_all(&outcome)
            .unwrap();

        let summarizer = OpenAiSummarizer::new("sk-test", DEFAULT_MODEL)
            .with_base_url("http://127.0.0.1:9/v1");
        assert!(summarizer.summarize(&paths.json, dir.path()).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_dump_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let summarizer = OpenAiSummarizer::new("sk-test", DEFAULT_MODEL);
        let missing = dir.path().join("nope.json");
        assert!(summarizer.summarize(&missing, dir.path()).await.is_none());
    }
}
