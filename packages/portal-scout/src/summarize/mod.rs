//! Optional LLM summary of a report dump.
//!
//! A summary is a nice-to-have: every failure is logged and turned into
//! `None` so the other artifacts are never held back.

mod openai;

pub use openai::{OpenAiSummarizer, SummaryError, DEFAULT_MODEL};

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Turns a JSON report dump into an HTML summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Path of the written HTML file, or `None` on any failure.
    async fn summarize(&self, json_path: &Path, output_dir: &Path) -> Option<PathBuf>;
}
