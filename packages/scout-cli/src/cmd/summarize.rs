use anyhow::{Context, Result};
use clap::Args;
use console::style;
use portal_scout::OpenAiSummarizer;
use std::path::PathBuf;

use crate::config::ScoutConfig;

#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// JSON dump written by a previous scan
    pub json: PathBuf,

    /// Where to write the HTML (defaults to the dump's directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(config: ScoutConfig, args: SummarizeArgs) -> Result<()> {
    let api_key = config
        .openai_api_key
        .context("OPENAI_API_KEY must be set")?;
    let output_dir = args
        .output
        .or_else(|| {
            args.json
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from("."));

    let summarizer = OpenAiSummarizer::new(api_key, config.summary_model);
    let path = summarizer
        .try_summarize(&args.json, &output_dir)
        .await
        .with_context(|| format!("Failed to summarize {}", args.json.display()))?;

    println!("{} {}", style("Summary").green(), path.display());
    Ok(())
}
