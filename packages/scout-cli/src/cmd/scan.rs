use anyhow::{Context, Result};
use clap::Args;
use console::style;
use portal_scout::{
    Credentials, OpenAiSummarizer, ReportWriter, ScanOptions, ScanOutcome, SiteProfile,
    Summarizer,
};
use std::path::PathBuf;
use tracing::info;

use crate::config::ScoutConfig;
use crate::prompt;

#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// Profile JSON file (overrides SCOUT_PROFILE)
    #[arg(short, long)]
    pub profile: Option<PathBuf>,

    /// Trailing window in days (overrides SCOUT_SCAN_DAYS)
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Most tickets read off the dashboard (overrides SCOUT_MAX_TICKETS)
    #[arg(long)]
    pub max_tickets: Option<usize>,

    /// Report directory (overrides SCOUT_REPORT_DIR)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run Chrome without a window
    #[arg(long)]
    pub headless: bool,

    /// Skip visiting ticket detail pages
    #[arg(long)]
    pub no_interactions: bool,

    /// Skip the LLM summary even if OPENAI_API_KEY is set
    #[arg(long)]
    pub no_summary: bool,
}

pub async fn run(config: ScoutConfig, args: ScanArgs) -> Result<()> {
    let profile_path = args
        .profile
        .or(config.profile.clone())
        .context("No profile given: pass --profile or set SCOUT_PROFILE")?;
    let profile = SiteProfile::from_file(&profile_path)
        .with_context(|| format!("Failed to load profile {}", profile_path.display()))?;

    let options = ScanOptions {
        window_days: args.days.unwrap_or(config.scan_days),
        max_tickets: args.max_tickets.unwrap_or(config.max_tickets),
        wait: config.wait_config(),
        fetch_interactions: !args.no_interactions,
    };

    println!(
        "{} {} (last {} days)",
        style("Scanning").cyan().bold(),
        profile.name,
        options.window_days
    );

    let credentials = prompt::credentials(&profile, config.username, config.password)?;
    let outcome = scan(profile, options, credentials, args.headless || config.headless).await?;
    print_outcome(&outcome);

    let writer = ReportWriter::new(args.output.unwrap_or(config.report_dir));
    let paths = writer
        .write_all(&outcome)
        .context("Failed to write reports")?;
    println!("{} {}", style("JSON").green(), paths.json.display());
    println!("{} {}", style("CSV").green(), paths.records_csv.display());
    println!("{} {}", style("CSV").green(), paths.interactions_csv.display());
    println!("{} {}", style("Markdown").green(), paths.markdown.display());
    println!("{} {}", style("HTML").green(), paths.html.display());

    if args.no_summary {
        return Ok(());
    }
    let Some(api_key) = config.openai_api_key else {
        info!("OPENAI_API_KEY not set, skipping summary");
        return Ok(());
    };

    let summarizer = OpenAiSummarizer::new(api_key, config.summary_model);
    if let Some(path) = summarizer.summarize(&paths.json, writer.output_dir()).await {
        println!("{} {}", style("Summary").green(), path.display());
    } else {
        println!("{}", style("Summary skipped, see log for details").yellow());
    }
    Ok(())
}

#[cfg(feature = "chrome")]
async fn scan(
    profile: SiteProfile,
    options: ScanOptions,
    credentials: Credentials,
    headless: bool,
) -> Result<ScanOutcome> {
    use portal_scout::browser::{ChromeBrowser, ChromeOptions};
    use portal_scout::Scanner;

    let browser = ChromeBrowser::launch(&ChromeOptions {
        headless,
        ..Default::default()
    })
    .await
    .context("Failed to launch Chrome")?;

    let name = profile.name.clone();
    Scanner::new(browser, profile, options)
        .run(credentials)
        .await
        .with_context(|| format!("Scan of {} failed", name))
}

#[cfg(not(feature = "chrome"))]
async fn scan(
    _profile: SiteProfile,
    _options: ScanOptions,
    _credentials: Credentials,
    _headless: bool,
) -> Result<ScanOutcome> {
    anyhow::bail!("scout was built without the `chrome` feature")
}

fn print_outcome(outcome: &ScanOutcome) {
    let stats = &outcome.stats;
    println!();
    println!(
        "  Discovered {}, extracted {}",
        stats.nodes_discovered, stats.records_extracted
    );
    println!(
        "  {} in the last {} days, {} of {} detail pages loaded",
        style(stats.records_in_window).bold(),
        outcome.window_days,
        stats.detail_pages_visited.saturating_sub(stats.detail_pages_failed),
        stats.detail_pages_visited
    );
    for record in &outcome.records {
        println!(
            "  {} {} {}",
            style(if record.date.is_empty() { "-" } else { record.date.as_str() }).dim(),
            record.label(),
            style(format!("({} replies)", record.interactions.len())).dim()
        );
    }
    println!();
}
