use anyhow::{Context, Result};
use clap::Args;
use console::style;
use portal_scout::{inspect::inspect_file, pipeline::DEFAULT_MAX_TICKETS, SiteProfile};
use std::path::PathBuf;

use crate::config::ScoutConfig;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Saved HTML page to inspect
    pub html: PathBuf,

    /// Profile JSON file (overrides SCOUT_PROFILE)
    #[arg(short, long)]
    pub profile: Option<PathBuf>,

    /// Print the full inspection as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(config: ScoutConfig, args: InspectArgs) -> Result<()> {
    let profile_path = args
        .profile
        .or(config.profile)
        .context("No profile given: pass --profile or set SCOUT_PROFILE")?;
    let profile = SiteProfile::from_file(&profile_path)
        .with_context(|| format!("Failed to load profile {}", profile_path.display()))?;

    let report = inspect_file(&args.html, &profile, DEFAULT_MAX_TICKETS)
        .with_context(|| format!("Failed to inspect {}", args.html.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", style("Page").cyan().bold(), report.title);
    println!(
        "  {} forms, {} tables, {} lists",
        report.forms.len(),
        report.tables,
        report.lists
    );

    println!("{}", style("Selector groups").cyan().bold());
    for group in &report.groups {
        match &group.matched {
            Some(matched) => println!("  {} {} -> {}", style("ok").green(), group.group, matched),
            None => println!("  {} {}", style("--").red(), group.group),
        }
    }

    println!("{}", style("Containers").cyan().bold());
    for container in &report.containers {
        println!("  {} x{}", container.selector, container.count);
    }

    println!(
        "{} {} via {}",
        style("Tickets").cyan().bold(),
        report.records.len(),
        report.strategy.as_deref().unwrap_or("date-text fallback")
    );
    for record in &report.records {
        println!("  [{}] {} {}", record.date, record.label(), style(&record.full_url).dim());
    }
    Ok(())
}
