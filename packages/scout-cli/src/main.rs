//! Portal scout CLI
//!
//! Logs into a ticketing portal, collects recently touched tickets with their
//! reply threads, and writes weekly report artifacts.

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{theme::ColorfulTheme, Select};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;
mod config;
mod prompt;

use config::ScoutConfig;

/// Where the interactive menu looks for profiles.
const PROFILE_DIR: &str = "profiles";

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Scrape recent ticket activity from support portals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, scan recent tickets, and write reports
    Scan(cmd::scan::ScanArgs),

    /// Run discovery and extraction against a saved HTML page
    Inspect(cmd::inspect::InspectArgs),

    /// Summarize an existing JSON report dump
    Summarize(cmd::summarize::SummarizeArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before the filter reads RUST_LOG
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,portal_scout=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    if let Err(e) = run().await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = ScoutConfig::from_env()?;

    match cli.command {
        Some(Commands::Scan(args)) => cmd::scan::run(config, args).await,
        Some(Commands::Inspect(args)) => cmd::inspect::run(config, args),
        Some(Commands::Summarize(args)) => cmd::summarize::run(config, args).await,
        None => interactive_menu(config).await,
    }
}

async fn interactive_menu(config: ScoutConfig) -> Result<()> {
    println!("{}", style("Portal scout").cyan().bold());

    let items = ["Scan a portal", "Quit"];
    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("What would you like to do?")
        .items(&items)
        .default(0)
        .interact()?;

    if choice != 0 {
        return Ok(());
    }

    let profile = match &config.profile {
        Some(path) => path.clone(),
        None => prompt::choose_profile(Path::new(PROFILE_DIR))?,
    };

    cmd::scan::run(
        config,
        cmd::scan::ScanArgs {
            profile: Some(profile),
            ..Default::default()
        },
    )
    .await
}
