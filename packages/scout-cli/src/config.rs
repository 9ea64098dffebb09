use anyhow::{Context, Result};
use portal_scout::{
    pipeline::DEFAULT_MAX_TICKETS, summarize::DEFAULT_MODEL, SecretString, WaitConfig,
    DEFAULT_WINDOW_DAYS,
};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Scout configuration loaded from environment variables
#[derive(Debug)]
pub struct ScoutConfig {
    pub profile: Option<PathBuf>,
    pub report_dir: PathBuf,
    pub scan_days: u32,
    pub max_tickets: usize,
    pub headless: bool,
    pub wait_timeout: Duration,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub openai_api_key: Option<SecretString>,
    pub summary_model: String,
}

impl ScoutConfig {
    /// Load configuration from environment variables
    /// `.env` is loaded by `main` before this runs.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Self {
            profile: var("SCOUT_PROFILE").map(PathBuf::from),
            report_dir: var("SCOUT_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./reports")),
            scan_days: var("SCOUT_SCAN_DAYS")
                .map(|v| v.trim().parse::<u32>())
                .transpose()
                .context("SCOUT_SCAN_DAYS must be a whole number of days")?
                .unwrap_or(DEFAULT_WINDOW_DAYS),
            max_tickets: var("SCOUT_MAX_TICKETS")
                .map(|v| v.trim().parse::<usize>())
                .transpose()
                .context("SCOUT_MAX_TICKETS must be a valid number")?
                .unwrap_or(DEFAULT_MAX_TICKETS),
            headless: var("SCOUT_HEADLESS")
                .map(|v| parse_flag(&v))
                .transpose()
                .context("SCOUT_HEADLESS must be true or false")?
                .unwrap_or(false),
            wait_timeout: var("SCOUT_WAIT_TIMEOUT_SECS")
                .map(|v| v.trim().parse::<u64>())
                .transpose()
                .context("SCOUT_WAIT_TIMEOUT_SECS must be a valid number")?
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(10)),
            username: var("SCOUT_USERNAME"),
            password: var("SCOUT_PASSWORD").map(SecretString::from),
            openai_api_key: var("OPENAI_API_KEY").map(SecretString::from),
            summary_model: var("SCOUT_SUMMARY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    /// Browser waits, every bound set from `SCOUT_WAIT_TIMEOUT_SECS`.
    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig::uniform(self.wait_timeout)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognized flag value {:?}", other),
    }
}
