//! Scan orchestration: login, discover, extract, filter, enrich.
//!
//! The scanner owns the browser for the whole scan and closes it on every
//! exit path. Node-level failures are counted and skipped; a dead browser
//! session aborts the scan.

use chrono::{DateTime, Local};
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::AuthenticationFlow;
use crate::browser::Browser;
use crate::error::{Result, ScoutError};
use crate::pipeline::{
    InteractionExtractor, RecencyFilter, RecordExtractor, TicketDiscovery, DEFAULT_MAX_TICKETS,
};
use crate::types::credentials::Credentials;
use crate::types::profile::{groups, SiteProfile};
use crate::types::record::TicketRecord;
use crate::wait::{wait_for_ready, WaitConfig};

/// Default trailing window in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 10;

/// Knobs for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub window_days: u32,
    pub max_tickets: usize,
    pub wait: WaitConfig,
    /// Visit each in-window ticket's detail page
    pub fetch_interactions: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            max_tickets: DEFAULT_MAX_TICKETS,
            wait: WaitConfig::default(),
            fetch_interactions: true,
        }
    }
}

/// Attempted vs. succeeded counts for every stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub nodes_discovered: usize,
    pub records_extracted: usize,
    pub records_in_window: usize,
    pub detail_pages_visited: usize,
    pub detail_pages_failed: usize,
}

/// Result of a completed scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub profile: String,
    pub source: String,
    pub started_at: DateTime<Local>,
    pub window_days: u32,
    /// In-window records, enriched with interactions
    pub records: Vec<TicketRecord>,
    pub stats: ScanStats,
}

/// Runs one scan against one portal.
pub struct Scanner<B: Browser> {
    browser: B,
    profile: SiteProfile,
    options: ScanOptions,
    recency: RecencyFilter,
}

impl<B: Browser> Scanner<B> {
    pub fn new(browser: B, profile: SiteProfile, options: ScanOptions) -> Self {
        Self {
            browser,
            profile,
            options,
            recency: RecencyFilter::today(),
        }
    }

    /// Anchor the recency window on a fixed date.
    pub fn with_recency(mut self, recency: RecencyFilter) -> Self {
        self.recency = recency;
        self
    }

    /// Run the scan. The browser is closed before this returns, success or not.
    pub async fn run(self, credentials: Credentials) -> Result<ScanOutcome> {
        let result = self.scan(&credentials).await;
        drop(credentials);

        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }

        if let Err(e) = &result {
            warn!(profile = %self.profile.name, error = %e, "Scan aborted");
        }
        result
    }

    async fn scan(&self, credentials: &Credentials) -> Result<ScanOutcome> {
        let started_at = Local::now();
        let mut stats = ScanStats::default();

        info!(
            profile = %self.profile.name,
            window_days = self.options.window_days,
            max_tickets = self.options.max_tickets,
            "Starting scan"
        );

        let mut auth = AuthenticationFlow::new(&self.browser, self.options.wait.clone());
        if !auth.login(&self.profile, credentials).await {
            return Err(ScoutError::AuthenticationFailed {
                profile: self.profile.name.clone(),
            });
        }

        if let Some(dashboard) = &self.profile.dashboard_url {
            self.browser.navigate(dashboard).await?;
        }
        wait_for_ready(&self.browser, &self.options.wait).await?;

        let html = self.browser.content().await?;
        let records = self.extract_records(&html, &mut stats);

        let mut in_window: Vec<TicketRecord> = records
            .into_iter()
            .filter(|record| self.recency.is_within_window(record, self.options.window_days))
            .collect();
        stats.records_in_window = in_window.len();
        info!(
            extracted = stats.records_extracted,
            in_window = stats.records_in_window,
            "Recency filter applied"
        );

        if self.options.fetch_interactions {
            self.enrich(&mut in_window, &mut stats).await?;
        }

        info!(
            profile = %self.profile.name,
            discovered = stats.nodes_discovered,
            extracted = stats.records_extracted,
            in_window = stats.records_in_window,
            visited = stats.detail_pages_visited,
            failed = stats.detail_pages_failed,
            "Scan finished"
        );

        Ok(ScanOutcome {
            profile: self.profile.name.clone(),
            source: self.profile.source.clone(),
            started_at,
            window_days: self.options.window_days,
            records: in_window,
            stats,
        })
    }

    /// Discover and extract from one dashboard snapshot.
    fn extract_records(&self, html: &str, stats: &mut ScanStats) -> Vec<TicketRecord> {
        let document = Html::parse_document(html);
        let discovery = TicketDiscovery::new(self.options.max_tickets)
            .with_preferred(self.profile.optional_selector(groups::TICKET_ITEM));
        let extractor = RecordExtractor::new(&self.profile.base_url, self.profile.source.clone());

        let found = discovery.find(document.root_element());
        stats.nodes_discovered = found.nodes.len();

        let records: Vec<TicketRecord> = found
            .nodes
            .into_iter()
            .map(|node| extractor.extract(node))
            .collect();
        stats.records_extracted = records.len();
        records
    }

    async fn enrich(&self, records: &mut [TicketRecord], stats: &mut ScanStats) -> Result<()> {
        let extractor = InteractionExtractor::from_profile(&self.profile, self.options.wait.clone());

        for record in records.iter_mut() {
            if record.full_url.is_empty() {
                continue;
            }

            stats.detail_pages_visited += 1;
            match extractor.fetch(&self.browser, record).await? {
                Some(interactions) => record.interactions = interactions,
                None => stats.detail_pages_failed += 1,
            }
        }

        if stats.detail_pages_failed > 0 {
            warn!(
                failed = stats.detail_pages_failed,
                visited = stats.detail_pages_visited,
                "Some detail pages could not be loaded"
            );
        }
        Ok(())
    }
}
