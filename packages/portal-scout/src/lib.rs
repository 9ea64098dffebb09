//! Ticketing Portal Scout
//!
//! Logs into a customer-support portal through a real browser, finds the
//! ticket list on the landing page, keeps the tickets touched within a recent
//! window, and pulls the reply thread off each ticket's detail page.
//!
//! # Design Philosophy
//!
//! Portal markup is unstable and unannounced, so nothing here trusts a single
//! selector:
//!
//! - Every element is addressed by an ordered list of candidate selectors
//! - Ticket discovery walks a fixed chain of strategies, ending in a
//!   date-text fallback
//! - Login success is judged by where the browser lands, not by a response
//! - A bad ticket row or an unreachable detail page never fails the run
//!
//! # Usage
//!
//! ```rust,ignore
//! use portal_scout::{Credentials, ScanOptions, Scanner, SiteProfile};
//! use portal_scout::browser::{ChromeBrowser, ChromeOptions};
//!
//! let profile = SiteProfile::from_file("profiles/eservice.json")?;
//! let browser = ChromeBrowser::launch(&ChromeOptions::default()).await?;
//!
//! let outcome = Scanner::new(browser, profile, ScanOptions::default())
//!     .run(Credentials::new("fae@example.com", "hunter2"))
//!     .await?;
//! println!("{} recent tickets", outcome.records.len());
//! ```
//!
//! # Modules
//!
//! - [`browser`] - Browser seam and the Chrome DevTools driver
//! - [`selector`] - Candidate selector lists and their resolution
//! - [`auth`] - Single and dual login state machine
//! - [`pipeline`] - Discovery, extraction, recency, and reply threads
//! - [`scan`] - One full scan, login through enrichment
//! - [`report`] - JSON, CSV, and Markdown artifacts
//! - [`summarize`] - Optional LLM summary of a report
//! - [`inspect`] - Offline profile tuning against saved HTML
//! - [`testing`] - In-memory browser for tests

pub mod auth;
pub mod browser;
pub mod error;
pub mod inspect;
pub mod pipeline;
pub mod report;
pub mod scan;
pub mod selector;
pub mod summarize;
pub mod testing;
pub mod types;
pub mod wait;

// Re-export core types at crate root
pub use auth::{AuthState, AuthenticationFlow};
pub use browser::Browser;
pub use error::{Result, ScoutError};
pub use pipeline::{
    InteractionExtractor, RecencyFilter, RecordExtractor, TicketDiscovery, Verdict,
};
pub use report::{Category, ReportDocument, ReportPaths, ReportWriter};
pub use scan::{ScanOptions, ScanOutcome, ScanStats, Scanner, DEFAULT_WINDOW_DAYS};
pub use selector::{Locator, SelectorList};
pub use summarize::{OpenAiSummarizer, Summarizer};
pub use types::{
    credentials::{Credentials, SecretString},
    profile::{CrossReferenceConfig, SiteProfile, SuccessRules, UrlPredicate},
    record::{CrossReference, InteractionKind, InteractionRecord, TicketRecord},
};
pub use wait::WaitConfig;
