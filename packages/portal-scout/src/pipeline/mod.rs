//! Scraping pipeline: discovery, extraction, recency, interactions.
//!
//! All DOM work happens on owned HTML snapshots. A `scraper::Html` is never
//! held across a browser call, since any navigation invalidates it.

pub mod crossref;
pub mod discovery;
pub mod extract;
pub mod interactions;
pub mod markers;
pub mod recency;
pub mod text;

pub use crossref::CrossReferenceScanner;
pub use discovery::{Discovered, Strategy, TicketDiscovery, DEFAULT_MAX_TICKETS};
pub use extract::RecordExtractor;
pub use interactions::{classify, InteractionExtractor, ThreadStrategy, MAX_INTERACTIONS};
pub use recency::{RecencyFilter, Verdict};
