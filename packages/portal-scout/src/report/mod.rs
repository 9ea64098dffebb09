//! Weekly report artifacts.

pub mod categorize;
pub mod writer;

pub use categorize::{categorize, category_counts, status_counts, Category};
pub use writer::{ReportDocument, ReportPaths, ReportWriter};
