//! Typed errors for the portal scout library.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Field-level gaps are
//! never errors: extractors fall back to empty strings instead.

use thiserror::Error;

/// Errors raised while driving a portal.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// None of the candidate selectors matched anything
    #[error("no element matched any of: {candidates}")]
    ElementNotFound { candidates: String },

    /// Waited resolution ran out of time
    #[error("timed out waiting for any of: {candidates}")]
    Timeout { candidates: String },

    /// Login heuristics did not confirm a session
    #[error("authentication failed for profile {profile}")]
    AuthenticationFailed { profile: String },

    /// A page failed to load, or a command on the loaded page failed
    #[error("navigation to {url} failed: {reason}")]
    NavigationFailed { url: String, reason: String },

    /// A whole record or interaction could not be parsed
    #[error("extraction aborted: {reason}")]
    ExtractionAborted { reason: String },

    /// The browser engine itself failed (crash, closed transport)
    #[error("browser error: {0}")]
    Browser(String),

    /// Profile is missing a selector group or is malformed
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    /// Filesystem error while writing artifacts
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScoutError {
    /// Whether this error means the browser session itself is gone.
    ///
    /// Page-level failures (timeouts, failed navigations) are recoverable
    /// by skipping the page; session failures must reach the orchestrator.
    pub fn is_session_failure(&self) -> bool {
        matches!(self, ScoutError::Browser(_))
    }
}

/// Result type alias for scout operations.
pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_failure_classification() {
        assert!(ScoutError::Browser("transport closed".into()).is_session_failure());
        assert!(!ScoutError::NavigationFailed {
            url: "https://portal.example.com".into(),
            reason: "timeout".into(),
        }
        .is_session_failure());
        assert!(!ScoutError::Timeout {
            candidates: "#email".into()
        }
        .is_session_failure());
    }

    #[test]
    fn test_element_not_found_lists_candidates() {
        let err = ScoutError::ElementNotFound {
            candidates: "#user_session_email, input[type='email']".into(),
        };
        assert!(err.to_string().contains("input[type='email']"));
    }
}
