//! Scraped ticket and interaction records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One ticket scraped from a portal list view.
///
/// Every field defaults to an empty string when it could not be extracted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketRecord {
    pub id: String,
    pub title: String,
    /// Raw date text as shown on the page; parsed later by the recency filter
    pub date: String,
    pub status: String,
    /// Short preview of the ticket body
    pub content: String,
    /// Link as written in the page (may be relative)
    pub url: String,
    /// Link resolved against the portal origin
    pub full_url: String,
    pub source: String,
    /// Flattened node text, kept for debugging selector drift
    pub raw_text: String,
    pub interactions: Vec<InteractionRecord>,
}

impl TicketRecord {
    /// Best available label for logs and reports.
    pub fn label(&self) -> &str {
        if !self.title.is_empty() {
            &self.title
        } else if !self.id.is_empty() {
            &self.id
        } else {
            "(untitled)"
        }
    }
}

/// One reply/comment/event in a ticket thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionRecord {
    /// Raw timestamp text near the entry
    pub timestamp: String,
    pub author: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub cross_references: Vec<CrossReference>,
}

/// Keyword classification of an interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    CustomerResponse,
    AgentResponse,
    TicketCreated,
    TicketClosed,
    Response,
    #[default]
    Other,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::CustomerResponse => "customer_response",
            InteractionKind::AgentResponse => "agent_response",
            InteractionKind::TicketCreated => "ticket_created",
            InteractionKind::TicketClosed => "ticket_closed",
            InteractionKind::Response => "response",
            InteractionKind::Other => "other",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to an external issue-tracker ticket found in reply text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    /// e.g. `OPS-1234`
    pub ticket_id: String,
    /// Canonical tracker URL for the ticket
    pub url: String,
    /// Text surrounding the match
    pub context: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_snake_case_under_type() {
        let interaction = InteractionRecord {
            kind: InteractionKind::CustomerResponse,
            ..Default::default()
        };
        let json = serde_json::to_value(&interaction).unwrap();
        assert_eq!(json["type"], "customer_response");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let record: TicketRecord = serde_json::from_str(r#"{"title":"Modem reboot"}"#).unwrap();
        assert_eq!(record.id, "");
        assert!(record.interactions.is_empty());
        assert_eq!(record.label(), "Modem reboot");
        assert_eq!(TicketRecord::default().label(), "(untitled)");
    }
}
