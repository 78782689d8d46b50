//! Common types used throughout the matchmaking service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller-supplied player identity
pub type PlayerId = String;

/// Unique identifier for matches
pub type MatchId = Uuid;

/// Unique identifier for tickets
pub type TicketId = Uuid;

/// Name of a matchmaking queue
pub type QueueName = String;

/// Progress of a ticket toward a playable match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    /// Waiting for the match to become startable
    InProgress,
    /// The match is ready and the initiator should provision a server
    StartServer,
    /// A join code is available (terminal)
    Found,
    /// The match was abandoned (terminal)
    Timeout,
}

impl TicketStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Found | TicketStatus::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::InProgress => "InProgress",
            TicketStatus::StartServer => "StartServer",
            TicketStatus::Found => "Found",
            TicketStatus::Timeout => "Timeout",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a ticket as returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    pub id: TicketId,
    pub status: TicketStatus,
    pub match_id: Option<MatchId>,
    pub players: Vec<PlayerId>,
    pub join_code: Option<String>,
}

impl TicketView {
    /// View of a ticket whose match has been abandoned
    pub fn expired(id: TicketId) -> Self {
        Self {
            id,
            status: TicketStatus::Timeout,
            match_id: None,
            players: Vec::new(),
            join_code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_as_literal_names() {
        assert_eq!(
            serde_json::to_string(&TicketStatus::InProgress).unwrap(),
            "\"InProgress\""
        );
        assert_eq!(
            serde_json::to_string(&TicketStatus::StartServer).unwrap(),
            "\"StartServer\""
        );
        let status: TicketStatus = serde_json::from_str("\"Timeout\"").unwrap();
        assert_eq!(status, TicketStatus::Timeout);
        assert_eq!(TicketStatus::Found.to_string(), "Found");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TicketStatus::InProgress.is_terminal());
        assert!(!TicketStatus::StartServer.is_terminal());
        assert!(TicketStatus::Found.is_terminal());
        assert!(TicketStatus::Timeout.is_terminal());
    }

    #[test]
    fn test_expired_view_shape() {
        let id = Uuid::new_v4();
        let view = TicketView::expired(id);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "Timeout");
        assert!(json["matchId"].is_null());
        assert!(json["joinCode"].is_null());
        assert_eq!(json["players"].as_array().unwrap().len(), 0);
    }
}
