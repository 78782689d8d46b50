//! Ticket entity: a player's claim check on a match

use crate::types::{MatchId, PlayerId, QueueName, TicketId, TicketStatus};
use crate::utils::generate_ticket_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    queue: QueueName,
    match_id: MatchId,
    player_id: PlayerId,
    status: TicketStatus,
    created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(
        queue: QueueName,
        match_id: MatchId,
        player_id: PlayerId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_ticket_id(),
            queue,
            match_id,
            player_id,
            status: TicketStatus::InProgress,
            created_at: now,
        }
    }

    pub fn id(&self) -> TicketId {
        self.id
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    /// Player who requested the ticket
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_status(&mut self, status: TicketStatus) {
        self.status = status;
    }

    pub fn is_expired(&self) -> bool {
        self.status == TicketStatus::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{current_timestamp, generate_match_id};

    #[test]
    fn test_new_ticket_is_in_progress() {
        let match_id = generate_match_id();
        let now = current_timestamp();
        let ticket = Ticket::new("default".to_string(), match_id, "user1".to_string(), now);

        assert_eq!(ticket.status(), TicketStatus::InProgress);
        assert_eq!(ticket.match_id(), match_id);
        assert_eq!(ticket.queue(), "default");
        assert_eq!(ticket.player_id(), "user1");
        assert_eq!(ticket.created_at(), now);
        assert!(!ticket.is_expired());
    }
}
