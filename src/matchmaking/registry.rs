//! Ticket registry: owns every ticket for the lifetime of the process
//!
//! Tickets are never deleted so that late polls still resolve. Each ticket
//! sits behind its own mutex; tickets never need to be locked together.

use crate::error::{MatchmakingError, Result};
use crate::matchmaking::ticket::Ticket;
use crate::types::{MatchId, TicketId, TicketStatus};
use crate::utils::Clock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Shared handle to one ticket
pub type TicketHandle = Arc<Mutex<Ticket>>;

/// Ticket counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub in_progress: usize,
    pub start_server: usize,
    pub found: usize,
    pub timeout: usize,
}

impl RegistryStats {
    pub fn total(&self) -> usize {
        self.in_progress + self.start_server + self.found + self.timeout
    }

    fn record(&mut self, status: TicketStatus) {
        match status {
            TicketStatus::InProgress => self.in_progress += 1,
            TicketStatus::StartServer => self.start_server += 1,
            TicketStatus::Found => self.found += 1,
            TicketStatus::Timeout => self.timeout += 1,
        }
    }
}

pub struct TicketRegistry {
    tickets: RwLock<HashMap<TicketId, TicketHandle>>,
    clock: Arc<dyn Clock>,
}

impl TicketRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tickets: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Register a new `InProgress` ticket bound to `match_id`
    pub fn create(&self, queue: &str, match_id: MatchId, player_id: &str) -> Result<Ticket> {
        let ticket = Ticket::new(
            queue.to_string(),
            match_id,
            player_id.to_string(),
            self.clock.now(),
        );

        let mut tickets = self
            .tickets
            .write()
            .map_err(|_| MatchmakingError::lock_failed("ticket registry"))?;
        tickets.insert(ticket.id(), Arc::new(Mutex::new(ticket.clone())));

        Ok(ticket)
    }

    pub fn get(&self, id: TicketId) -> Result<TicketHandle> {
        let tickets = self
            .tickets
            .read()
            .map_err(|_| MatchmakingError::lock_failed("ticket registry"))?;

        tickets
            .get(&id)
            .cloned()
            .ok_or_else(|| MatchmakingError::TicketNotFound {
                ticket_id: id.to_string(),
            })
    }

    /// Handles to every ticket; the registry lock is released on return
    pub fn snapshot(&self) -> Result<Vec<TicketHandle>> {
        let tickets = self
            .tickets
            .read()
            .map_err(|_| MatchmakingError::lock_failed("ticket registry"))?;

        Ok(tickets.values().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        let tickets = self
            .tickets
            .read()
            .map_err(|_| MatchmakingError::lock_failed("ticket registry"))?;

        Ok(tickets.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn stats(&self) -> Result<RegistryStats> {
        let mut stats = RegistryStats::default();
        for handle in self.snapshot()? {
            let ticket = handle
                .lock()
                .map_err(|_| MatchmakingError::lock_failed("ticket"))?;
            stats.record(ticket.status());
        }
        Ok(stats)
    }
}
