//! Ticket state machine
//!
//! `update_ticket` is the only place a ticket moves between statuses based on
//! its match. Rules are checked in precedence order and the first one whose
//! guard holds wins:
//!
//! 1. `InProgress -> StartServer` when the match can start. The match clock is
//!    restamped so the elected starter gets a full window.
//! 2. `StartServer -> Timeout` when no join code arrived within the start
//!    timeout. The caller must drop the match from its queue.
//! 3. `* -> Found` once the match has a join code.
//!
//! Nothing here reads the wall clock. Deadlines are evaluated against the
//! `now` passed in, on every poll or reconciler tick, and never by timers.

use crate::config::MatchRules;
use crate::matchmaking::game_match::Match;
use crate::matchmaking::ticket::Ticket;
use crate::types::TicketStatus;
use chrono::{DateTime, Utc};

/// Outcome of evaluating one ticket against its match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    StartServer,
    /// The match was abandoned and must be removed from the pool
    TimedOut,
    Found,
}

impl Transition {
    pub fn removes_match(&self) -> bool {
        matches!(self, Transition::TimedOut)
    }
}

pub fn update_ticket(
    ticket: &mut Ticket,
    game: &mut Match,
    rules: &MatchRules,
    now: DateTime<Utc>,
) -> Transition {
    if ticket.status() == TicketStatus::Timeout {
        return Transition::Unchanged;
    }

    if ticket.status() == TicketStatus::InProgress && game.can_start(now, rules.stale_after) {
        game.touch(now);
        ticket.set_status(TicketStatus::StartServer);
        return Transition::StartServer;
    }

    if ticket.status() == TicketStatus::StartServer
        && !game.has_join_code()
        && game.elapsed_since_update(now) >= rules.start_timeout
    {
        ticket.set_status(TicketStatus::Timeout);
        return Transition::TimedOut;
    }

    if ticket.status() != TicketStatus::Found && game.has_join_code() {
        ticket.set_status(TicketStatus::Found);
        return Transition::Found;
    }

    Transition::Unchanged
}

/// Status as shown to `viewer`: only the initiator is told to start a server
pub fn project_status(status: TicketStatus, viewer: &str, game: &Match) -> TicketStatus {
    if status == TicketStatus::StartServer && !game.is_initiator(viewer) {
        TicketStatus::InProgress
    } else {
        status
    }
}
