//! Matchmaking service: the operation surface behind the ticket API
//!
//! Combines the match pool and the ticket registry into the three caller
//! operations (create ticket, get status, set join code) and enforces the
//! authorization and sequencing rules around join codes.

use crate::config::MatchRules;
use crate::error::{MatchmakingError, Result};
use crate::matchmaking::game_match::Match;
use crate::matchmaking::pool::{Advance, MatchPool, PoolStats};
use crate::matchmaking::registry::{RegistryStats, TicketRegistry};
use crate::matchmaking::ticket::Ticket;
use crate::matchmaking::transition::{project_status, Transition};
use crate::metrics::{MetricsCollector, MetricsTimer};
use crate::types::{TicketId, TicketStatus, TicketView};
use crate::utils::Clock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Combined pool and registry counts
#[derive(Debug, Clone, Default)]
pub struct ServiceStats {
    pub pool: PoolStats,
    pub tickets: RegistryStats,
}

#[derive(Clone)]
pub struct MatchmakingService {
    pool: Arc<MatchPool>,
    registry: Arc<TicketRegistry>,
    metrics: Arc<MetricsCollector>,
}

impl MatchmakingService {
    pub fn new(
        pool: Arc<MatchPool>,
        registry: Arc<TicketRegistry>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            pool,
            registry,
            metrics,
        }
    }

    /// Build a self-contained service with fresh stores
    pub fn with_rules(rules: MatchRules, clock: Arc<dyn Clock>) -> Result<Self> {
        let metrics = MetricsCollector::new().map_err(|e| MatchmakingError::InternalError {
            message: format!("Failed to create metrics collector: {}", e),
        })?;

        Ok(Self::new(
            Arc::new(MatchPool::new(rules, clock.clone())?),
            Arc::new(TicketRegistry::new(clock)),
            Arc::new(metrics),
        ))
    }

    pub fn pool(&self) -> Arc<MatchPool> {
        self.pool.clone()
    }

    pub fn registry(&self) -> Arc<TicketRegistry> {
        self.registry.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Issue a ticket for `player_id` in `queue`, binding it to a match
    pub fn create_ticket(&self, queue: &str, player_id: &str) -> Result<TicketId> {
        let timer = self.metrics.start_timer();

        let result = self.create_ticket_inner(queue, player_id);
        self.observe("create_ticket", &result, timer);
        result
    }

    fn create_ticket_inner(&self, queue: &str, player_id: &str) -> Result<TicketId> {
        let assignment = self.pool.find_or_create_match(queue, player_id)?;
        let ticket = self
            .registry
            .create(queue, assignment.game.id(), player_id)?;

        self.metrics.record_ticket_created(queue, assignment.created);
        info!(
            "Issued ticket {} to '{}' in queue '{}' - match: {}, players: {}/{}",
            ticket.id(),
            player_id,
            queue,
            assignment.game.id(),
            assignment.game.players().len(),
            assignment.game.max_players()
        );

        Ok(ticket.id())
    }

    /// Current status of a ticket as seen by `player_id`
    pub fn get_status(&self, ticket_id: TicketId, player_id: &str) -> Result<TicketView> {
        let timer = self.metrics.start_timer();
        let result = self.get_status_inner(ticket_id, player_id);
        self.observe("get_status", &result, timer);
        result
    }

    fn get_status_inner(&self, ticket_id: TicketId, player_id: &str) -> Result<TicketView> {
        let handle = self.registry.get(ticket_id)?;
        let mut ticket = handle
            .lock()
            .map_err(|_| MatchmakingError::lock_failed("ticket"))?;

        if ticket.is_expired() {
            return Ok(TicketView::expired(ticket.id()));
        }

        let previous = ticket.status();
        match self.pool.advance_ticket(&mut ticket)? {
            Advance::MatchMissing => Err(MatchmakingError::MatchNotFound {
                match_id: ticket.match_id().to_string(),
            }),
            Advance::Resolved { transition, game } => {
                self.record_advance(&ticket, previous, transition);
                Ok(view_for(&ticket, &game, player_id))
            }
        }
    }

    /// Attach a join code to the ticket's match. Only the initiator may do
    /// this, once, and only while the match can start.
    pub fn set_join_code(
        &self,
        ticket_id: TicketId,
        player_id: &str,
        join_code: &str,
    ) -> Result<TicketView> {
        let timer = self.metrics.start_timer();
        let result = self.set_join_code_inner(ticket_id, player_id, join_code);
        self.observe("set_join_code", &result, timer);
        result
    }

    fn set_join_code_inner(
        &self,
        ticket_id: TicketId,
        player_id: &str,
        join_code: &str,
    ) -> Result<TicketView> {
        let handle = self.registry.get(ticket_id)?;
        let mut ticket = handle
            .lock()
            .map_err(|_| MatchmakingError::lock_failed("ticket"))?;

        if ticket.is_expired() {
            return Err(MatchmakingError::BadRequest {
                reason: "The ticket has expired".to_string(),
            });
        }

        let stale_after = self.pool.rules().stale_after;
        let previous = ticket.status();
        let game = self
            .pool
            .with_match(ticket.queue(), ticket.match_id(), |game, now| {
                if !game.is_initiator(player_id) {
                    return Err(MatchmakingError::Forbidden {
                        reason: "You can't update server for this match".to_string(),
                    });
                }
                if previous == TicketStatus::Found || game.has_join_code() {
                    return Err(MatchmakingError::Conflict {
                        reason: "Server for this match already set".to_string(),
                    });
                }
                if !game.can_start(now, stale_after) {
                    return Err(MatchmakingError::BadRequest {
                        reason: "This match can't start now".to_string(),
                    });
                }

                game.set_join_code(join_code.to_string(), now);
                Ok((game.clone(), now))
            })?
            .ok_or_else(|| MatchmakingError::MatchNotFound {
                match_id: ticket.match_id().to_string(),
            })?;
        let (game, now) = game?;

        ticket.set_status(TicketStatus::Found);
        self.metrics.record_transition(previous, TicketStatus::Found);
        self.metrics.record_join_code_set(
            ticket.queue(),
            (now - game.created_at()).to_std().unwrap_or_default(),
        );
        info!(
            "Join code set for match {} in queue '{}' by '{}' - players: [{}]",
            game.id(),
            ticket.queue(),
            player_id,
            game.players().join(", ")
        );

        Ok(view_for(&ticket, &game, player_id))
    }

    pub fn stats(&self) -> Result<ServiceStats> {
        let stats = ServiceStats {
            pool: self.pool.stats()?,
            tickets: self.registry.stats()?,
        };
        self.metrics.update_from_stats(&stats.pool, &stats.tickets);
        Ok(stats)
    }

    fn record_advance(&self, ticket: &Ticket, previous: TicketStatus, transition: Transition) {
        if transition == Transition::Unchanged {
            return;
        }

        self.metrics.record_transition(previous, ticket.status());
        if transition.removes_match() {
            self.metrics.record_match_timed_out(ticket.queue());
        }
    }

    fn observe<T>(&self, operation: &str, result: &Result<T>, timer: MetricsTimer) {
        self.metrics.record_operation(operation, timer.stop());

        if let Err(e) = result {
            self.metrics.record_error(operation, e.kind());
            match e {
                MatchmakingError::InternalError { .. } => {
                    warn!("{} failed: {}", operation, e)
                }
                _ => debug!("{} rejected: {}", operation, e),
            }
        }
    }
}

/// Caller-facing view of a ticket bound to a live match
fn view_for(ticket: &Ticket, game: &Match, viewer: &str) -> TicketView {
    TicketView {
        id: ticket.id(),
        status: project_status(ticket.status(), viewer, game),
        match_id: Some(ticket.match_id()),
        players: game.players().to_vec(),
        join_code: game.join_code().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::utils::{generate_ticket_id, ManualClock};

    fn create_test_service() -> (MatchmakingService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let service = MatchmakingService::with_rules(MatchRules::default(), clock.clone()).unwrap();
        (service, clock)
    }

    #[test]
    fn test_solo_ticket_lifecycle() {
        let (service, clock) = create_test_service();
        let ticket = service.create_ticket("default", "user1").unwrap();

        let view = service.get_status(ticket, "user1").unwrap();
        assert_eq!(view.status, TicketStatus::InProgress);
        assert_eq!(view.players, vec!["user1".to_string()]);

        clock.advance_secs(3);
        let view = service.get_status(ticket, "user1").unwrap();
        assert_eq!(view.status, TicketStatus::InProgress);

        clock.advance_secs(2);
        let view = service.get_status(ticket, "user1").unwrap();
        assert_eq!(view.status, TicketStatus::StartServer);

        clock.advance_secs(5);
        let view = service.get_status(ticket, "user1").unwrap();
        assert_eq!(view.status, TicketStatus::Timeout);

        let view = service.get_status(ticket, "user1").unwrap();
        assert_eq!(view, TicketView::expired(ticket));
    }

    #[test]
    fn test_pair_found() {
        let (service, _clock) = create_test_service();
        let first = service.create_ticket("default", "user1").unwrap();
        let second = service.create_ticket("default", "user2").unwrap();
        assert_ne!(first, second);

        let first_view = service.get_status(first, "user1").unwrap();
        let second_view = service.get_status(second, "user2").unwrap();
        assert_eq!(first_view.match_id, second_view.match_id);
        assert_eq!(first_view.status, TicketStatus::StartServer);
        assert_eq!(second_view.status, TicketStatus::InProgress);

        let err = service.set_join_code(second, "user2", "join").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let view = service.set_join_code(first, "user1", "join").unwrap();
        assert_eq!(view.status, TicketStatus::Found);
        assert_eq!(view.join_code.as_deref(), Some("join"));

        let second_view = service.get_status(second, "user2").unwrap();
        assert_eq!(second_view.status, TicketStatus::Found);
        assert_eq!(second_view.join_code.as_deref(), Some("join"));
    }

    #[test]
    fn test_join_code_twice_conflicts() {
        let (service, _clock) = create_test_service();
        let first = service.create_ticket("default", "user1").unwrap();
        service.create_ticket("default", "user2").unwrap();

        service.set_join_code(first, "user1", "join").unwrap();
        let err = service.set_join_code(first, "user1", "again").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_join_code_before_ready_rejected() {
        let (service, _clock) = create_test_service();
        let ticket = service.create_ticket("default", "user1").unwrap();

        let err = service.set_join_code(ticket, "user1", "join").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_join_code_on_expired_ticket_rejected() {
        let (service, clock) = create_test_service();
        let ticket = service.create_ticket("default", "user1").unwrap();

        clock.advance_secs(5);
        service.get_status(ticket, "user1").unwrap();
        clock.advance_secs(5);
        service.get_status(ticket, "user1").unwrap();

        let err = service.set_join_code(ticket, "user1", "join").unwrap_err();
        assert!(matches!(err, MatchmakingError::BadRequest { .. }));
    }

    #[test]
    fn test_unknown_ticket() {
        let (service, _clock) = create_test_service();

        let err = service.get_status(generate_ticket_id(), "user1").unwrap_err();
        assert!(matches!(err, MatchmakingError::TicketNotFound { .. }));

        let err = service
            .set_join_code(generate_ticket_id(), "user1", "join")
            .unwrap_err();
        assert!(matches!(err, MatchmakingError::TicketNotFound { .. }));
    }

    #[test]
    fn test_vanished_match_is_not_found_until_reconciled() {
        let (service, _clock) = create_test_service();
        let ticket = service.create_ticket("default", "user1").unwrap();
        let match_id = service.get_status(ticket, "user1").unwrap().match_id.unwrap();

        service.pool().remove("default", match_id).unwrap();

        let err = service.get_status(ticket, "user1").unwrap_err();
        assert!(matches!(err, MatchmakingError::MatchNotFound { .. }));
        let err = service.set_join_code(ticket, "user1", "join").unwrap_err();
        assert!(matches!(err, MatchmakingError::MatchNotFound { .. }));
    }

    #[test]
    fn test_stats_and_metrics() {
        let (service, _clock) = create_test_service();
        let first = service.create_ticket("default", "user1").unwrap();
        service.create_ticket("default", "user2").unwrap();
        service.set_join_code(first, "user1", "join").unwrap();
        let _ = service.set_join_code(first, "user1", "join");

        let stats = service.stats().unwrap();
        assert_eq!(stats.tickets.found, 1);
        assert_eq!(stats.tickets.in_progress, 1);
        assert_eq!(stats.pool.started_matches, 1);

        let metrics = service.metrics();
        assert_eq!(
            metrics
                .service()
                .request_errors_total
                .with_label_values(&["set_join_code", "conflict"])
                .get(),
            1
        );
    }
}
