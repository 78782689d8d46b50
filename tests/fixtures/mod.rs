//! Test fixtures shared by the integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use ticket_booth::config::MatchRules;
use ticket_booth::matchmaking::{MatchmakingService, Reconciler};
use ticket_booth::types::{TicketId, TicketStatus, TicketView};
use ticket_booth::utils::ManualClock;

/// A complete matchmaking core on a manually driven clock
pub struct TestSystem {
    pub service: MatchmakingService,
    pub reconciler: Reconciler,
    pub clock: Arc<ManualClock>,
}

impl TestSystem {
    /// Poll a ticket, panicking on error
    pub fn poll(&self, ticket: TicketId, user: &str) -> TicketView {
        self.service
            .get_status(ticket, user)
            .unwrap_or_else(|e| panic!("poll of {} by '{}' failed: {}", ticket, user, e))
    }

    pub fn status(&self, ticket: TicketId, user: &str) -> TicketStatus {
        self.poll(ticket, user).status
    }

    pub fn ticket(&self, queue: &str, user: &str) -> TicketId {
        self.service.create_ticket(queue, user).unwrap()
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance_secs(secs);
    }

    pub fn reconcile(&self) {
        self.reconciler.run_once().unwrap();
    }
}

/// Test system with default rules (2 players, 5s staleness, 5s start timeout)
pub fn create_test_system() -> TestSystem {
    create_test_system_with(MatchRules::default())
}

pub fn create_test_system_with(rules: MatchRules) -> TestSystem {
    let clock = Arc::new(ManualClock::new());
    let service = MatchmakingService::with_rules(rules, clock.clone()).unwrap();
    let reconciler = Reconciler::new(
        service.pool(),
        service.registry(),
        service.metrics(),
        Duration::from_millis(10),
    );

    TestSystem {
        service,
        reconciler,
        clock,
    }
}

/// Rules for larger matches
pub fn rules_for(max_players: usize, players_to_start: usize) -> MatchRules {
    MatchRules {
        max_players,
        players_to_start,
        ..MatchRules::default()
    }
}
