//! Match entity and its readiness rules
//!
//! A match is a pool of players converging on one game session. It is joinable
//! while it has room and no join code, and startable once enough players are
//! present. Time only matters through `last_update`, compared lazily against
//! the `now` handed in by the caller.

use crate::config::MatchRules;
use crate::types::{MatchId, PlayerId};
use crate::utils::generate_match_id;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A match being assembled in one queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    id: MatchId,
    join_code: Option<String>,
    initiator_id: PlayerId,
    players: Vec<PlayerId>,
    max_players: usize,
    players_to_start: usize,
    created_at: DateTime<Utc>,
    last_update: DateTime<Utc>,
}

impl Match {
    /// Create a match whose first player is its initiator
    pub fn new(initiator_id: PlayerId, rules: &MatchRules, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_match_id(),
            join_code: None,
            players: vec![initiator_id.clone()],
            initiator_id,
            max_players: rules.max_players.max(1),
            players_to_start: rules.players_to_start.clamp(1, rules.max_players.max(1)),
            created_at: now,
            last_update: now,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn join_code(&self) -> Option<&str> {
        self.join_code.as_deref()
    }

    pub fn initiator_id(&self) -> &str {
        &self.initiator_id
    }

    pub fn is_initiator(&self, player_id: &str) -> bool {
        self.initiator_id == player_id
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn players_to_start(&self) -> usize {
        self.players_to_start
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn has_join_code(&self) -> bool {
        self.join_code.is_some()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p == player_id)
    }

    pub fn elapsed_since_update(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_update
    }

    /// Stamp the match as touched
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_update = now;
    }

    /// Staleness rule: an unfilled match idle for `stale_after` becomes
    /// startable by whoever is present. One-shot and idempotent.
    pub fn refresh_readiness(&mut self, now: DateTime<Utc>, stale_after: Duration) {
        if !self.is_full() && self.elapsed_since_update(now) >= stale_after {
            self.players_to_start = 1;
        }
    }

    pub fn can_join(&mut self, player_id: &str, now: DateTime<Utc>, stale_after: Duration) -> bool {
        self.refresh_readiness(now, stale_after);

        !self.contains(player_id) && !self.is_full() && !self.has_join_code()
    }

    pub fn can_start(&mut self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        self.refresh_readiness(now, stale_after);

        self.players.len() >= self.players_to_start && !self.has_join_code()
    }

    /// Append a player; callers check `can_join` under the same lock first
    pub fn add_player(&mut self, player_id: PlayerId, now: DateTime<Utc>) {
        debug_assert!(!self.contains(&player_id) && !self.is_full() && !self.has_join_code());
        self.players.push(player_id);
        self.touch(now);
    }

    /// Finalize the match; the player list is frozen from here on
    pub fn set_join_code(&mut self, code: String, now: DateTime<Utc>) {
        self.join_code = Some(code);
        self.touch(now);
    }
}
