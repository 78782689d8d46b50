//! Match rules shared by the pool, the state machine and the reconciler

use crate::error::{MatchmakingError, Result};
use chrono::Duration;

/// Capacity and timing rules applied to every match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRules {
    /// Capacity ceiling of a new match
    pub max_players: usize,
    /// Initial start threshold of a new match
    pub players_to_start: usize,
    /// Inactivity after which an unfilled match lowers its threshold to 1
    pub stale_after: Duration,
    /// Grace window for the initiator to supply a join code
    pub start_timeout: Duration,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            max_players: 2,
            players_to_start: 2,
            stale_after: Duration::seconds(5),
            start_timeout: Duration::seconds(5),
        }
    }
}

impl MatchRules {
    pub fn validate(&self) -> Result<()> {
        if self.max_players == 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "Max players must be at least 1".to_string(),
            });
        }
        if self.players_to_start == 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "Players to start must be at least 1".to_string(),
            });
        }
        if self.players_to_start > self.max_players {
            return Err(MatchmakingError::ConfigurationError {
                message: format!(
                    "Players to start ({}) cannot exceed max players ({})",
                    self.players_to_start, self.max_players
                ),
            });
        }
        if self.stale_after < Duration::zero() || self.start_timeout < Duration::zero() {
            return Err(MatchmakingError::ConfigurationError {
                message: "Match timeouts cannot be negative".to_string(),
            });
        }
        Ok(())
    }
}
