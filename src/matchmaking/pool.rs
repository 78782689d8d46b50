//! Match pool: owns every match, grouped by queue
//!
//! Each queue has its own bucket behind a mutex. Every read-modify-write of a
//! match (joins, staleness lowering, start stamps, timeouts, join codes)
//! happens while holding that bucket's lock, which is what keeps two racing
//! joiners from both taking the last slot. The outer map lock is only held
//! long enough to find or insert a bucket.
//!
//! Lock order is ticket first, then bucket. The pool never takes a ticket lock.

use crate::config::MatchRules;
use crate::error::{MatchmakingError, Result};
use crate::matchmaking::game_match::Match;
use crate::matchmaking::ticket::Ticket;
use crate::matchmaking::transition::{update_ticket, Transition};
use crate::types::{MatchId, QueueName};
use crate::utils::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// Matches of one queue keyed by id
pub type QueueBucket = HashMap<MatchId, Match>;

/// Result of `find_or_create_match`
#[derive(Debug, Clone)]
pub struct MatchAssignment {
    /// Snapshot of the match right after the player was placed
    pub game: Match,
    /// Whether a new match had to be created
    pub created: bool,
}

/// Result of evaluating a ticket against the pool
#[derive(Debug, Clone)]
pub enum Advance {
    /// The match was found and the state machine ran; `game` is a snapshot
    /// taken after the transition (and before removal, if it timed out)
    Resolved { transition: Transition, game: Match },
    /// The ticket's queue or match no longer exists
    MatchMissing,
}

/// Point-in-time counts across all queues
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub queues: usize,
    /// Matches without a join code
    pub open_matches: usize,
    /// Matches with a join code
    pub started_matches: usize,
    /// Players sitting in open matches
    pub waiting_players: usize,
}

pub struct MatchPool {
    buckets: RwLock<HashMap<QueueName, Arc<Mutex<QueueBucket>>>>,
    rules: MatchRules,
    clock: Arc<dyn Clock>,
}

impl MatchPool {
    /// Create an empty pool applying `rules` to every match
    pub fn new(rules: MatchRules, clock: Arc<dyn Clock>) -> Result<Self> {
        rules.validate()?;

        Ok(Self {
            buckets: RwLock::new(HashMap::new()),
            rules,
            clock,
        })
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn bucket(&self, queue: &str) -> Result<Option<Arc<Mutex<QueueBucket>>>> {
        let buckets = self
            .buckets
            .read()
            .map_err(|_| MatchmakingError::lock_failed("match pool"))?;

        Ok(buckets.get(queue).cloned())
    }

    fn bucket_or_insert(&self, queue: &str) -> Result<Arc<Mutex<QueueBucket>>> {
        if let Some(bucket) = self.bucket(queue)? {
            return Ok(bucket);
        }

        let mut buckets = self
            .buckets
            .write()
            .map_err(|_| MatchmakingError::lock_failed("match pool"))?;

        Ok(buckets
            .entry(queue.to_string())
            .or_insert_with(|| {
                debug!("Creating bucket for queue '{}'", queue);
                Arc::new(Mutex::new(QueueBucket::new()))
            })
            .clone())
    }

    /// Place `player_id` into the first joinable match of `queue`, or open a
    /// new match with the player as initiator. Atomic per queue.
    pub fn find_or_create_match(&self, queue: &str, player_id: &str) -> Result<MatchAssignment> {
        let bucket = self.bucket_or_insert(queue)?;
        let mut bucket = bucket
            .lock()
            .map_err(|_| MatchmakingError::lock_failed("queue bucket"))?;
        let now = self.clock.now();
        let stale_after = self.rules.stale_after;

        for game in bucket.values_mut() {
            if !game.can_join(player_id, now, stale_after) {
                continue;
            }
            game.add_player(player_id.to_string(), now);

            debug!(
                "Player '{}' joined match {} in queue '{}' - players: {}/{}",
                player_id,
                game.id(),
                queue,
                game.players().len(),
                game.max_players()
            );

            return Ok(MatchAssignment {
                game: game.clone(),
                created: false,
            });
        }

        let game = Match::new(player_id.to_string(), &self.rules, now);
        info!(
            "Created match {} in queue '{}' for initiator '{}' - capacity: {}, to start: {}",
            game.id(),
            queue,
            player_id,
            game.max_players(),
            game.players_to_start()
        );
        bucket.insert(game.id(), game.clone());

        Ok(MatchAssignment {
            game,
            created: true,
        })
    }

    /// Snapshot of a match, if it still exists
    pub fn get(&self, queue: &str, match_id: MatchId) -> Result<Option<Match>> {
        self.with_match(queue, match_id, |game, _| game.clone())
    }

    /// Run a read-modify-write on one match under its bucket lock. Returns
    /// `None` when the queue or the match is gone.
    pub fn with_match<R>(
        &self,
        queue: &str,
        match_id: MatchId,
        f: impl FnOnce(&mut Match, DateTime<Utc>) -> R,
    ) -> Result<Option<R>> {
        let Some(bucket) = self.bucket(queue)? else {
            return Ok(None);
        };
        let mut bucket = bucket
            .lock()
            .map_err(|_| MatchmakingError::lock_failed("queue bucket"))?;
        let now = self.clock.now();

        Ok(bucket.get_mut(&match_id).map(|game| f(game, now)))
    }

    /// Evaluate `ticket` against its match and apply the resulting transition.
    /// A timed-out match is removed inside the same critical section.
    pub fn advance_ticket(&self, ticket: &mut Ticket) -> Result<Advance> {
        let Some(bucket) = self.bucket(ticket.queue())? else {
            return Ok(Advance::MatchMissing);
        };
        let mut bucket = bucket
            .lock()
            .map_err(|_| MatchmakingError::lock_failed("queue bucket"))?;
        let now = self.clock.now();
        let match_id = ticket.match_id();

        let Some(game) = bucket.get_mut(&match_id) else {
            return Ok(Advance::MatchMissing);
        };

        let previous = ticket.status();
        let transition = update_ticket(ticket, game, &self.rules, now);
        let snapshot = game.clone();

        if transition != Transition::Unchanged {
            debug!(
                "Ticket {} for '{}' moved {} -> {} (match {})",
                ticket.id(),
                ticket.player_id(),
                previous,
                ticket.status(),
                match_id
            );
        }

        if transition.removes_match() {
            bucket.remove(&match_id);
            info!(
                "Match {} in queue '{}' timed out waiting for a join code from '{}' (ticket {} for '{}')",
                match_id,
                ticket.queue(),
                snapshot.initiator_id(),
                ticket.id(),
                ticket.player_id()
            );
        }

        Ok(Advance::Resolved {
            transition,
            game: snapshot,
        })
    }

    /// Delete a match from its queue
    pub fn remove(&self, queue: &str, match_id: MatchId) -> Result<Option<Match>> {
        let Some(bucket) = self.bucket(queue)? else {
            return Ok(None);
        };
        let mut bucket = bucket
            .lock()
            .map_err(|_| MatchmakingError::lock_failed("queue bucket"))?;

        Ok(bucket.remove(&match_id))
    }

    /// Snapshots of every match currently in `queue`
    pub fn matches_in_queue(&self, queue: &str) -> Result<Vec<Match>> {
        let Some(bucket) = self.bucket(queue)? else {
            return Ok(Vec::new());
        };
        let bucket = bucket
            .lock()
            .map_err(|_| MatchmakingError::lock_failed("queue bucket"))?;

        Ok(bucket.values().cloned().collect())
    }

    pub fn stats(&self) -> Result<PoolStats> {
        let buckets: Vec<Arc<Mutex<QueueBucket>>> = {
            let buckets = self
                .buckets
                .read()
                .map_err(|_| MatchmakingError::lock_failed("match pool"))?;
            buckets.values().cloned().collect()
        };

        let mut stats = PoolStats {
            queues: buckets.len(),
            ..PoolStats::default()
        };

        for bucket in buckets {
            let bucket = bucket
                .lock()
                .map_err(|_| MatchmakingError::lock_failed("queue bucket"))?;
            for game in bucket.values() {
                if game.has_join_code() {
                    stats.started_matches += 1;
                } else {
                    stats.open_matches += 1;
                    stats.waiting_players += game.players().len();
                }
            }
        }

        Ok(stats)
    }
}
