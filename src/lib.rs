//! Ticket Booth - ticket-based matchmaking microservice
//!
//! Players request a ticket for a named queue and poll it. Tickets are grouped
//! into matches; the first player of each match is elected to start a game
//! server and publish its join code, which the other players then discover.
//! Abandoned matches time out.

pub mod api;
pub mod config;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use config::MatchRules;
pub use matchmaking::{MatchPool, MatchmakingService, Reconciler, TicketRegistry};
pub use utils::{Clock, ManualClock, SystemClock};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
