//! Ticket-based matchmaking
//!
//! Players request a ticket for a queue and are placed into a match. The
//! match elects its first player as initiator, who must start a game server
//! and report a join code once enough players are present or the match has
//! waited long enough. Everyone else discovers the join code by polling.

pub mod game_match;
pub mod pool;
pub mod reconciler;
pub mod registry;
pub mod service;
pub mod ticket;
pub mod transition;

// Re-export commonly used types
pub use game_match::Match;
pub use pool::{Advance, MatchAssignment, MatchPool, PoolStats};
pub use reconciler::{ReconcileReport, Reconciler};
pub use registry::{RegistryStats, TicketHandle, TicketRegistry};
pub use service::{MatchmakingService, ServiceStats};
pub use ticket::Ticket;
pub use transition::{project_status, update_ticket, Transition};
