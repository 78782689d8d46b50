//! Configuration management for the ticket-booth service
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values for the matchmaking service.

pub mod app;
pub mod matchmaking;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, MatchmakingSettings, ServiceSettings};
pub use matchmaking::MatchRules;
