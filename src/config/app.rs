//! Main application configuration
//!
//! This module defines the primary configuration structures for the ticket-booth
//! matchmaking service, including environment variable loading and validation.

use crate::config::matchmaking::MatchRules;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host the HTTP listener binds to
    pub http_host: String,
    /// Port for the ticket API, health and metrics endpoints
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Capacity of every new match
    pub max_players: usize,
    /// Players required to start before the staleness rule kicks in
    pub players_to_start: usize,
    /// Inactivity after which an unfilled match becomes startable solo
    pub stale_after_seconds: u64,
    /// Time the elected starter has to supply a join code
    pub start_timeout_seconds: u64,
    /// Reconciler tick period in milliseconds
    pub reconcile_interval_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "ticket-booth".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8000,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            max_players: 2,
            players_to_start: 2,
            stale_after_seconds: 5,
            start_timeout_seconds: 5,
            reconcile_interval_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            config.service.http_host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            config.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Matchmaking settings
        if let Ok(max_players) = env::var("MAX_PLAYERS") {
            config.matchmaking.max_players = max_players
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_PLAYERS value: {}", max_players))?;
        }
        if let Ok(to_start) = env::var("PLAYERS_TO_START") {
            config.matchmaking.players_to_start = to_start
                .parse()
                .map_err(|_| anyhow!("Invalid PLAYERS_TO_START value: {}", to_start))?;
        }
        if let Ok(stale) = env::var("STALE_AFTER_SECONDS") {
            config.matchmaking.stale_after_seconds = stale
                .parse()
                .map_err(|_| anyhow!("Invalid STALE_AFTER_SECONDS value: {}", stale))?;
        }
        if let Ok(timeout) = env::var("START_TIMEOUT_SECONDS") {
            config.matchmaking.start_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid START_TIMEOUT_SECONDS value: {}", timeout))?;
        }
        if let Ok(interval) = env::var("RECONCILE_INTERVAL_MS") {
            config.matchmaking.reconcile_interval_ms = interval
                .parse()
                .map_err(|_| anyhow!("Invalid RECONCILE_INTERVAL_MS value: {}", interval))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate a TOML configuration document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(raw)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get reconciler tick period as Duration
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.matchmaking.reconcile_interval_ms)
    }

    /// Address the HTTP listener binds to
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.service.http_host, self.service.http_port)
    }

    /// Match rules derived from the matchmaking settings
    pub fn match_rules(&self) -> Result<MatchRules> {
        Ok(MatchRules {
            max_players: self.matchmaking.max_players,
            players_to_start: self.matchmaking.players_to_start,
            stale_after: seconds_setting("STALE_AFTER_SECONDS", self.matchmaking.stale_after_seconds)?,
            start_timeout: seconds_setting(
                "START_TIMEOUT_SECONDS",
                self.matchmaking.start_timeout_seconds,
            )?,
        })
    }
}

/// Convert a seconds setting into a chrono duration, rejecting out-of-range values
fn seconds_setting(name: &str, seconds: u64) -> Result<chrono::Duration> {
    i64::try_from(seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| anyhow!("Invalid {}: {} is out of range", name, seconds))
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_host.is_empty() {
        return Err(anyhow!("HTTP host cannot be empty"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate matchmaking settings
    config
        .match_rules()?
        .validate()
        .map_err(|e| anyhow!("{}", e))?;
    if config.matchmaking.reconcile_interval_ms == 0 {
        return Err(anyhow!("Reconcile interval must be greater than 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.matchmaking.max_players, 2);
        assert_eq!(config.matchmaking.players_to_start, 2);
        assert_eq!(config.reconcile_interval(), Duration::from_secs(1));
        assert_eq!(config.http_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.matchmaking.players_to_start = 3;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.matchmaking.max_players = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.matchmaking.reconcile_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [service]
            http_port = 9100

            [matchmaking]
            max_players = 4
            players_to_start = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.service.http_port, 9100);
        assert_eq!(config.service.name, "ticket-booth");
        assert_eq!(config.matchmaking.max_players, 4);
        assert_eq!(config.matchmaking.players_to_start, 3);
        assert_eq!(config.matchmaking.stale_after_seconds, 5);
    }

    #[test]
    fn test_match_rules_from_settings() {
        let rules = AppConfig::default().match_rules().unwrap();
        assert_eq!(rules.stale_after, chrono::Duration::seconds(5));
        assert_eq!(rules.start_timeout, chrono::Duration::seconds(5));
    }

    #[test]
    fn test_out_of_range_durations_rejected() {
        let err = AppConfig::from_toml_str("[matchmaking]\nstale_after_seconds = 10000000000000000\n")
            .unwrap_err();
        assert!(err.to_string().contains("STALE_AFTER_SECONDS"));

        let mut config = AppConfig::default();
        config.matchmaking.start_timeout_seconds = u64::MAX;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("START_TIMEOUT_SECONDS"));
    }
}
