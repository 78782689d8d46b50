//! Health check logic and monitoring
//!
//! This module provides health check functionality for the ticket-booth
//! matchmaking service, including readiness and liveness probes.

use crate::matchmaking::registry::RegistryStats;
use crate::matchmaking::MatchmakingService;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Gauge value (0=unhealthy, 1=degraded, 2=healthy)
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    fn worst(self, other: HealthStatus) -> HealthStatus {
        if self.as_gauge() <= other.as_gauge() {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Cheap handle onto the running service for health reporting
#[derive(Clone)]
pub struct HealthProbe {
    name: String,
    service: MatchmakingService,
    is_running: Arc<AtomicBool>,
    started_at: Instant,
}

impl HealthProbe {
    pub fn new(name: impl Into<String>, service: MatchmakingService) -> Self {
        Self {
            name: name.into(),
            service,
            is_running: Arc::new(AtomicBool::new(false)),
            started_at: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &MatchmakingService {
        &self.service
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.is_running.store(running, Ordering::SeqCst);
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    pub stats: HealthStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Optional error message if not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthStats {
    pub queues: usize,
    pub open_matches: usize,
    pub started_matches: usize,
    pub waiting_players: usize,
    pub tickets: RegistryStats,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(probe: &HealthProbe) -> Self {
        let service_check = Self::check_service_running(probe);
        let matchmaking_check = Self::check_matchmaking(probe);

        let status = service_check.status.worst(matchmaking_check.status);
        let stats = Self::gather_service_stats(probe);
        probe
            .service()
            .metrics()
            .update_health_status(status.as_gauge());

        HealthCheck {
            status,
            service: probe.name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks: vec![service_check, matchmaking_check],
            stats,
        }
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(probe: &HealthProbe) -> HealthStatus {
        if probe.is_running() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Readiness check - verify service can handle requests
    pub async fn readiness_check(probe: &HealthProbe) -> HealthStatus {
        if !probe.is_running() {
            return HealthStatus::Unhealthy;
        }

        Self::check_matchmaking(probe).status
    }

    fn check_service_running(probe: &HealthProbe) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if probe.is_running() {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Pool and registry must both be readable
    fn check_matchmaking(probe: &HealthProbe) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = match probe.service().stats() {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Matchmaking stats check failed: {}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("Stats check failed: {}", e)),
                )
            }
        };

        ComponentCheck {
            name: "matchmaking".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn gather_service_stats(probe: &HealthProbe) -> HealthStats {
        let uptime_seconds = probe.uptime().as_secs();
        probe.service().metrics().update_uptime(probe.uptime());

        match probe.service().stats() {
            Ok(stats) => HealthStats {
                queues: stats.pool.queues,
                open_matches: stats.pool.open_matches,
                started_matches: stats.pool.started_matches,
                waiting_players: stats.pool.waiting_players,
                tickets: stats.tickets,
                uptime_seconds,
            },
            Err(_) => HealthStats {
                uptime_seconds,
                ..HealthStats::default()
            },
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
