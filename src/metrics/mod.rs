//! Metrics and monitoring for the ticket-booth matchmaking service
//!
//! This module provides Prometheus metrics collection plus the health,
//! readiness and metrics HTTP routes.

pub mod collector;
pub mod health;

pub use collector::{
    MatchMetrics, MetricsCollector, MetricsTimer, ReconcilerMetrics, ServiceMetrics,
    TicketMetrics,
};
pub use health::HealthServerState;
