//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the ticket-booth matchmaking
//! service using Prometheus metrics.

use crate::error::ErrorKind;
use crate::matchmaking::pool::PoolStats;
use crate::matchmaking::reconciler::ReconcileReport;
use crate::matchmaking::registry::RegistryStats;
use crate::types::TicketStatus;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Ticket-related metrics
    ticket_metrics: TicketMetrics,

    /// Match-related metrics
    match_metrics: MatchMetrics,

    /// Reconciler metrics
    reconciler_metrics: ReconcilerMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Failed operations by operation and error kind
    pub request_errors_total: IntCounterVec,

    /// Operation latency by operation
    pub operation_duration: HistogramVec,
}

/// Ticket-related metrics
#[derive(Clone)]
pub struct TicketMetrics {
    /// Tickets issued per queue
    pub tickets_created_total: IntCounterVec,

    /// Status transitions applied to tickets
    pub ticket_transitions_total: IntCounterVec,

    /// Tickets currently held, by status
    pub tickets_by_status: IntGaugeVec,
}

/// Match-related metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Matches opened per queue
    pub matches_created_total: IntCounterVec,

    /// Players placed into an existing match per queue
    pub players_joined_total: IntCounterVec,

    /// Matches that received a join code per queue
    pub join_codes_set_total: IntCounterVec,

    /// Matches dropped because no join code arrived
    pub matches_timed_out_total: IntCounterVec,

    /// Open matches across all queues
    pub open_matches: IntGauge,

    /// Players waiting in open matches
    pub waiting_players: IntGauge,

    /// Time from match creation to join code
    pub time_to_join_code_seconds: Histogram,
}

/// Reconciler metrics
#[derive(Clone)]
pub struct ReconcilerMetrics {
    /// Completed reconciliation passes
    pub passes_total: IntCounter,

    /// Duration of one pass
    pub pass_duration: Histogram,

    /// Tickets forced to Timeout because their match vanished
    pub orphaned_tickets_total: IntCounter,

    /// Per-ticket failures during a pass
    pub errors_total: IntCounter,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let ticket_metrics = TicketMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;
        let reconciler_metrics = ReconcilerMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            ticket_metrics,
            match_metrics,
            reconciler_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn ticket(&self) -> &TicketMetrics {
        &self.ticket_metrics
    }

    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    pub fn reconciler(&self) -> &ReconcilerMetrics {
        &self.reconciler_metrics
    }

    /// Record a ticket being issued and where it landed
    pub fn record_ticket_created(&self, queue: &str, created_match: bool) {
        self.ticket_metrics
            .tickets_created_total
            .with_label_values(&[queue])
            .inc();

        if created_match {
            self.match_metrics
                .matches_created_total
                .with_label_values(&[queue])
                .inc();
        } else {
            self.match_metrics
                .players_joined_total
                .with_label_values(&[queue])
                .inc();
        }
    }

    /// Record a ticket status change
    pub fn record_transition(&self, from: TicketStatus, to: TicketStatus) {
        self.ticket_metrics
            .ticket_transitions_total
            .with_label_values(&[from.as_str(), to.as_str()])
            .inc();
    }

    /// Record a match being finalized with a join code
    pub fn record_join_code_set(&self, queue: &str, match_age: Duration) {
        self.match_metrics
            .join_codes_set_total
            .with_label_values(&[queue])
            .inc();
        self.match_metrics
            .time_to_join_code_seconds
            .observe(match_age.as_secs_f64());
    }

    /// Record a match being abandoned
    pub fn record_match_timed_out(&self, queue: &str) {
        self.match_metrics
            .matches_timed_out_total
            .with_label_values(&[queue])
            .inc();
    }

    /// Record a failed operation
    pub fn record_error(&self, operation: &str, kind: ErrorKind) {
        self.service_metrics
            .request_errors_total
            .with_label_values(&[operation, kind.as_str()])
            .inc();
    }

    /// Record operation duration
    pub fn record_operation(&self, operation: &str, duration: Duration) {
        self.service_metrics
            .operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Record one reconciliation pass
    pub fn record_reconcile_pass(&self, report: &ReconcileReport, duration: Duration) {
        self.reconciler_metrics.passes_total.inc();
        self.reconciler_metrics
            .pass_duration
            .observe(duration.as_secs_f64());
        self.reconciler_metrics
            .orphaned_tickets_total
            .inc_by(report.orphaned as u64);
        self.reconciler_metrics
            .errors_total
            .inc_by(report.errors as u64);
    }

    /// Update gauges from pool and registry snapshots
    pub fn update_from_stats(&self, pool: &PoolStats, tickets: &RegistryStats) {
        self.match_metrics.open_matches.set(pool.open_matches as i64);
        self.match_metrics
            .waiting_players
            .set(pool.waiting_players as i64);

        let by_status = &self.ticket_metrics.tickets_by_status;
        by_status
            .with_label_values(&[TicketStatus::InProgress.as_str()])
            .set(tickets.in_progress as i64);
        by_status
            .with_label_values(&[TicketStatus::StartServer.as_str()])
            .set(tickets.start_server as i64);
        by_status
            .with_label_values(&[TicketStatus::Found.as_str()])
            .set(tickets.found as i64);
        by_status
            .with_label_values(&[TicketStatus::Timeout.as_str()])
            .set(tickets.timeout as i64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update uptime
    pub fn update_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("ticket_booth_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "ticket_booth_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let request_errors_total = IntCounterVec::new(
            Opts::new(
                "ticket_booth_request_errors_total",
                "Failed matchmaking operations",
            ),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(request_errors_total.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "ticket_booth_operation_duration_seconds",
                "Matchmaking operation duration",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            request_errors_total,
            operation_duration,
        })
    }
}

impl TicketMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let tickets_created_total = IntCounterVec::new(
            Opts::new("ticket_booth_tickets_created_total", "Total tickets issued"),
            &["queue"],
        )?;
        registry.register(Box::new(tickets_created_total.clone()))?;

        let ticket_transitions_total = IntCounterVec::new(
            Opts::new(
                "ticket_booth_ticket_transitions_total",
                "Ticket status transitions",
            ),
            &["from", "to"],
        )?;
        registry.register(Box::new(ticket_transitions_total.clone()))?;

        let tickets_by_status = IntGaugeVec::new(
            Opts::new("ticket_booth_tickets", "Tickets held by status"),
            &["status"],
        )?;
        registry.register(Box::new(tickets_by_status.clone()))?;

        Ok(Self {
            tickets_created_total,
            ticket_transitions_total,
            tickets_by_status,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_created_total = IntCounterVec::new(
            Opts::new("ticket_booth_matches_created_total", "Total matches opened"),
            &["queue"],
        )?;
        registry.register(Box::new(matches_created_total.clone()))?;

        let players_joined_total = IntCounterVec::new(
            Opts::new(
                "ticket_booth_players_joined_total",
                "Players placed into an existing match",
            ),
            &["queue"],
        )?;
        registry.register(Box::new(players_joined_total.clone()))?;

        let join_codes_set_total = IntCounterVec::new(
            Opts::new(
                "ticket_booth_join_codes_set_total",
                "Matches finalized with a join code",
            ),
            &["queue"],
        )?;
        registry.register(Box::new(join_codes_set_total.clone()))?;

        let matches_timed_out_total = IntCounterVec::new(
            Opts::new(
                "ticket_booth_matches_timed_out_total",
                "Matches abandoned without a join code",
            ),
            &["queue"],
        )?;
        registry.register(Box::new(matches_timed_out_total.clone()))?;

        let open_matches = IntGauge::new("ticket_booth_open_matches", "Open matches")?;
        registry.register(Box::new(open_matches.clone()))?;

        let waiting_players = IntGauge::new(
            "ticket_booth_waiting_players",
            "Players waiting in open matches",
        )?;
        registry.register(Box::new(waiting_players.clone()))?;

        let time_to_join_code_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "ticket_booth_time_to_join_code_seconds",
                "Time from match creation to join code",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0]),
        )?;
        registry.register(Box::new(time_to_join_code_seconds.clone()))?;

        Ok(Self {
            matches_created_total,
            players_joined_total,
            join_codes_set_total,
            matches_timed_out_total,
            open_matches,
            waiting_players,
            time_to_join_code_seconds,
        })
    }
}

impl ReconcilerMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let passes_total = IntCounter::new(
            "ticket_booth_reconcile_passes_total",
            "Completed reconciliation passes",
        )?;
        registry.register(Box::new(passes_total.clone()))?;

        let pass_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ticket_booth_reconcile_pass_duration_seconds",
                "Duration of one reconciliation pass",
            )
            .buckets(vec![0.0001, 0.001, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(pass_duration.clone()))?;

        let orphaned_tickets_total = IntCounter::new(
            "ticket_booth_orphaned_tickets_total",
            "Tickets forced to Timeout because their match vanished",
        )?;
        registry.register(Box::new(orphaned_tickets_total.clone()))?;

        let errors_total = IntCounter::new(
            "ticket_booth_reconcile_errors_total",
            "Per-ticket failures during reconciliation",
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        Ok(Self {
            passes_total,
            pass_duration,
            orphaned_tickets_total,
            errors_total,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
