//! Periodic ticket reconciliation
//!
//! Advances every ticket on a fixed cadence so that clients that poll slowly,
//! or not at all, still move toward `Found` or `Timeout`. It uses the same
//! transition logic as an on-demand status request. A ticket whose match has
//! vanished is forced to `Timeout`. One bad ticket never stops a pass.

use crate::error::{MatchmakingError, Result};
use crate::matchmaking::pool::{Advance, MatchPool};
use crate::matchmaking::registry::{TicketHandle, TicketRegistry};
use crate::matchmaking::transition::Transition;
use crate::metrics::MetricsCollector;
use crate::types::TicketStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Outcome counts of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Non-terminal tickets evaluated
    pub examined: usize,
    pub started: usize,
    pub timed_out: usize,
    pub found: usize,
    /// Tickets forced to Timeout because their match was gone
    pub orphaned: usize,
    pub errors: usize,
}

impl ReconcileReport {
    pub fn changed(&self) -> usize {
        self.started + self.timed_out + self.found + self.orphaned
    }
}

pub struct Reconciler {
    pool: Arc<MatchPool>,
    registry: Arc<TicketRegistry>,
    metrics: Arc<MetricsCollector>,
    period: Duration,
}

impl Reconciler {
    pub fn new(
        pool: Arc<MatchPool>,
        registry: Arc<TicketRegistry>,
        metrics: Arc<MetricsCollector>,
        period: Duration,
    ) -> Self {
        Self {
            pool,
            registry,
            metrics,
            period,
        }
    }

    /// Evaluate every known ticket once
    pub fn run_once(&self) -> Result<ReconcileReport> {
        let timer = self.metrics.start_timer();
        let mut report = ReconcileReport::default();

        for handle in self.registry.snapshot()? {
            if let Err(e) = self.reconcile_ticket(&handle, &mut report) {
                report.errors += 1;
                error!("Failed to reconcile ticket: {}", e);
            }
        }

        self.metrics.record_reconcile_pass(&report, timer.stop());
        if report.changed() > 0 || report.errors > 0 {
            debug!("Reconcile pass finished: {:?}", report);
        }

        Ok(report)
    }

    fn reconcile_ticket(&self, handle: &TicketHandle, report: &mut ReconcileReport) -> Result<()> {
        let mut ticket = handle
            .lock()
            .map_err(|_| MatchmakingError::lock_failed("ticket"))?;

        if ticket.status().is_terminal() {
            return Ok(());
        }
        report.examined += 1;

        let previous = ticket.status();
        match self.pool.advance_ticket(&mut ticket)? {
            Advance::MatchMissing => {
                ticket.set_status(TicketStatus::Timeout);
                report.orphaned += 1;
                self.metrics.record_transition(previous, TicketStatus::Timeout);
                warn!(
                    "Ticket {} for '{}' (issued {}) lost match {} in queue '{}', marking as timed out",
                    ticket.id(),
                    ticket.player_id(),
                    ticket.created_at().to_rfc3339(),
                    ticket.match_id(),
                    ticket.queue()
                );
            }
            Advance::Resolved { transition, .. } => {
                match transition {
                    Transition::Unchanged => return Ok(()),
                    Transition::StartServer => report.started += 1,
                    Transition::TimedOut => {
                        report.timed_out += 1;
                        self.metrics.record_match_timed_out(ticket.queue());
                    }
                    Transition::Found => report.found += 1,
                }
                self.metrics.record_transition(previous, ticket.status());
            }
        }

        Ok(())
    }

    /// Run passes every `period` until a shutdown signal arrives
    pub fn start(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Started ticket reconciler - period: {:?}", self.period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once() {
                            error!("Reconcile pass failed: {}", e);
                        }
                    }
                    _ = shutdown.recv() => {
                        info!("Ticket reconciler received shutdown signal");
                        break;
                    }
                }
            }

            info!("Ticket reconciler stopped");
        })
    }
}
