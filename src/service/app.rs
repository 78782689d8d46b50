//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the matchmaking
//! core to its HTTP surface and background reconciler.

use crate::api;
use crate::config::AppConfig;
use crate::matchmaking::{MatchPool, MatchmakingService, Reconciler, TicketRegistry};
use crate::metrics::health::{self, HealthServerState};
use crate::metrics::MetricsCollector;
use crate::service::health::HealthProbe;
use crate::utils::{Clock, SystemClock};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Production application state
pub struct AppState {
    config: AppConfig,

    service: MatchmakingService,

    reconciler: Arc<Reconciler>,

    probe: HealthProbe,

    /// Fan-out shutdown signal for the HTTP server and reconciler
    shutdown_tx: broadcast::Sender<()>,

    background_tasks: Vec<JoinHandle<()>>,

    local_addr: Option<SocketAddr>,
}

impl AppState {
    /// Build all components from configuration using the system clock
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        Self::with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self, ServiceError> {
        info!("Initializing ticket-booth matchmaking service");

        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let rules = config
            .match_rules()
            .map_err(|e| ServiceError::Configuration {
                message: e.to_string(),
            })?;
        info!(
            "Match rules: max_players={}, players_to_start={}, stale_after={}s, start_timeout={}s",
            rules.max_players,
            rules.players_to_start,
            rules.stale_after.num_seconds(),
            rules.start_timeout.num_seconds()
        );

        let metrics =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let pool = Arc::new(MatchPool::new(rules, clock.clone()).map_err(|e| {
            ServiceError::Configuration {
                message: e.to_string(),
            }
        })?);
        let registry = Arc::new(TicketRegistry::new(clock));

        let service = MatchmakingService::new(pool.clone(), registry.clone(), metrics.clone());
        let reconciler = Arc::new(Reconciler::new(
            pool,
            registry,
            metrics,
            config.reconcile_interval(),
        ));
        let probe = HealthProbe::new(config.service.name.clone(), service.clone());
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            service,
            reconciler,
            probe,
            shutdown_tx,
            background_tasks: Vec::new(),
            local_addr: None,
        })
    }

    /// Start the service
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting ticket-booth matchmaking service");

        self.start_http_server().await?;
        self.start_reconciler();
        self.probe.set_running(true);

        info!("✅ Ticket-booth matchmaking service started successfully");
        Ok(())
    }

    /// Signal every background task and wait for them to finish
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of ticket-booth service");
        self.probe.set_running(false);

        if self.shutdown_tx.send(()).is_err() {
            debug!("No background tasks were listening for shutdown");
        }

        let task_count = self.background_tasks.len();
        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Waiting for background task {}/{}", i + 1, task_count);
            if let Err(e) = task.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }

        match self.service.stats() {
            Ok(stats) => info!("Final service statistics: {:?}", stats),
            Err(e) => {
                return Err(ServiceError::BackgroundTask {
                    message: format!("Failed to get final stats: {}", e),
                })
            }
        }

        info!("✅ Ticket-booth service shutdown completed");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.probe.is_running()
    }

    pub fn service(&self) -> MatchmakingService {
        self.service.clone()
    }

    pub fn reconciler(&self) -> Arc<Reconciler> {
        self.reconciler.clone()
    }

    pub fn health_probe(&self) -> HealthProbe {
        self.probe.clone()
    }

    /// Address the HTTP server is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Ticket API merged with the health and metrics routes
    pub fn router(&self) -> Router {
        let health_state =
            HealthServerState::new(self.service.metrics()).with_probe(self.probe.clone());

        api::router(self.service.clone()).merge(health::router(health_state))
    }

    async fn start_http_server(&mut self) -> Result<(), ServiceError> {
        let addr = self.config.http_addr();
        let listener =
            TcpListener::bind(&addr)
                .await
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to bind HTTP listener on {}: {}", addr, e),
                })?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to read bound address: {}", e),
            })?;
        self.local_addr = Some(local_addr);

        let app = self.router();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("HTTP server listening on http://{}", local_addr);

            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                    info!("HTTP server shutdown signal received");
                })
                .await;

            match result {
                Ok(()) => info!("HTTP server stopped"),
                Err(e) => error!("HTTP server failed: {}", e),
            }
        });

        self.background_tasks.push(handle);
        Ok(())
    }

    fn start_reconciler(&mut self) {
        let handle = self
            .reconciler
            .clone()
            .start(self.shutdown_tx.subscribe());
        self.background_tasks.push(handle);
    }
}
