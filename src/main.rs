//! Main entry point for the Ticket Booth matchmaking service
//!
//! This is the production entry point that initializes and runs the
//! complete matchmaking microservice with logging and graceful shutdown.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use ticket_booth::config::{validate_config, AppConfig};
use ticket_booth::service::{AppState, HealthCheck, HealthProbe};
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Ticket Booth Matchmaking Service
#[derive(Parser)]
#[command(
    name = "ticket-booth",
    version,
    about = "A ticket-based matchmaking microservice",
    long_about = "Ticket Booth hands out matchmaking tickets over HTTP, groups players \
                 into matches per queue, elects one player per match to start a game \
                 server and relays the server's join code to everyone else."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP host override
    #[arg(long, value_name = "HOST", help = "Override HTTP bind host")]
    host: Option<String>,

    /// HTTP port override
    #[arg(short, long, value_name = "PORT", help = "Override HTTP server port")]
    port: Option<u16>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Log a health summary every 30 seconds
async fn health_check_task(probe: HealthProbe) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));

    while probe.is_running() {
        interval.tick().await;

        let health = HealthCheck::check(&probe).await;
        info!(
            "Health check: {} - {} open matches, {} players waiting, {} tickets",
            health.status,
            health.stats.open_matches,
            health.stats.waiting_players,
            health.stats.tickets.total()
        );
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🎟️  Ticket Booth Matchmaking Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   HTTP: {}", config.http_addr());
    info!(
        "   Players: {} per match, {} to start",
        config.matchmaking.max_players, config.matchmaking.players_to_start
    );
    info!(
        "   Stale after: {}s, start timeout: {}s",
        config.matchmaking.stale_after_seconds, config.matchmaking.start_timeout_seconds
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(host) = &args.host {
        config.service.http_host = host.clone();
    }

    if let Some(port) = args.port {
        config.service.http_port = port;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let mut app_state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let health_task = tokio::spawn(health_check_task(app_state.health_probe()));

    info!("✅ Ticket Booth Matchmaking Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
    health_task.abort();

    match tokio::time::timeout(config.shutdown_timeout(), app_state.shutdown()).await {
        Ok(Ok(())) => info!("✅ Graceful shutdown completed successfully"),
        Ok(Err(e)) => warn!("Shutdown completed with errors: {}", e),
        Err(_) => warn!("⚠️  Shutdown timeout exceeded, forcing exit"),
    }

    info!("🛑 Ticket Booth Matchmaking Service stopped");
    Ok(())
}
