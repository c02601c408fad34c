//! autodial-cd - Call Dialer service
//!
//! Serves the campaign HTTP API (start/cancel campaigns, interpret call
//! commands, poll progress, read call logs) on `bind_address:port`
//! (default 127.0.0.1:5790).

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use autodial_cd::db::{init_database_pool, SqliteCallLog};
use autodial_cd::services::{
    build_transport, CallLogStore, CampaignOrchestrator, CommandInterpreter, DialerOptions,
    InMemoryCallLog, NumberListValidator,
};
use autodial_cd::{build_router, AppState};
use autodial_common::config::{load_config, resolve_config_path};
use autodial_common::events::EventBus;

/// Command-line arguments for autodial-cd
#[derive(Parser, Debug)]
#[command(name = "autodial-cd")]
#[command(about = "Outbound call campaign service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "AUTODIAL_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(short, long, env = "AUTODIAL_BIND")]
    bind: Option<String>,

    /// SQLite file for call logs (overrides config)
    #[arg(short, long, env = "AUTODIAL_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting autodial-cd (Call Dialer) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: compiled defaults"),
    }

    let validator = NumberListValidator::new(config.dialer.default_country_code.as_deref())
        .context("Invalid dialer.default_country_code")?;
    let interpreter = CommandInterpreter::new(validator.clone(), config.interpreter.ambiguity);

    let log_store: Arc<dyn CallLogStore> = match args.database.or(config.database_path.clone()) {
        Some(db_path) => {
            info!("Database: {}", db_path.display());
            let pool = init_database_pool(&db_path)
                .await
                .context("Failed to open call log database")?;
            Arc::new(SqliteCallLog::new(pool))
        }
        None => {
            warn!("No database_path configured, call logs are kept in memory only");
            Arc::new(InMemoryCallLog::new())
        }
    };

    let transport = build_transport(&config.transport);
    let event_bus = EventBus::new(100);

    let orchestrator = CampaignOrchestrator::new(
        transport,
        log_store,
        event_bus.clone(),
        DialerOptions::from(&config.dialer),
    );

    let state = AppState::new(orchestrator, validator, interpreter, event_bus);
    let app = build_router(state);

    let bind = args.bind.unwrap_or(config.bind_address);
    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
