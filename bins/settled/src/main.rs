//! OpenSettle CLI and Server Binary
//!
//! This is the main entry point for the OpenSettle application.
//! It provides commands for initializing, validating, and starting
//! the settlement service.

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use cli::{Cli, Commands};
use common::ShutdownController;
use config::{generate_default_config, load_config, save_config, validate_config, MasterConfig};
use observability::{init_logging, LogFormat};
use settlement::api::{create_router, SettlementApiState};
use settlement::{
    spawn_reconciler, InMemoryQueue, InMemoryTradeStore, ReconcilerSettings, SettlementService,
    SettlementWorkerPool, SimulatedChain,
};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Start {
            config,
            http,
            workers,
        } => start_service(config, http, workers).await,
        Commands::Validate { config } => {
            init_logging("settled", LogFormat::Pretty)?;
            validate_command(config).await
        }
        Commands::Init { output } => {
            init_logging("settled", LogFormat::Pretty)?;
            init_command(output).await
        }
    }
}

async fn start_service<P: AsRef<Path>>(
    config_path: P,
    http_override: Option<u16>,
    worker_override: Option<usize>,
) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let report = validate_config(&config);

    if !report.is_valid() {
        // Logging is not up yet; print straight to stderr.
        for err in &report.errors {
            eprintln!("[error] {err}");
        }
        anyhow::bail!("Cannot start service due to configuration errors");
    }

    let format = LogFormat::parse(&config.logging.format).unwrap_or_default();
    init_logging(&config.service.name, format)?;

    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }

    let http_port = http_override.unwrap_or(config.server.port);
    let worker_count = worker_override.unwrap_or(config.settlement.worker_count);

    info!(
        service = %config.service.name,
        version = %config.service.version,
        http_port,
        worker_count,
        "Starting settlement service"
    );

    run_service(&config, http_port, worker_count).await
}

async fn run_service(config: &MasterConfig, http_port: u16, worker_count: usize) -> Result<()> {
    // Validation already confirmed the fee rate parses.
    let fee_rate = BigDecimal::from_str(&config.settlement.fee_rate)
        .with_context(|| format!("Invalid fee rate: {}", config.settlement.fee_rate))?;

    let store = Arc::new(InMemoryTradeStore::new());
    let chain = Arc::new(SimulatedChain::new(Duration::from_millis(
        config.settlement.chain.broadcast_delay_ms,
    )));
    let queue = Arc::new(InMemoryQueue::new(config.settlement.queue_capacity));
    let service = Arc::new(SettlementService::new(
        store,
        chain,
        queue.clone(),
        fee_rate,
    ));

    let shutdown = ShutdownController::with_ctrl_c();

    let pool = SettlementWorkerPool::spawn(
        service.clone(),
        queue,
        worker_count,
        shutdown.child_token(),
    );

    let reconciler = if config.settlement.reconciler.enabled {
        Some(spawn_reconciler(
            service.clone(),
            ReconcilerSettings {
                interval: Duration::from_secs(config.settlement.reconciler.interval_seconds),
                settling_timeout: chrono_seconds(
                    config.settlement.reconciler.settling_timeout_seconds,
                ),
            },
            shutdown.child_token(),
        ))
    } else {
        None
    };

    let router = create_router(SettlementApiState { service });
    let addr = format!("{}:{}", config.server.host, http_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(addr = %addr, "HTTP server listening");

    let server_token = shutdown.token();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { server_token.cancelled().await })
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped, draining workers");

    pool.join().await;
    if let Some(handle) = reconciler {
        if let Err(e) = handle.await {
            error!(error = %e, "Reconciler task panicked");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

fn chrono_seconds(seconds: u64) -> chrono::Duration {
    chrono::Duration::seconds(seconds.min(i64::MAX as u64) as i64)
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Service: {}", config.service.name);
    println!("Version: {}", config.service.version);
    println!("Fee rate: {}", config.settlement.fee_rate);
    println!("Workers: {}", config.settlement.worker_count);
    println!("Queue capacity: {}", config.settlement.queue_capacity);
    println!(
        "Reconciler: {}",
        if config.settlement.reconciler.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("This configuration includes:");
    println!("  - Service metadata (name, version)");
    println!("  - Settlement parameters (fee rate, workers, queue capacity)");
    println!("  - Reconciliation sweep settings");
    println!();
    println!("Next steps:");
    println!("  1. Edit the configuration file to customize settings");
    println!(
        "  2. Run 'settled validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'settled start --config {:?}' to start the service",
        output_path
    );

    Ok(())
}
