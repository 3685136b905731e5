//! Reconciliation sweep
//!
//! Background task that periodically looks for trades stuck in Settling
//! past a timeout and resolves them against the chain. This is the recovery
//! path for a worker that died between claiming a trade and recording the
//! broadcast outcome.

use crate::service::SettlementService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Settings for the reconciliation loop.
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerSettings {
    /// How often to sweep.
    pub interval: Duration,
    /// How long a trade may sit in Settling before it counts as stuck.
    pub settling_timeout: chrono::Duration,
}

/// Spawn the reconciliation loop. Runs until the token cancels.
pub fn spawn_reconciler(
    service: Arc<SettlementService>,
    settings: ReconcilerSettings,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            interval_seconds = settings.interval.as_secs(),
            settling_timeout_seconds = settings.settling_timeout.num_seconds(),
            "Reconciler started"
        );

        let mut ticker = tokio::time::interval(settings.interval);
        // The first tick fires immediately; skip it so a restart does not
        // sweep before the workers have had a chance to drain the queue.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Reconciler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = service.sweep_stuck_settlements(settings.settling_timeout).await {
                        tracing::error!(error = %e, "Reconciliation sweep failed");
                    }
                }
            }
        }
    })
}
