//! Settlement worker pool
//!
//! A fixed number of workers pull jobs off the shared queue and drive the
//! settlement sequence. Every job outcome is terminal at the worker: errors
//! are logged, never retried and never propagated. Redelivered jobs for an
//! already-claimed trade surface as Conflict and are dropped.

use crate::error::SettlementError;
use crate::queue::SettlementQueue;
use crate::service::SettlementService;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Pool of settlement workers sharing one queue.
pub struct SettlementWorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl SettlementWorkerPool {
    /// Spawn `worker_count` workers. They run until the token cancels or the
    /// queue closes.
    pub fn spawn(
        service: Arc<SettlementService>,
        queue: Arc<dyn SettlementQueue>,
        worker_count: usize,
        shutdown: CancellationToken,
    ) -> Self {
        let handles = (0..worker_count)
            .map(|worker_id| {
                let service = service.clone();
                let queue = queue.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    run_worker(worker_id, service, queue, shutdown).await;
                })
            })
            .collect();

        Self { handles }
    }

    /// Wait for all workers to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Settlement worker panicked");
            }
        }
    }
}

async fn run_worker(
    worker_id: usize,
    service: Arc<SettlementService>,
    queue: Arc<dyn SettlementQueue>,
    shutdown: CancellationToken,
) {
    tracing::info!(worker_id, "Settlement worker started");

    loop {
        let job = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(worker_id, "Settlement worker shutting down");
                break;
            }
            job = queue.dequeue() => match job {
                Some(job) => job,
                None => {
                    tracing::info!(worker_id, "Settlement queue closed, worker exiting");
                    break;
                }
            },
        };

        let trade_id = job.trade_id;
        tracing::debug!(worker_id, trade_id = %trade_id, "Processing settlement job");

        match service.settle_trade(trade_id).await {
            Ok(trade) => {
                tracing::info!(worker_id, trade_id = %trade_id, status = %trade.status, "Settlement job complete");
            }
            Err(SettlementError::NotFound(_)) => {
                tracing::warn!(worker_id, trade_id = %trade_id, "Settlement job dropped, trade not found");
            }
            Err(SettlementError::Conflict { status, .. }) => {
                tracing::warn!(
                    worker_id,
                    trade_id = %trade_id,
                    status = %status,
                    "Settlement job dropped, trade already claimed"
                );
            }
            Err(e) => {
                // The trade was already marked Failed by the service.
                tracing::error!(worker_id, trade_id = %trade_id, error = %e, "Settlement job failed");
            }
        }
    }
}
