//! Settlement queue - trait and in-memory implementation
//!
//! Jobs carry the trade id only, never the record itself: the record is
//! re-loaded at processing time, so nothing stale travels between enqueue
//! and execution. Delivery is at-least-once; duplicates are absorbed by the
//! Pending guard in the worker sequence.

use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Queue channel carrying settlement work.
pub const SETTLEMENT_CHANNEL: &str = "settlement";

/// Job kind for a settlement attempt.
pub const SETTLE_TRADE_JOB: &str = "settle-trade";

/// One unit of settlement work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementJob {
    pub trade_id: Uuid,
}

/// Interface for settlement job delivery.
///
/// Contract: each enqueued job reaches exactly one worker invocation per
/// delivery, and a job may be delivered more than once after a worker or
/// broker failure.
#[async_trait]
pub trait SettlementQueue: Send + Sync {
    /// Submit a job for asynchronous processing.
    async fn enqueue(&self, job: SettlementJob) -> Result<()>;

    /// Receive the next job. `None` means the queue has shut down.
    async fn dequeue(&self) -> Option<SettlementJob>;
}

/// In-process settlement queue backed by a bounded tokio channel.
///
/// Workers share the consuming end; a job is handed to exactly one of them.
pub struct InMemoryQueue {
    tx: mpsc::Sender<SettlementJob>,
    rx: Mutex<mpsc::Receiver<SettlementJob>>,
}

impl InMemoryQueue {
    /// Create a queue with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

#[async_trait]
impl SettlementQueue for InMemoryQueue {
    async fn enqueue(&self, job: SettlementJob) -> Result<()> {
        tracing::debug!(
            trade_id = %job.trade_id,
            channel = SETTLEMENT_CHANNEL,
            kind = SETTLE_TRADE_JOB,
            "Enqueueing settlement job"
        );
        self.tx
            .send(job)
            .await
            .map_err(|_| SettlementError::QueueClosed)
    }

    async fn dequeue(&self) -> Option<SettlementJob> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_dequeue() {
        let queue = InMemoryQueue::new(8);
        let job = SettlementJob {
            trade_id: Uuid::new_v4(),
        };

        queue.enqueue(job).await.unwrap();

        let received = queue.dequeue().await.unwrap();
        assert_eq!(received, job);
    }

    #[tokio::test]
    async fn test_jobs_delivered_once_each() {
        let queue = std::sync::Arc::new(InMemoryQueue::new(8));

        let a = SettlementJob {
            trade_id: Uuid::new_v4(),
        };
        let b = SettlementJob {
            trade_id: Uuid::new_v4(),
        };
        queue.enqueue(a).await.unwrap();
        queue.enqueue(b).await.unwrap();

        let first = queue.dequeue().await.unwrap();
        let second = queue.dequeue().await.unwrap();

        assert_ne!(first.trade_id, second.trade_id);
        assert!([a, b].contains(&first));
        assert!([a, b].contains(&second));
    }
}
