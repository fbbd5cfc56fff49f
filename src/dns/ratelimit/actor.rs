//! Single-writer update path
//!
//! Every request-handling task enqueues observations on a bounded
//! channel; one consumer task applies them to the bucket table in
//! arrival order. This task is the only writer of the [`BucketTable`]:
//! both [`BucketTable::set`] and the reset path run here, so slot updates
//! never race.
//!
//! ```text
//! UDP task ─┐
//! UDP task ─┼─> mpsc (bounded) ─> UpdateActor ─> estimator ─> BucketTable
//! TCP conn ─┘        │
//!                    └─ full: drop (default) or wait
//! ```

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::bucket::BucketTable;
use super::estimator::RateEstimator;
use super::stats::RateLimiterStats;
use crate::dns::config::OverflowPolicy;

/// Log one overflow warning per this many dropped updates
const DROP_WARN_INTERVAL: u64 = 1024;

/// One completed exchange to fold into the client's bucket
#[derive(Debug, Clone, Copy)]
pub struct UpdateRequest {
    /// Client address
    pub client: IpAddr,
    /// When the exchange completed
    pub observed_at: Instant,
    /// DNS message ID, for tracing
    pub query_id: u16,
}

enum Command {
    Observe(UpdateRequest),
    Flush(oneshot::Sender<()>),
    Reset(oneshot::Sender<()>),
}

/// Producer side of the update queue
#[derive(Clone)]
pub struct UpdateHandle {
    tx: mpsc::Sender<Command>,
    stats: Arc<RateLimiterStats>,
}

impl UpdateHandle {
    /// Enqueue an observation
    ///
    /// With [`OverflowPolicy::Drop`] this never waits: a full or closed
    /// queue discards the update. With [`OverflowPolicy::Block`] it waits
    /// for capacity. Returns whether the update was accepted.
    pub async fn submit(&self, request: UpdateRequest, policy: OverflowPolicy) -> bool {
        let accepted = match policy {
            OverflowPolicy::Drop => match self.tx.try_send(Command::Observe(request)) {
                Ok(()) => true,
                Err(TrySendError::Full(_) | TrySendError::Closed(_)) => false,
            },
            OverflowPolicy::Block => self.tx.send(Command::Observe(request)).await.is_ok(),
        };

        if accepted {
            self.stats.record_submitted();
        } else {
            let dropped = self.stats.record_dropped();
            if dropped % DROP_WARN_INTERVAL == 1 {
                warn!(
                    dropped_total = dropped,
                    capacity = self.tx.max_capacity(),
                    "Rate limit update queue full, discarding updates"
                );
            }
            trace!(client = %request.client, "Rate limit update dropped");
        }

        accepted
    }

    /// Wait until every update enqueued before this call has been applied
    ///
    /// Returns `false` if the actor has stopped.
    pub async fn flush(&self) -> bool {
        self.round_trip(Command::Flush).await
    }

    /// Empty the table once every update enqueued before this call is applied
    ///
    /// Returns `false` if the actor has stopped.
    pub async fn reset(&self) -> bool {
        self.round_trip(Command::Reset).await
    }

    async fn round_trip(&self, command: fn(oneshot::Sender<()>) -> Command) -> bool {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(command(ack_tx)).await.is_err() {
            return false;
        }
        ack_rx.await.is_ok()
    }
}

/// The consumer task
pub struct UpdateActor {
    rx: mpsc::Receiver<Command>,
    table: Arc<BucketTable>,
    estimator: RateEstimator,
    stats: Arc<RateLimiterStats>,
}

impl UpdateActor {
    /// Start the consumer on the current Tokio runtime
    ///
    /// The task exits once every [`UpdateHandle`] has been dropped and the
    /// queue is drained.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(
        table: Arc<BucketTable>,
        estimator: RateEstimator,
        stats: Arc<RateLimiterStats>,
        capacity: usize,
    ) -> (UpdateHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let actor = Self {
            rx,
            table,
            estimator,
            stats: Arc::clone(&stats),
        };
        let task = tokio::spawn(actor.run());
        (UpdateHandle { tx, stats }, task)
    }

    async fn run(mut self) {
        debug!(
            slots = self.table.capacity(),
            window_secs = self.estimator.window().as_secs(),
            "Rate limit update actor started"
        );

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Observe(request) => self.apply(&request),
                Command::Flush(ack) => {
                    let _ = ack.send(());
                }
                Command::Reset(ack) => {
                    self.table.clear();
                    debug!("Rate limit table cleared");
                    let _ = ack.send(());
                }
            }
        }

        debug!(
            applied = self.stats.applied(),
            "Rate limit update actor stopped"
        );
    }

    fn apply(&self, request: &UpdateRequest) {
        let Some(slot) = self.table.index_for(request.client) else {
            return;
        };

        let previous = self.table.get(slot);
        let collided = previous.is_some_and(|prev| prev.source != request.client);
        let bucket = self
            .estimator
            .observe(previous.as_ref(), request.client, request.observed_at);
        self.table.set(slot, bucket);
        self.stats.record_applied(collided);

        if collided {
            trace!(
                client = %request.client,
                previous = ?previous.map(|b| b.source),
                slot,
                "Bucket slot collision"
            );
        }
        trace!(
            client = %request.client,
            id = request.query_id,
            slot,
            rate = bucket.rate,
            "Bucket updated"
        );
    }
}
