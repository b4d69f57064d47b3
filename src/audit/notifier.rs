//! Fire-and-forget audit delivery
//!
//! `notify` only tries to push onto a bounded channel; a single worker task
//! drains it in order. Delivery failures are logged and dropped, so neither
//! a slow nor a dead sink can reach the login decision or a command result.
//! When the sink falls behind and the queue fills up, new events are dropped
//! and counted instead of buffered.

use super::events::AuditEvent;
use super::sink::AuditSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Events held while the sink is busy before new ones are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

enum Job {
    Deliver(AuditEvent),
    Flush(oneshot::Sender<()>),
}

/// Handle for queueing audit events. Cheap to clone.
#[derive(Clone)]
pub struct AuditNotifier {
    tx: mpsc::Sender<Job>,
    dropped: Arc<AtomicU64>,
}

impl AuditNotifier {
    /// Start the delivery worker with the default queue capacity.
    pub fn spawn(sink: Arc<dyn AuditSink>) -> (Self, JoinHandle<()>) {
        Self::spawn_with_capacity(sink, DEFAULT_QUEUE_CAPACITY)
    }

    /// Start the delivery worker. Must be called inside a tokio runtime.
    ///
    /// At most `capacity` events wait behind the one being delivered. The
    /// worker exits once every `AuditNotifier` clone is dropped and the
    /// queue is drained.
    pub fn spawn_with_capacity(
        sink: Arc<dyn AuditSink>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(sink, rx));
        let notifier = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (notifier, worker)
    }

    /// Queue an event. Never blocks, never fails; drops the event when the
    /// queue is full.
    pub fn notify(&self, event: AuditEvent) {
        match self.tx.try_send(Job::Deliver(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(dropped, "audit queue full, dropping audit event");
            }
            Err(TrySendError::Closed(_)) => {
                warn!("audit worker stopped, dropping audit event");
            }
        }
    }

    /// Events dropped so far because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Wait until everything queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).await.is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

async fn run_worker(sink: Arc<dyn AuditSink>, mut rx: mpsc::Receiver<Job>) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Deliver(event) => {
                let message = event.message();
                match sink.deliver(&message).await {
                    Ok(()) => debug!(%message, "audit message delivered"),
                    Err(e) => warn!(error = %e, %message, "audit delivery failed"),
                }
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("audit worker stopped");
}
