//! Background write queue
//!
//! Persistence writes are fire-and-forget for callers: `submit` returns
//! immediately and a single background task applies writes in the order
//! they were issued, so two writes to the same key can never land out of
//! order. Failed writes are logged and counted, never retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::persistence::PersistentStore;
use crate::sync::ErrorKind;

enum WriteOp {
    Put { key: String, bytes: Vec<u8> },
    Flush(oneshot::Sender<()>),
}

/// Handle to the background writer
///
/// Cloning is cheap; all clones feed the same ordered queue.
#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<WriteOp>,
    failures: Arc<AtomicU64>,
}

impl WriteQueue {
    /// Spawn the writer task on the current tokio runtime
    pub fn spawn(store: Arc<dyn PersistentStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let failures = Arc::new(AtomicU64::new(0));

        tokio::spawn(write_loop(store, rx, Arc::clone(&failures)));

        Self { tx, failures }
    }

    /// Queue raw bytes for `key`
    pub fn submit(&self, key: &str, bytes: Vec<u8>) {
        let op = WriteOp::Put {
            key: key.to_string(),
            bytes,
        };
        if self.tx.send(op).is_err() {
            warn!("Write queue closed, dropping write to '{}'", key);
        }
    }

    /// Serialize `value` as JSON and queue it for `key`
    pub fn submit_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.submit(key, bytes),
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!("{}: could not serialize '{}': {}", ErrorKind::PersistenceWriteFailed, key, e);
            }
        }
    }

    /// Wait until every write queued before this call has been applied
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(WriteOp::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Number of writes that failed since the queue was spawned
    pub fn failed_writes(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

async fn write_loop(
    store: Arc<dyn PersistentStore>,
    mut rx: mpsc::UnboundedReceiver<WriteOp>,
    failures: Arc<AtomicU64>,
) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Put { key, bytes } => {
                let len = bytes.len();
                let task_store = Arc::clone(&store);
                let task_key = key.clone();
                let result =
                    tokio::task::spawn_blocking(move || task_store.set(&task_key, &bytes)).await;

                match result {
                    Ok(Ok(())) => debug!("Persisted '{}' ({} bytes)", key, len),
                    Ok(Err(e)) => {
                        failures.fetch_add(1, Ordering::Relaxed);
                        match e.recovery_suggestion() {
                            Some(hint) => warn!(
                                "{} for '{}': {} ({})",
                                ErrorKind::PersistenceWriteFailed,
                                key,
                                e,
                                hint
                            ),
                            None => {
                                warn!("{} for '{}': {}", ErrorKind::PersistenceWriteFailed, key, e)
                            }
                        }
                    }
                    Err(e) => {
                        failures.fetch_add(1, Ordering::Relaxed);
                        warn!("{} for '{}': {}", ErrorKind::PersistenceWriteFailed, key, e);
                    }
                }
            }
            WriteOp::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("Write queue closed");
}
