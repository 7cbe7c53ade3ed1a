//! Background task that owns the write side of both stores.
//!
//! The session sends snapshots; the task debounces them and runs write
//! cycles. Only the latest pending snapshot is kept, so at most one cycle's
//! worth of state is ever queued.

use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::debounce::Debounce;
use super::status::PersistStatus;
use crate::model::TimesheetState;
use crate::storage::{BLOB_NAME, BlobStore, FAST_STATE_KEY, FastStore, write_bounded};
use crate::transfer::encode_envelope;

/// Counters describing write activity over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistStats {
    pub cycles: u64,
    pub fast_failures: u64,
    pub blob_failures: u64,
}

pub(crate) enum Command {
    /// Debounced write of this snapshot.
    Schedule(TimesheetState),
    /// Immediate write, cancelling anything pending.
    Flush(TimesheetState, oneshot::Sender<PersistStatus>),
    /// Write anything pending, then exit.
    Shutdown(oneshot::Sender<PersistStatus>),
}

/// The stores a session persists into.
#[derive(Clone)]
pub struct Backends {
    pub fast: Arc<dyn FastStore>,
    pub blob: Option<Arc<dyn BlobStore>>,
    pub io_timeout: Duration,
}

struct Writer {
    backends: Backends,
    status: watch::Sender<PersistStatus>,
    stats: Arc<Mutex<PersistStats>>,
}

pub(crate) struct WriterHandle {
    pub(crate) tx: mpsc::UnboundedSender<Command>,
    pub(crate) stats: Arc<Mutex<PersistStats>>,
    pub(crate) task: JoinHandle<()>,
}

pub(crate) fn spawn(
    backends: Backends,
    status: watch::Sender<PersistStatus>,
    delay: Duration,
) -> WriterHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let stats = Arc::new(Mutex::new(PersistStats::default()));
    let writer = Writer {
        backends,
        status,
        stats: Arc::clone(&stats),
    };
    let task = tokio::spawn(writer.run(rx, Debounce::new(delay)));
    WriterHandle { tx, stats, task }
}

impl Writer {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Command>, mut debounce: Debounce) {
        let mut pending: Option<TimesheetState> = None;

        loop {
            let command = match debounce.deadline() {
                Some(deadline) => tokio::select! {
                    command = rx.recv() => command,
                    () = tokio::time::sleep_until(deadline) => {
                        if debounce.take_due(Instant::now()) {
                            if let Some(snapshot) = pending.take() {
                                self.cycle(&snapshot).await;
                            }
                        }
                        continue;
                    }
                },
                None => rx.recv().await,
            };

            match command {
                Some(Command::Schedule(snapshot)) => {
                    pending = Some(snapshot);
                    debounce.mark_dirty_at(Instant::now());
                }
                Some(Command::Flush(snapshot, ack)) => {
                    debounce.cancel();
                    pending = None;
                    let _ = ack.send(self.cycle(&snapshot).await);
                }
                Some(Command::Shutdown(ack)) => {
                    debounce.cancel();
                    if let Some(snapshot) = pending.take() {
                        self.cycle(&snapshot).await;
                    }
                    let _ = ack.send(*self.status.borrow());
                    break;
                }
                None => {
                    // Session dropped without closing.
                    if let Some(snapshot) = pending.take() {
                        self.cycle(&snapshot).await;
                    }
                    break;
                }
            }
        }
    }

    /// One write cycle: fast store first, then the async store.
    async fn cycle(&self, snapshot: &TimesheetState) -> PersistStatus {
        let bytes = match encode_envelope(snapshot, Utc::now()) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode timesheet envelope");
                self.status.send_replace(PersistStatus::Error);
                return PersistStatus::Error;
            }
        };
        self.bump(|stats| stats.cycles += 1);

        let fast_ok = match self.backends.fast.write(FAST_STATE_KEY, &bytes) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    code = %err.code(),
                    key = FAST_STATE_KEY,
                    bytes = bytes.len(),
                    error = %err,
                    "fast store write failed"
                );
                self.bump(|stats| stats.fast_failures += 1);
                false
            }
        };

        if let Some(blob) = &self.backends.blob {
            match write_bounded(blob.as_ref(), BLOB_NAME, &bytes, self.backends.io_timeout).await {
                Ok(()) => {
                    tracing::debug!(bytes = bytes.len(), "timesheet saved");
                    self.status.send_replace(PersistStatus::Saved);
                }
                Err(err) => {
                    tracing::error!(code = %err.code(), error = %err, "async store write failed");
                    self.bump(|stats| stats.blob_failures += 1);
                    self.status.send_replace(PersistStatus::Error);
                }
            }
        } else if fast_ok {
            self.status.send_replace(PersistStatus::Saved);
        }

        *self.status.borrow()
    }

    fn bump(&self, f: impl FnOnce(&mut PersistStats)) {
        f(&mut self.stats.lock().unwrap_or_else(|e| e.into_inner()));
    }
}
