use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

use super::status::PersistStatus;
use super::writer::{self, Backends, Command, PersistStats, WriterHandle};
use crate::config::StoreConfig;
use crate::error::{ErrorCode, ImportError, StoreError};
use crate::migrate::{self, Shape};
use crate::model::TimesheetState;
use crate::storage::{
    BLOB_NAME, BlobStore, FAST_STATE_KEY, FastStore, FileBlobStore, LEGACY_VACATION_KEY,
    LocalStore, read_bounded,
};
use crate::transfer::{self, ImportPolicy};

/// Subdirectory of the data dir holding the fast store.
pub const LOCAL_DIR: &str = "local";

/// Subdirectory of the data dir holding the async blob store.
pub const BLOB_DIR: &str = "blobs";

/// Summary of a completed import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub shape: Shape,
    pub years: usize,
    pub skipped: Vec<String>,
    pub status: PersistStatus,
}

/// Owner of the canonical timesheet state for one application session.
///
/// Every mutation goes through [`Session::update`], which compares the state
/// before and after and schedules a debounced write when it changed.
pub struct Session {
    state: TimesheetState,
    writer: WriterHandle,
    status: watch::Receiver<PersistStatus>,
    blob_available: bool,
}

impl Session {
    /// Load state from both stores and start the background writer.
    ///
    /// The fast store is read first; the async store, when present and
    /// holding a recognizable payload, overrides it. Read failures of either
    /// store are logged and otherwise ignored.
    pub async fn open(config: &StoreConfig, backends: Backends) -> Self {
        let (status_tx, status) = watch::channel(PersistStatus::Idle);
        let mut state = TimesheetState::default();
        let mut loaded = false;

        if let Some(from_fast) = load_fast(backends.fast.as_ref()) {
            state = from_fast;
            loaded = true;
        }

        if let Some(blob) = &backends.blob {
            if let Some(from_blob) = load_blob(blob.as_ref(), &backends).await {
                state = from_blob;
                loaded = true;
            }
        }

        if loaded {
            status_tx.send_replace(PersistStatus::Loaded);
        }
        tracing::info!(
            years = state.years.len(),
            blob_store = backends.blob.is_some(),
            status = %*status_tx.borrow(),
            "timesheet session opened"
        );

        let blob_available = backends.blob.is_some();
        let writer = writer::spawn(backends, status_tx, config.persist.debounce());
        Self {
            state,
            writer,
            status,
            blob_available,
        }
    }

    /// Open a session over `<data_dir>/local` and, if detected, `<data_dir>/blobs`.
    pub async fn open_dir(data_dir: &Path, config: &StoreConfig) -> Result<Self, StoreError> {
        let fast = LocalStore::open(data_dir.join(LOCAL_DIR), config.storage.fast_quota_bytes)?;
        let blob = if config.storage.blob_store {
            FileBlobStore::detect(data_dir.join(BLOB_DIR)).await
        } else {
            None
        };
        Ok(Self::open(config, dir_backends(fast, blob, config)).await)
    }

    /// Open a session that only reads. Neither store directory is created or
    /// probed, and the async store is used only if its directory exists.
    ///
    /// Callers must not mutate the returned session; its writes would fail
    /// against a data dir that was never set up.
    pub async fn open_dir_read_only(data_dir: &Path, config: &StoreConfig) -> Self {
        let fast = LocalStore::existing(data_dir.join(LOCAL_DIR), config.storage.fast_quota_bytes);
        let blob = if config.storage.blob_store {
            FileBlobStore::existing(data_dir.join(BLOB_DIR)).await
        } else {
            None
        };
        Self::open(config, dir_backends(fast, blob, config)).await
    }

    #[must_use]
    pub const fn state(&self) -> &TimesheetState {
        &self.state
    }

    /// Whether an async store was detected for this session.
    #[must_use]
    pub const fn blob_available(&self) -> bool {
        self.blob_available
    }

    /// Apply a mutation. A debounced write is scheduled if the state changed.
    pub fn update<R>(&mut self, mutate: impl FnOnce(&mut TimesheetState) -> R) -> R {
        let before = self.state.clone();
        let out = mutate(&mut self.state);
        if self.state != before {
            self.mark_dirty();
        }
        out
    }

    /// Schedule a debounced write of the current state.
    pub fn mark_dirty(&self) {
        if self
            .writer
            .tx
            .send(Command::Schedule(self.state.clone()))
            .is_err()
        {
            tracing::warn!("persistence writer stopped; change not scheduled");
        }
    }

    /// Write the current state to both stores now, bypassing the debounce.
    pub async fn persist_now(&self) -> PersistStatus {
        let (ack, done) = oneshot::channel();
        if self
            .writer
            .tx
            .send(Command::Flush(self.state.clone(), ack))
            .is_err()
        {
            return self.status();
        }
        done.await.unwrap_or_else(|_| self.status())
    }

    #[must_use]
    pub fn status(&self) -> PersistStatus {
        *self.status.borrow()
    }

    /// A receiver that observes every status change.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<PersistStatus> {
        self.status.clone()
    }

    #[must_use]
    pub fn stats(&self) -> PersistStats {
        *self.writer.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Pretty-printed current envelope.
    pub fn export(&self) -> serde_json::Result<Vec<u8>> {
        transfer::export_pretty(&self.state, Utc::now())
    }

    /// Replace the state with an imported document of any known generation
    /// and write it to both stores immediately.
    pub async fn import(
        &mut self,
        bytes: &[u8],
        policy: ImportPolicy,
    ) -> Result<ImportReport, ImportError> {
        let resolution = transfer::parse_import(bytes, policy)?;
        if !resolution.shape.is_recognized() {
            tracing::warn!("importing unrecognized document; current data replaced by empty state");
        }
        self.state = resolution.state;
        let status = self.persist_now().await;

        tracing::info!(
            shape = %resolution.shape,
            years = self.state.years.len(),
            status = %status,
            "timesheet imported"
        );
        Ok(ImportReport {
            shape: resolution.shape,
            years: self.state.years.len(),
            skipped: resolution.skipped,
            status,
        })
    }

    /// Write anything still pending and stop the writer.
    pub async fn close(self) -> PersistStatus {
        let (ack, done) = oneshot::channel();
        if self.writer.tx.send(Command::Shutdown(ack)).is_err() {
            return *self.status.borrow();
        }
        let status = done.await.unwrap_or(*self.status.borrow());
        let _ = self.writer.task.await;
        status
    }
}

fn dir_backends(fast: LocalStore, blob: Option<FileBlobStore>, config: &StoreConfig) -> Backends {
    Backends {
        fast: Arc::new(fast),
        blob: blob.map(|store| Arc::new(store) as Arc<dyn BlobStore>),
        io_timeout: config.persist.io_timeout(),
    }
}

/// Current payload from the fast store, with the legacy vacation key folded in.
fn load_fast(fast: &dyn FastStore) -> Option<TimesheetState> {
    let primary = read_fast_json(fast, FAST_STATE_KEY)?;
    let value = match read_fast_json(fast, LEGACY_VACATION_KEY) {
        Some(vac) => migrate::with_legacy_vacation(primary, vac),
        None => primary,
    };

    let resolution = migrate::resolve_with_report(&value);
    if resolution.shape.is_recognized() {
        Some(resolution.state)
    } else {
        tracing::warn!(
            code = %ErrorCode::StoreReadFailed,
            key = FAST_STATE_KEY,
            "fast store holds no recognizable timesheet; ignoring it"
        );
        None
    }
}

fn read_fast_json(fast: &dyn FastStore, key: &str) -> Option<serde_json::Value> {
    let bytes = match fast.read(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(code = %ErrorCode::StoreReadFailed, key, error = %err, "fast store read failed");
            return None;
        }
    };
    match transfer::decode(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(code = %ErrorCode::StoreReadFailed, key, error = %err, "fast store entry is not valid JSON");
            None
        }
    }
}

async fn load_blob(blob: &dyn BlobStore, backends: &Backends) -> Option<TimesheetState> {
    let bytes = match read_bounded(blob, BLOB_NAME, backends.io_timeout).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(code = %ErrorCode::StoreReadFailed, error = %err, "async store read failed");
            return None;
        }
    };
    let value = match transfer::decode(&bytes) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(code = %ErrorCode::StoreReadFailed, error = %err, "async store blob is not valid JSON");
            return None;
        }
    };

    let resolution = migrate::resolve_with_report(&value);
    if resolution.shape.is_recognized() {
        Some(resolution.state)
    } else {
        tracing::warn!(
            code = %ErrorCode::StoreReadFailed,
            "async store holds no recognizable timesheet; ignoring it"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::time::Duration;

    fn backends(fast: &MemoryStore, blob: Option<&MemoryStore>) -> Backends {
        Backends {
            fast: Arc::new(fast.clone()),
            blob: blob.map(|b| Arc::new(b.clone()) as Arc<dyn BlobStore>),
            io_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn empty_stores_leave_status_idle() {
        let fast = MemoryStore::new();
        let session = Session::open(&StoreConfig::default(), backends(&fast, None)).await;
        assert!(session.state().is_empty());
        assert_eq!(session.status(), PersistStatus::Idle);
        assert!(!session.blob_available());
        session.close().await;
        assert_eq!(fast.writes(), 0);
    }

    #[tokio::test]
    async fn legacy_vacation_key_is_folded_at_load() {
        let fast = MemoryStore::new();
        fast.insert(
            FAST_STATE_KEY,
            r#"{"years":{"2025":{"months":{},"prevYearCarry":0}}}"#,
        );
        fast.insert(
            LEGACY_VACATION_KEY,
            r#"{"workdayHours":8,"systemRemainingHours":40,"rows":[{"id":"x","label":"old","days":-1}]}"#,
        );

        let session = Session::open(&StoreConfig::default(), backends(&fast, None)).await;
        let year = &session.state().years[&2025];
        assert_eq!(year.vac.rows.len(), 1);
        assert!((year.workday_hours - 8.0).abs() < f64::EPSILON);
        assert_eq!(session.status(), PersistStatus::Loaded);
        session.close().await;
    }

    #[tokio::test]
    async fn unchanged_update_schedules_nothing() {
        let fast = MemoryStore::new();
        let mut session = Session::open(&StoreConfig::default(), backends(&fast, None)).await;
        let result = session.update(|state| state.set_hours(2025, 0, 40, 8.0));
        assert!(result.is_err());
        session.close().await;
        assert_eq!(fast.writes(), 0);
    }

    #[tokio::test]
    async fn close_flushes_pending_change() {
        let fast = MemoryStore::new();
        let mut session = Session::open(&StoreConfig::default(), backends(&fast, None)).await;
        session
            .update(|state| state.set_hours(2025, 0, 2, 8.0))
            .expect("valid day");
        let status = session.close().await;
        assert_eq!(status, PersistStatus::Saved);
        assert_eq!(fast.writes(), 1);
    }
}
