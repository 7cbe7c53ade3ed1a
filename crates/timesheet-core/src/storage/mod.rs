//! Storage backends.
//!
//! Two independent key/blob stores back every session:
//!
//! - a **fast store** ([`FastStore`]): synchronous, capacity-bounded, always
//!   present, read and written first;
//! - an **async store** ([`BlobStore`]): larger, feature-detected at startup,
//!   read second and authoritative when it has data.
//!
//! Neither backend knows about the timesheet schema; both move opaque bytes.

pub mod blob;
pub mod local;
pub mod memory;

pub use blob::FileBlobStore;
pub use local::LocalStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;

/// Fast-store key holding the current envelope.
pub const FAST_STATE_KEY: &str = "timesheet_state_vue";

/// Fast-store key once used for a separate vacation payload. Read-only.
pub const LEGACY_VACATION_KEY: &str = "timesheet_vacation_vue";

/// Name of the single blob the async store keeps.
pub const BLOB_NAME: &str = "app-data.json";

/// Synchronous, size-limited key/value store.
pub trait FastStore: Send + Sync {
    /// Bytes stored under `key`, or `None` when the key was never written.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Asynchronous, larger-capacity named blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// [`BlobStore::read`] that gives up after `limit`.
pub async fn read_bounded(
    store: &dyn BlobStore,
    name: &str,
    limit: Duration,
) -> Result<Option<Vec<u8>>, StoreError> {
    tokio::time::timeout(limit, store.read(name))
        .await
        .map_err(|_| StoreError::Timeout {
            op: "blob read",
            waited: limit,
        })?
}

/// [`BlobStore::write`] that gives up after `limit`.
pub async fn write_bounded(
    store: &dyn BlobStore,
    name: &str,
    bytes: &[u8],
    limit: Duration,
) -> Result<(), StoreError> {
    tokio::time::timeout(limit, store.write(name, bytes))
        .await
        .map_err(|_| StoreError::Timeout {
            op: "blob write",
            waited: limit,
        })?
}

/// Keys map to file names, so only a conservative character set is allowed.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
