//! Persistence coordinator.
//!
//! A [`Session`] owns the canonical state. Startup reads both stores through
//! the migration resolver; afterwards every change is handed to a background
//! writer that debounces bursts and writes the fast store, then the async
//! store, reporting health as a [`PersistStatus`].

pub mod debounce;
pub mod session;
pub mod status;
mod writer;

pub use debounce::Debounce;
pub use session::{BLOB_DIR, ImportReport, LOCAL_DIR, Session};
pub use status::PersistStatus;
pub use writer::{Backends, PersistStats};
