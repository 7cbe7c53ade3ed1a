//! timesheet-core library.
//!
//! Versioned persistence for a multi-year timesheet: the canonical
//! [`model`], the structural [`migrate`] resolver for older layouts, the
//! two [`storage`] backends, the [`persist`] coordinator, and envelope
//! [`transfer`] for export and import.

pub mod config;
pub mod error;
pub mod lock;
pub mod migrate;
pub mod model;
pub mod persist;
pub mod storage;
pub mod transfer;

pub use error::{ErrorCode, ImportError, StoreError};
pub use migrate::{Shape, resolve};
pub use model::{AppEnvelope, TimesheetState, VacationRow, VacationState, YearState};
pub use persist::{PersistStatus, Session};
pub use transfer::ImportPolicy;

/// Emit the library's startup trace line. Call once after installing a subscriber.
pub fn init() {
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "timesheet-core initialized");
}
