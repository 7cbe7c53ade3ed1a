//! Canonical in-memory schema for persisted timesheet data.
//!
//! The shapes here are the current generation. Older generations are only
//! recognized by [`crate::migrate`], which lifts them into these types.

pub mod calendar;
pub mod state;

pub use calendar::{days_in_month, is_weekend, parse_hours, parse_ym_key, ym_key};
pub use state::{
    CURRENT_VERSION, DEFAULT_VACATION_REMAINING_HOURS, DEFAULT_WORKDAY_HOURS, ModelError,
    MonthRecord, TimesheetState, VacationRow, VacationState, YEAR_RANGE, YearState,
    default_vacation_state, default_year_state,
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Top-level persisted and exported document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEnvelope {
    pub version: u32,
    /// RFC 3339 timestamp with millisecond precision, UTC.
    pub updated_at: String,
    pub ts: TimesheetState,
}

impl AppEnvelope {
    /// Wrap `ts` in a current-version envelope stamped with `now`.
    #[must_use]
    pub fn wrap(ts: TimesheetState, now: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_VERSION,
            updated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            ts,
        }
    }
}
