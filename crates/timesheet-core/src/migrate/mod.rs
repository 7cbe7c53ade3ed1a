//! Structural migration of stored timesheet data.
//!
//! Stored and imported documents may come from any of five schema
//! generations, and their `version` tags cannot be trusted. The resolver
//! therefore inspects the *shape* of a decoded JSON value and walks an
//! ordered chain of `(predicate, migrator)` steps until one matches:
//!
//! | Generation | Shape |
//! |------------|-------|
//! | H1 | `ts.months["YYYY-M"]` + one global `prevYearCarry` |
//! | H2 | H1 with a sibling top-level `vac` |
//! | H3 | `ts.years[Y]` with per-year `vac`, legacy top-level `vac` may remain |
//! | H4 | H3 with `workdayHours` inside `vac` |
//! | H5 | current: `workdayHours` on the year, `vac` holds hours and rows |
//!
//! Resolution is total (anything unrecognized becomes an empty state) and
//! idempotent (a current-generation tree resolves to itself).

mod flat;
mod nested;
mod read;

use serde::Serialize;
use serde_json::Value;

use crate::model::TimesheetState;
use read::Object;

/// The generation a decoded value was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// H1: flat composite month keys, no vacation data.
    FlatMonths,
    /// H2: flat composite month keys with a sibling `vac`.
    FlatWithVacation,
    /// H3: nested years plus a legacy top-level `vac`.
    NestedWithGlobalVacation,
    /// H4: nested years with `workdayHours` still inside `vac`.
    NestedLegacyWorkday,
    /// H5: the current layout.
    Current,
    Unrecognized,
}

impl Shape {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FlatMonths => "flat_months",
            Self::FlatWithVacation => "flat_with_vacation",
            Self::NestedWithGlobalVacation => "nested_with_global_vacation",
            Self::NestedLegacyWorkday => "nested_legacy_workday",
            Self::Current => "current",
            Self::Unrecognized => "unrecognized",
        }
    }

    #[must_use]
    pub const fn is_recognized(self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one decoded value.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub state: TimesheetState,
    pub shape: Shape,
    /// Keys that could not be interpreted and were dropped, e.g. `months.not-a-key`.
    pub skipped: Vec<String>,
}

/// Where the timesheet payload and any legacy top-level `vac` live.
pub(crate) struct Source<'a> {
    payload: &'a Object,
    legacy_vac: Option<&'a Object>,
}

impl<'a> Source<'a> {
    /// The payload is `ts` when present, otherwise the value itself (older
    /// fast-store entries held the bare payload).
    fn locate(value: &'a Value) -> Option<Self> {
        let root = value.as_object()?;
        Some(Self {
            payload: read::field(root, "ts").unwrap_or(root),
            legacy_vac: read::field(root, "vac"),
        })
    }
}

type Predicate = fn(&Source<'_>) -> bool;
type Migrator = fn(&Source<'_>, &mut Vec<String>) -> TimesheetState;

/// Most distinguishing structure first.
const CHAIN: [(Predicate, Migrator); 2] = [
    (nested::matches, nested::lift),
    (flat::matches, flat::lift),
];

/// Classify a decoded value without migrating it.
#[must_use]
pub fn classify(value: &Value) -> Shape {
    let Some(src) = Source::locate(value) else {
        return Shape::Unrecognized;
    };

    if nested::matches(&src) {
        if src.legacy_vac.is_some() {
            Shape::NestedWithGlobalVacation
        } else if nested::has_legacy_workday(&src) {
            Shape::NestedLegacyWorkday
        } else {
            Shape::Current
        }
    } else if flat::matches(&src) {
        if src.legacy_vac.is_some() {
            Shape::FlatWithVacation
        } else {
            Shape::FlatMonths
        }
    } else {
        Shape::Unrecognized
    }
}

/// Lift any recognized generation to the canonical state.
#[must_use]
pub fn resolve(value: &Value) -> TimesheetState {
    resolve_with_report(value).state
}

/// Like [`resolve`], also reporting the detected shape and dropped keys.
#[must_use]
pub fn resolve_with_report(value: &Value) -> Resolution {
    let shape = classify(value);
    let mut skipped = Vec::new();

    let state = Source::locate(value)
        .and_then(|src| {
            CHAIN
                .iter()
                .find(|(matches, _)| matches(&src))
                .map(|(_, lift)| lift(&src, &mut skipped))
        })
        .unwrap_or_default();

    if skipped.is_empty() {
        tracing::debug!(shape = %shape, years = state.years.len(), "resolved timesheet payload");
    } else {
        tracing::warn!(
            shape = %shape,
            years = state.years.len(),
            skipped = ?skipped,
            "resolved timesheet payload with unreadable keys dropped"
        );
    }

    Resolution {
        state,
        shape,
        skipped,
    }
}

/// Attach a separately stored legacy vacation payload as a top-level `vac`.
///
/// An existing top-level `vac` is left alone. Non-object inputs pass through.
#[must_use]
pub fn with_legacy_vacation(primary: Value, vac: Value) -> Value {
    if !vac.is_object() {
        return primary;
    }
    match primary {
        Value::Object(mut root) if root.contains_key("ts") => {
            root.entry("vac").or_insert(vac);
            Value::Object(root)
        }
        Value::Object(root) if root.contains_key("vac") => Value::Object(root),
        Value::Object(root) => {
            let mut wrapped = Object::new();
            wrapped.insert("ts".into(), Value::Object(root));
            wrapped.insert("vac".into(), vac);
            Value::Object(wrapped)
        }
        other => other,
    }
}
