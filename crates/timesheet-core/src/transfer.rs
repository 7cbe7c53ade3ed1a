//! Envelope serialization for persistence, export, and import.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::ImportError;
use crate::migrate::{self, Resolution};
use crate::model::{CURRENT_VERSION, TimesheetState};

/// What `import` does with input that matches no known layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportPolicy {
    /// Refuse and leave the current state alone.
    #[default]
    RefuseUnrecognized,
    /// Replace the current state with whatever the resolver produced, which
    /// is empty for unrecognized input.
    Replace,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a> {
    version: u32,
    updated_at: String,
    ts: &'a TimesheetState,
}

impl<'a> EnvelopeRef<'a> {
    fn new(ts: &'a TimesheetState, now: DateTime<Utc>) -> Self {
        Self {
            version: CURRENT_VERSION,
            updated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            ts,
        }
    }
}

/// Compact envelope bytes, as written to both stores.
pub fn encode_envelope(ts: &TimesheetState, now: DateTime<Utc>) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&EnvelopeRef::new(ts, now))
}

/// Pretty-printed envelope bytes for a downloadable export.
pub fn export_pretty(ts: &TimesheetState, now: DateTime<Utc>) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec_pretty(&EnvelopeRef::new(ts, now))
}

/// `timesheet-<timestamp>.json` with `:` and `.` replaced so the name is
/// portable across filesystems.
#[must_use]
pub fn export_file_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("timesheet-{stamp}.json")
}

/// Decode stored or imported bytes into an untyped value.
pub fn decode(bytes: &[u8]) -> serde_json::Result<Value> {
    serde_json::from_slice(bytes)
}

/// Decode and resolve import bytes under `policy`.
pub fn parse_import(bytes: &[u8], policy: ImportPolicy) -> Result<Resolution, ImportError> {
    let value = decode(bytes)?;
    let resolution = migrate::resolve_with_report(&value);
    if !resolution.shape.is_recognized() && policy == ImportPolicy::RefuseUnrecognized {
        return Err(ImportError::UnrecognizedShape(resolution.shape));
    }
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::Shape;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 12, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn export_file_name_has_no_colons_or_dots_in_stamp() {
        assert_eq!(
            export_file_name(fixed_now()),
            "timesheet-2025-09-01T12-30-00-000Z.json"
        );
    }

    #[test]
    fn export_is_pretty_and_compact_store_copy_is_not() {
        let state = TimesheetState::default();
        let pretty = export_pretty(&state, fixed_now()).expect("export");
        let compact = encode_envelope(&state, fixed_now()).expect("encode");
        assert!(pretty.contains(&b'\n'));
        assert!(!compact.contains(&b'\n'));
        assert_eq!(decode(&pretty).expect("json"), decode(&compact).expect("json"));
    }

    #[test]
    fn refuses_garbage_by_default() {
        assert!(matches!(
            parse_import(b"not json", ImportPolicy::Replace),
            Err(ImportError::Parse(_))
        ));
        assert!(matches!(
            parse_import(b"{\"hello\": 1}", ImportPolicy::RefuseUnrecognized),
            Err(ImportError::UnrecognizedShape(Shape::Unrecognized))
        ));
    }

    #[test]
    fn replace_policy_accepts_unrecognized_as_empty() {
        let resolution = parse_import(b"{\"hello\": 1}", ImportPolicy::Replace).expect("accepted");
        assert!(resolution.state.is_empty());
        assert_eq!(resolution.shape, Shape::Unrecognized);
    }
}
