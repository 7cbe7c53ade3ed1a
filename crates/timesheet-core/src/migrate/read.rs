//! Lenient readers over untyped JSON.
//!
//! Historical payloads were written by several generations of the app, some
//! of which stored numbers as strings or left fields `null`. These readers
//! never fail: anything unreadable becomes `None` or is skipped.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{DEFAULT_VACATION_REMAINING_HOURS, MonthRecord, VacationRow, VacationState};

pub type Object = Map<String, Value>;

pub fn object(value: &Value) -> Option<&Object> {
    value.as_object()
}

pub fn field<'a>(obj: &'a Object, name: &str) -> Option<&'a Object> {
    obj.get(name).and_then(Value::as_object)
}

/// A finite number, or a string holding one (either decimal separator).
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let normalized = s.trim().replace(',', ".");
            normalized.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

pub fn number_field(obj: &Object, name: &str) -> Option<f64> {
    obj.get(name).and_then(number)
}

/// Day-of-month map. Keys outside 1..=31 and unreadable hours are dropped.
pub fn month_record(value: &Value) -> MonthRecord {
    let mut days = BTreeMap::new();
    if let Some(obj) = object(value) {
        for (key, hours) in obj {
            let Some(day) = key.trim().parse::<u8>().ok().filter(|d| (1..=31).contains(d)) else {
                continue;
            };
            if let Some(hours) = number(hours) {
                days.insert(day, hours);
            }
        }
    }
    MonthRecord(days)
}

/// Month-index map as stored under a nested year. Keys outside 0..=11 are dropped.
pub fn nested_months(value: Option<&Value>) -> BTreeMap<u8, MonthRecord> {
    let mut months = BTreeMap::new();
    if let Some(obj) = value.and_then(object) {
        for (key, month) in obj {
            if let Some(month0) = key.trim().parse::<u8>().ok().filter(|m| *m <= 11) {
                months.insert(month0, month_record(month));
            }
        }
    }
    months
}

/// Vacation state from any generation. `workdayHours`, if present, is ignored
/// here; callers lift it onto the year.
pub fn vacation(obj: &Object) -> VacationState {
    let rows = obj
        .get("rows")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .map(vacation_rows)
        .unwrap_or_default();

    VacationState {
        system_remaining_hours: number_field(obj, "systemRemainingHours")
            .unwrap_or(DEFAULT_VACATION_REMAINING_HOURS),
        rows,
    }
}

/// Rows keep whatever string id they carry, empty included. Rows without a
/// usable id get `row-N`, unique among the ids already present.
fn vacation_rows(values: &[Value]) -> Vec<VacationRow> {
    let mut rows: Vec<(VacationRow, bool)> = values.iter().filter_map(vacation_row).collect();
    let mut taken: BTreeSet<String> = rows
        .iter()
        .filter(|(_, has_id)| *has_id)
        .map(|(row, _)| row.id.clone())
        .collect();

    let mut next = 0usize;
    for (row, has_id) in &mut rows {
        if *has_id {
            continue;
        }
        loop {
            let candidate = format!("row-{next}");
            next += 1;
            if taken.insert(candidate.clone()) {
                row.id = candidate;
                break;
            }
        }
    }
    rows.into_iter().map(|(row, _)| row).collect()
}

fn vacation_row(value: &Value) -> Option<(VacationRow, bool)> {
    let obj = object(value)?;
    let id = match obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let label = obj
        .get("label")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let has_id = id.is_some();
    Some((
        VacationRow {
            id: id.unwrap_or_default(),
            label,
            days: number_field(obj, "days").unwrap_or(0.0),
        },
        has_id,
    ))
}
