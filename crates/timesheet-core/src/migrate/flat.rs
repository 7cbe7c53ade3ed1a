//! Flat `"<year>-<month>"` layout (H1, H2).
//!
//! Each flat bundle is regrouped into the per-year layout and then handed to
//! the nested migrator, so the flat path only has to partition keys.

use serde_json::{Value, json};
use std::collections::BTreeMap;

use super::read::{self, Object};
use super::{Source, nested};
use crate::model::{TimesheetState, parse_ym_key};

/// A flat `months` mapping sits directly in the payload.
pub(super) fn matches(src: &Source<'_>) -> bool {
    read::field(src.payload, "months").is_some()
}

pub(super) fn lift(src: &Source<'_>, skipped: &mut Vec<String>) -> TimesheetState {
    let Some(flat_months) = read::field(src.payload, "months") else {
        return TimesheetState::default();
    };

    let mut grouped: BTreeMap<i32, BTreeMap<u8, Object>> = BTreeMap::new();
    for (key, days) in flat_months {
        let Some((year, month0)) = parse_ym_key(key) else {
            skipped.push(format!("months.{key}"));
            continue;
        };
        let month = grouped.entry(year).or_default().entry(month0).or_default();
        if let Some(days) = days.as_object() {
            month.extend(days.iter().map(|(day, hours)| (day.clone(), hours.clone())));
        }
    }

    // One carry for the whole bundle; every derived year gets a copy.
    let carry = src
        .payload
        .get("prevYearCarry")
        .cloned()
        .unwrap_or_else(|| json!(0));
    let vac = src.legacy_vac.or_else(|| read::field(src.payload, "vac"));

    let years = grouped
        .into_iter()
        .map(|(year, months)| {
            let months: Object = months
                .into_iter()
                .map(|(month0, days)| (month0.to_string(), Value::Object(days)))
                .collect();
            let mut raw = Object::new();
            raw.insert("months".into(), Value::Object(months));
            raw.insert("prevYearCarry".into(), carry.clone());
            (year, nested::lift_year(&raw, vac))
        })
        .collect();

    TimesheetState { years }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lift_value(value: &Value) -> (TimesheetState, Vec<String>) {
        let src = Source::locate(value).expect("object input");
        let mut skipped = Vec::new();
        (lift(&src, &mut skipped), skipped)
    }

    #[test]
    fn partitions_keys_by_year() {
        let value = json!({
            "months": {"2024-12": {"31": 4}, "2025-1": {"2": 8}, "2025-2": {"3": 6}},
            "prevYearCarry": 2.5
        });
        let (state, skipped) = lift_value(&value);
        assert!(skipped.is_empty());
        assert_eq!(state.years.len(), 2);
        assert_eq!(state.years[&2025].months.len(), 2);
        assert!((state.years[&2024].prev_year_carry - 2.5).abs() < f64::EPSILON);
        assert!((state.years[&2025].prev_year_carry - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn duplicate_spellings_of_one_month_merge() {
        let value = json!({"months": {"2025-9": {"1": 8}, "2025-09": {"2": 4}}});
        let (state, _) = lift_value(&value);
        let month = &state.years[&2025].months[&8];
        assert_eq!(month.0.len(), 2);
    }

    #[test]
    fn malformed_keys_are_reported_not_fatal() {
        let value = json!({"months": {"2025-9": {"1": 8}, "not-a-key": {"1": 3}}});
        let (state, skipped) = lift_value(&value);
        assert_eq!(state.years.len(), 1);
        assert_eq!(skipped, vec!["months.not-a-key".to_string()]);
    }
}
