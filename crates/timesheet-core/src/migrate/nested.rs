//! Per-year layouts (H3, H4, current).

use serde_json::Value;
use std::collections::BTreeMap;

use super::Source;
use super::read::{self, Object};
use crate::model::{DEFAULT_WORKDAY_HOURS, TimesheetState, YEAR_RANGE, YearState};

/// `ts.years` is present.
pub(super) fn matches(src: &Source<'_>) -> bool {
    read::field(src.payload, "years").is_some()
}

/// Normalize every year. A year without its own `vac` receives the envelope's
/// top-level legacy `vac`; a year without `workdayHours` takes it from
/// whichever `vac` it ends up with.
pub(super) fn lift(src: &Source<'_>, skipped: &mut Vec<String>) -> TimesheetState {
    let mut years = BTreeMap::new();
    let Some(raw_years) = read::field(src.payload, "years") else {
        return TimesheetState::default();
    };

    for (key, raw) in raw_years {
        let Some(year) = parse_year(key) else {
            skipped.push(format!("years.{key}"));
            continue;
        };
        let Some(raw) = raw.as_object() else {
            skipped.push(format!("years.{key}"));
            continue;
        };
        years.insert(year, lift_year(raw, src.legacy_vac));
    }

    TimesheetState { years }
}

pub(super) fn lift_year(raw: &Object, global_vac: Option<&Object>) -> YearState {
    let vac_source = read::field(raw, "vac").or(global_vac);

    let workday_hours = read::number_field(raw, "workdayHours")
        .or_else(|| vac_source.and_then(|vac| read::number_field(vac, "workdayHours")))
        .unwrap_or(DEFAULT_WORKDAY_HOURS);

    YearState {
        months: read::nested_months(raw.get("months")),
        prev_year_carry: read::number_field(raw, "prevYearCarry").unwrap_or(0.0),
        workday_hours,
        vac: vac_source.map(read::vacation).unwrap_or_default(),
    }
}

/// Whether any year still keeps `workdayHours` inside its `vac` (H4).
pub(super) fn has_legacy_workday(src: &Source<'_>) -> bool {
    read::field(src.payload, "years").is_some_and(|years| {
        years.values().filter_map(Value::as_object).any(|year| {
            !year.contains_key("workdayHours")
                && read::field(year, "vac").is_some_and(|vac| vac.contains_key("workdayHours"))
        })
    })
}

fn parse_year(key: &str) -> Option<i32> {
    key.trim()
        .parse::<i32>()
        .ok()
        .filter(|year| YEAR_RANGE.contains(year))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lift_year_moves_vacation_workday_onto_year() {
        let raw = json!({
            "months": {"2": {"4": 7.5}},
            "prevYearCarry": 1.5,
            "vac": {"workdayHours": 8.0, "systemRemainingHours": 40, "rows": []}
        });
        let year = lift_year(raw.as_object().expect("object"), None);
        assert!((year.workday_hours - 8.0).abs() < f64::EPSILON);
        assert!((year.vac.system_remaining_hours - 40.0).abs() < f64::EPSILON);
        assert!((year.hours(2, 4) - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn own_workday_wins_over_vacation_workday() {
        let raw = json!({"workdayHours": 7.0, "vac": {"workdayHours": 8.0}});
        let year = lift_year(raw.as_object().expect("object"), None);
        assert!((year.workday_hours - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_year_requires_four_digits() {
        assert_eq!(parse_year("2025"), Some(2025));
        assert_eq!(parse_year("99"), None);
        assert_eq!(parse_year("20250"), None);
        assert_eq!(parse_year("twenty"), None);
    }
}
