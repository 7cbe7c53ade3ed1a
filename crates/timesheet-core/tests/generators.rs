use proptest::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;
use timesheet_core::model::{MonthRecord, TimesheetState, VacationRow, VacationState, YearState};

pub fn arb_hours() -> impl Strategy<Value = f64> + Clone {
    -24.0f64..24.0
}

pub fn arb_month() -> impl Strategy<Value = MonthRecord> + Clone {
    prop::collection::btree_map(1u8..=31, arb_hours(), 0..10).prop_map(MonthRecord)
}

pub fn arb_row() -> impl Strategy<Value = VacationRow> + Clone {
    ("[a-z0-9]{0,8}", "[ -~]{0,16}", -30.0f64..30.0)
        .prop_map(|(id, label, days)| VacationRow { id, label, days })
}

pub fn arb_vacation() -> impl Strategy<Value = VacationState> + Clone {
    (0.0f64..400.0, prop::collection::vec(arb_row(), 0..5)).prop_map(
        |(system_remaining_hours, rows)| VacationState {
            system_remaining_hours,
            rows,
        },
    )
}

pub fn arb_year() -> impl Strategy<Value = YearState> + Clone {
    (
        prop::collection::btree_map(0u8..12, arb_month(), 0..12),
        -200.0f64..200.0,
        1.0f64..12.0,
        arb_vacation(),
    )
        .prop_map(|(months, prev_year_carry, workday_hours, vac)| YearState {
            months,
            prev_year_carry,
            workday_hours,
            vac,
        })
}

/// Any state the application itself could have written.
pub fn arb_state() -> impl Strategy<Value = TimesheetState> + Clone {
    prop::collection::btree_map(1990i32..2100, arb_year(), 0..4)
        .prop_map(|years: BTreeMap<i32, YearState>| TimesheetState { years })
}

/// Arbitrary JSON, including objects that happen to use the real field names.
pub fn arb_json() -> impl Strategy<Value = Value> {
    let key = prop_oneof![
        Just("ts".to_string()),
        Just("vac".to_string()),
        Just("years".to_string()),
        Just("months".to_string()),
        Just("rows".to_string()),
        Just("2025".to_string()),
        Just("2025-9".to_string()),
        "[a-z0-9-]{0,6}",
    ];
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(Value::from),
        "[ -~]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 6, move |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map(key.clone(), inner, 0..6)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}
