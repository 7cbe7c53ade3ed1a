use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Length of a working day when no historical value can be recovered.
pub const DEFAULT_WORKDAY_HOURS: f64 = 8.4;

/// Remaining vacation entitlement for a freshly created year.
pub const DEFAULT_VACATION_REMAINING_HOURS: f64 = 87.5;

/// Envelope version written by this build.
pub const CURRENT_VERSION: u32 = 2;

/// Inclusive range of year keys accepted in a [`TimesheetState`].
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1000..=9999;

/// Hours worked per day of a single month, sparse.
///
/// Keys are days of the month (1..=31). Absent days mean zero hours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthRecord(pub BTreeMap<u8, f64>);

impl MonthRecord {
    /// Hours booked on `day`, zero when absent.
    #[must_use]
    pub fn hours(&self, day: u8) -> f64 {
        self.0.get(&day).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn total_hours(&self) -> f64 {
        self.0.values().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One line of the vacation ledger.
///
/// `days` is negative for vacation taken and positive for grants or
/// adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VacationRow {
    pub id: String,
    pub label: String,
    pub days: f64,
}

impl VacationRow {
    /// Create a row with a fresh random identifier.
    #[must_use]
    pub fn new(label: impl Into<String>, days: f64) -> Self {
        Self {
            id: new_row_id(),
            label: label.into(),
            days,
        }
    }
}

/// Vacation entitlement and ledger for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationState {
    pub system_remaining_hours: f64,
    pub rows: Vec<VacationRow>,
}

impl Default for VacationState {
    fn default() -> Self {
        default_vacation_state()
    }
}

impl VacationState {
    /// Append a row and return its generated identifier.
    pub fn add_row(&mut self, label: impl Into<String>, days: f64) -> String {
        let row = VacationRow::new(label, days);
        let id = row.id.clone();
        self.rows.push(row);
        id
    }

    /// Remove the row with `id`. Returns the removed row, if any.
    pub fn remove_row(&mut self, id: &str) -> Option<VacationRow> {
        let pos = self.rows.iter().position(|row| row.id == id)?;
        Some(self.rows.remove(pos))
    }

    /// Net days across all ledger rows.
    #[must_use]
    pub fn booked_days(&self) -> f64 {
        self.rows.iter().map(|row| row.days).sum()
    }
}

/// Everything recorded for one calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearState {
    /// Month index (0..=11) to its day record.
    pub months: BTreeMap<u8, MonthRecord>,
    /// Overtime balance carried forward from the prior year.
    pub prev_year_carry: f64,
    pub workday_hours: f64,
    pub vac: VacationState,
}

impl Default for YearState {
    fn default() -> Self {
        default_year_state(0.0, None)
    }
}

impl YearState {
    /// Hours booked on `day` of `month0`, zero when absent.
    #[must_use]
    pub fn hours(&self, month0: u8, day: u8) -> f64 {
        self.months.get(&month0).map_or(0.0, |m| m.hours(day))
    }

    #[must_use]
    pub fn total_hours(&self) -> f64 {
        self.months.values().map(MonthRecord::total_hours).sum()
    }
}

/// The canonical in-memory timesheet: year to [`YearState`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimesheetState {
    pub years: BTreeMap<i32, YearState>,
}

/// Errors raised by mutation helpers when given out-of-range coordinates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("year {0} is outside {min}..={max}", min = YEAR_RANGE.start(), max = YEAR_RANGE.end())]
    InvalidYear(i32),
    #[error("month index {0} is outside 0..=11")]
    InvalidMonth(u8),
    #[error("day {day} does not exist in {year}-{month}", month = .month0 + 1)]
    InvalidDay { year: i32, month0: u8, day: u8 },
}

impl TimesheetState {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    #[must_use]
    pub fn year(&self, year: i32) -> Option<&YearState> {
        self.years.get(&year)
    }

    /// Return the year, creating it from `prev_year_carry` and `vac` when absent.
    ///
    /// An existing year is returned untouched; the arguments only seed a new one.
    pub fn ensure_year(
        &mut self,
        year: i32,
        prev_year_carry: f64,
        vac: Option<VacationState>,
    ) -> Result<&mut YearState, ModelError> {
        if !YEAR_RANGE.contains(&year) {
            return Err(ModelError::InvalidYear(year));
        }
        Ok(self
            .years
            .entry(year)
            .or_insert_with(|| default_year_state(prev_year_carry, vac)))
    }

    /// Return the year, creating a default one (zero carry) when absent.
    pub fn year_mut_or_default(&mut self, year: i32) -> Result<&mut YearState, ModelError> {
        self.ensure_year(year, 0.0, None)
    }

    /// Book `hours` on a day. Non-positive hours clear the day.
    pub fn set_hours(
        &mut self,
        year: i32,
        month0: u8,
        day: u8,
        hours: f64,
    ) -> Result<(), ModelError> {
        if month0 > 11 {
            return Err(ModelError::InvalidMonth(month0));
        }
        if day == 0 || u32::from(day) > super::days_in_month(year, month0) {
            return Err(ModelError::InvalidDay { year, month0, day });
        }

        let year_state = self.year_mut_or_default(year)?;
        if hours > 0.0 && hours.is_finite() {
            year_state
                .months
                .entry(month0)
                .or_default()
                .0
                .insert(day, hours);
        } else if let Some(month) = year_state.months.get_mut(&month0) {
            month.0.remove(&day);
            if month.is_empty() {
                year_state.months.remove(&month0);
            }
        }
        Ok(())
    }
}

/// A vacation state with the default entitlement and no ledger rows.
#[must_use]
pub const fn default_vacation_state() -> VacationState {
    VacationState {
        system_remaining_hours: DEFAULT_VACATION_REMAINING_HOURS,
        rows: Vec::new(),
    }
}

/// A year with no months, the given carry, the default workday, and either
/// `vac` or a default vacation state.
#[must_use]
pub fn default_year_state(prev_year_carry: f64, vac: Option<VacationState>) -> YearState {
    YearState {
        months: BTreeMap::new(),
        prev_year_carry,
        workday_hours: DEFAULT_WORKDAY_HOURS,
        vac: vac.unwrap_or_else(default_vacation_state),
    }
}

/// Eight lowercase base-36 characters.
fn new_row_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_year_uses_fixed_constants() {
        let year = default_year_state(-4.46, None);
        assert!(year.months.is_empty());
        assert!((year.prev_year_carry - -4.46).abs() < f64::EPSILON);
        assert!((year.workday_hours - DEFAULT_WORKDAY_HOURS).abs() < f64::EPSILON);
        assert!((year.vac.system_remaining_hours - 87.5).abs() < f64::EPSILON);
        assert!(year.vac.rows.is_empty());
    }

    #[test]
    fn default_year_keeps_supplied_vacation() {
        let vac = VacationState {
            system_remaining_hours: 12.0,
            rows: vec![VacationRow {
                id: "a".into(),
                label: "carryover".into(),
                days: 2.0,
            }],
        };
        let year = default_year_state(0.0, Some(vac.clone()));
        assert_eq!(year.vac, vac);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let mut state = TimesheetState::default();
        state.set_hours(2025, 0, 1, 8.4).expect("valid day");
        let json = serde_json::to_value(&state).expect("serialize");

        let year = &json["years"]["2025"];
        assert_eq!(year["months"]["0"]["1"], 8.4);
        assert!(year.get("prevYearCarry").is_some());
        assert!(year.get("workdayHours").is_some());
        assert!(year["vac"].get("systemRemainingHours").is_some());
    }

    #[test]
    fn set_hours_rejects_impossible_days() {
        let mut state = TimesheetState::default();
        assert_eq!(
            state.set_hours(2025, 1, 29, 8.0),
            Err(ModelError::InvalidDay {
                year: 2025,
                month0: 1,
                day: 29
            })
        );
        assert_eq!(state.set_hours(2025, 12, 1, 8.0), Err(ModelError::InvalidMonth(12)));
        assert!(state.set_hours(2024, 1, 29, 8.0).is_ok());
    }

    #[test]
    fn set_hours_zero_clears_day_and_empty_month() {
        let mut state = TimesheetState::default();
        state.set_hours(2025, 3, 2, 6.0).expect("set");
        state.set_hours(2025, 3, 2, 0.0).expect("clear");
        let year = state.year(2025).expect("year created");
        assert!(year.months.is_empty());
    }

    #[test]
    fn ensure_year_does_not_overwrite_existing() {
        let mut state = TimesheetState::default();
        state.ensure_year(2025, 3.0, None).expect("create");
        let year = state.ensure_year(2025, 99.0, None).expect("existing");
        assert!((year.prev_year_carry - 3.0).abs() < f64::EPSILON);
        assert_eq!(
            state.ensure_year(99, 0.0, None).map(|_| ()),
            Err(ModelError::InvalidYear(99))
        );
    }

    #[test]
    fn vacation_rows_add_and_remove() {
        let mut vac = default_vacation_state();
        let first = vac.add_row("carryover", 2.0);
        let second = vac.add_row("summer", -5.0);
        assert_ne!(first, second);
        assert_eq!(first.len(), 8);
        assert!((vac.booked_days() - -3.0).abs() < f64::EPSILON);

        let removed = vac.remove_row(&first).expect("row exists");
        assert_eq!(removed.label, "carryover");
        assert!(vac.remove_row(&first).is_none());
        assert_eq!(vac.rows.len(), 1);
    }
}
