//! Composite month keys, lenient hour parsing, and calendar arithmetic.

use chrono::{Datelike, NaiveDate, Weekday};

use super::state::YEAR_RANGE;

/// Composite `"<year>-<month 1-12>"` key used by the flat legacy layout.
///
/// `month0` is the in-memory month index (0..=11).
#[must_use]
pub fn ym_key(year: i32, month0: u8) -> String {
    format!("{year}-{}", u16::from(month0) + 1)
}

/// Parse a composite `"<year>-<month 1-12>"` key into `(year, month0)`.
///
/// Returns `None` for anything that is not a four-digit year followed by a
/// month number in 1..=12.
#[must_use]
pub fn parse_ym_key(key: &str) -> Option<(i32, u8)> {
    let (year_raw, month_raw) = key.split_once('-')?;
    let year: i32 = year_raw.trim().parse().ok()?;
    let month: u8 = month_raw.trim().parse().ok()?;
    if !YEAR_RANGE.contains(&year) || !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month - 1))
}

/// Parse user- or legacy-entered hours. Accepts `,` as the decimal separator.
///
/// Blank, unparseable, and non-finite input all read as zero.
#[must_use]
pub fn parse_hours(raw: &str) -> f64 {
    let normalized = raw.trim().replace(',', ".");
    if normalized.is_empty() {
        return 0.0;
    }
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Number of days in `month0` (0..=11) of `year`. Out-of-range input yields 0.
#[must_use]
pub fn days_in_month(year: i32, month0: u8) -> u32 {
    let month = u32::from(month0) + 1;
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.map_or(0, |next| {
        u32::try_from(next.signed_duration_since(first).num_days()).unwrap_or(0)
    })
}

/// Whether the given day falls on a Saturday or Sunday.
#[must_use]
pub fn is_weekend(year: i32, month0: u8, day: u8) -> bool {
    NaiveDate::from_ymd_opt(year, u32::from(month0) + 1, u32::from(day))
        .is_some_and(|date| matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
}
