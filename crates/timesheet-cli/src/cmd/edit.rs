//! `tsh set`, `tsh carry`, `tsh workday`: single-field edits of one year.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use timesheet_core::PersistStatus;
use timesheet_core::model::{ModelError, parse_hours};

use super::Context;
use crate::output::{hours, pretty_kv, render_mode};

/// Clap parser for an hours argument: `,` or `.` decimals, blank means zero.
pub fn hours_arg(raw: &str) -> Result<f64, String> {
    let normalized = raw.trim().replace(',', ".");
    if !normalized.is_empty() && normalized.parse::<f64>().is_err() {
        return Err(format!("'{raw}' is not a number of hours"));
    }
    Ok(parse_hours(raw))
}

#[derive(Args, Debug)]
pub struct SetArgs {
    pub year: i32,

    /// Month, 1-12.
    #[arg(value_parser = clap::value_parser!(u8).range(1..=12))]
    pub month: u8,

    pub day: u8,

    /// Hours worked. Zero or blank clears the day.
    #[arg(value_parser = hours_arg, allow_hyphen_values = true)]
    pub hours: f64,
}

#[derive(Args, Debug)]
pub struct CarryArgs {
    pub year: i32,

    /// Overtime balance carried in from the previous year (may be negative).
    #[arg(value_parser = hours_arg, allow_hyphen_values = true)]
    pub hours: f64,
}

#[derive(Args, Debug)]
pub struct WorkdayArgs {
    pub year: i32,

    /// Target hours of one workday.
    #[arg(value_parser = hours_arg)]
    pub hours: f64,
}

#[derive(Debug, Serialize)]
struct SetOutput {
    year: i32,
    month: u8,
    day: u8,
    hours: f64,
    month_total: f64,
    status: PersistStatus,
}

#[derive(Debug, Serialize)]
struct FieldOutput {
    year: i32,
    field: &'static str,
    value: f64,
    status: PersistStatus,
}

pub async fn run_set(args: &SetArgs, ctx: &Context) -> Result<()> {
    let month0 = args.month - 1;
    let (mut session, lock) = ctx.open_locked().await?;

    if let Err(err) = session.update(|state| state.set_hours(args.year, month0, args.day, args.hours)) {
        ctx.finish(session, lock).await;
        return ctx.reject_input(&err);
    }

    let month_total = session
        .state()
        .year(args.year)
        .and_then(|year| year.months.get(&month0))
        .map_or(0.0, |month| month.total_hours());
    let status = ctx.finish(session, lock).await;

    let result = SetOutput {
        year: args.year,
        month: args.month,
        day: args.day,
        hours: args.hours.max(0.0),
        month_total,
        status,
    };
    render_mode(
        ctx.output,
        &result,
        |r, w| writeln!(w, "{}-{}-{}\t{}\t{}", r.year, r.month, r.day, hours(r.hours), r.status),
        |r, w| {
            if r.hours > 0.0 {
                writeln!(w, "Booked {} h on {}-{:02}-{:02}", hours(r.hours), r.year, r.month, r.day)?;
            } else {
                writeln!(w, "Cleared {}-{:02}-{:02}", r.year, r.month, r.day)?;
            }
            pretty_kv(w, "Month total", hours(r.month_total))?;
            pretty_kv(w, "Persist", r.status.as_str())
        },
    )
}

pub async fn run_carry(args: &CarryArgs, ctx: &Context) -> Result<()> {
    run_field(ctx, args.year, "prevYearCarry", args.hours, |year, value| {
        year.prev_year_carry = value;
    })
    .await
}

pub async fn run_workday(args: &WorkdayArgs, ctx: &Context) -> Result<()> {
    if args.hours <= 0.0 {
        return ctx.reject_input_message("workday hours must be greater than zero");
    }
    run_field(ctx, args.year, "workdayHours", args.hours, |year, value| {
        year.workday_hours = value;
    })
    .await
}

async fn run_field(
    ctx: &Context,
    year: i32,
    field: &'static str,
    value: f64,
    apply: impl FnOnce(&mut timesheet_core::YearState, f64),
) -> Result<()> {
    let (mut session, lock) = ctx.open_locked().await?;
    let outcome: Result<(), ModelError> = session.update(|state| {
        let year_state = state.year_mut_or_default(year)?;
        apply(year_state, value);
        Ok(())
    });
    let status = ctx.finish(session, lock).await;
    if let Err(err) = outcome {
        return ctx.reject_input(&err);
    }

    let result = FieldOutput {
        year,
        field,
        value,
        status,
    };
    render_mode(
        ctx.output,
        &result,
        |r, w| writeln!(w, "{}\t{}\t{}\t{}", r.year, r.field, hours(r.value), r.status),
        |r, w| {
            writeln!(w, "Updated {} for {}", r.field, r.year)?;
            pretty_kv(w, r.field, hours(r.value))?;
            pretty_kv(w, "Persist", r.status.as_str())
        },
    )
}
