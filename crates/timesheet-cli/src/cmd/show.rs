//! `tsh show`: read-only summaries of the stored timesheet.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use timesheet_core::model::{VacationRow, YearState, is_weekend, ym_key};

use super::Context;
use crate::output::{CliError, hours, pretty_kv, pretty_section, render_error, render_mode};
use timesheet_core::ErrorCode;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Show one year in detail instead of the per-year overview.
    #[arg(long)]
    pub year: Option<i32>,
}

#[derive(Debug, Serialize)]
struct YearRow {
    year: i32,
    months: usize,
    total_hours: f64,
    prev_year_carry: f64,
    workday_hours: f64,
}

#[derive(Debug, Serialize)]
struct MonthView {
    /// 1-12.
    month: u8,
    key: String,
    days: usize,
    weekend_days: usize,
    total_hours: f64,
}

#[derive(Debug, Serialize)]
struct VacationView {
    system_remaining_hours: f64,
    system_remaining_days: f64,
    booked_days: f64,
    rows: Vec<VacationRow>,
}

#[derive(Debug, Serialize)]
struct YearView {
    year: i32,
    workday_hours: f64,
    prev_year_carry: f64,
    total_hours: f64,
    months: Vec<MonthView>,
    vacation: VacationView,
}

impl YearView {
    fn build(year: i32, state: &YearState) -> Self {
        let months = state
            .months
            .iter()
            .map(|(&month0, record)| MonthView {
                month: month0 + 1,
                key: ym_key(year, month0),
                days: record.0.len(),
                weekend_days: record
                    .0
                    .keys()
                    .filter(|&&day| is_weekend(year, month0, day))
                    .count(),
                total_hours: record.total_hours(),
            })
            .collect();

        let system_remaining_days = if state.workday_hours > 0.0 {
            state.vac.system_remaining_hours / state.workday_hours
        } else {
            0.0
        };

        Self {
            year,
            workday_hours: state.workday_hours,
            prev_year_carry: state.prev_year_carry,
            total_hours: state.total_hours(),
            months,
            vacation: VacationView {
                system_remaining_hours: state.vac.system_remaining_hours,
                system_remaining_days,
                booked_days: state.vac.booked_days(),
                rows: state.vac.rows.clone(),
            },
        }
    }
}

pub async fn run_show(args: &ShowArgs, ctx: &Context) -> Result<()> {
    let session = ctx.open().await;
    let state = session.state().clone();
    session.close().await;

    if let Some(year) = args.year {
        let Some(year_state) = state.year(year) else {
            let msg = format!("no data recorded for {year}");
            render_error(
                ctx.output,
                &CliError::with_details(
                    &msg,
                    "Run `tsh show` to list the years on record",
                    ErrorCode::InvalidInput,
                ),
            )?;
            anyhow::bail!("{msg}");
        };
        let view = YearView::build(year, year_state);
        return render_mode(ctx.output, &view, render_year_text, render_year_pretty);
    }

    let rows: Vec<YearRow> = state
        .years
        .iter()
        .map(|(&year, y)| YearRow {
            year,
            months: y.months.len(),
            total_hours: y.total_hours(),
            prev_year_carry: y.prev_year_carry,
            workday_hours: y.workday_hours,
        })
        .collect();

    render_mode(
        ctx.output,
        &rows,
        |rows, w| {
            for r in rows {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    r.year,
                    r.months,
                    hours(r.total_hours),
                    hours(r.prev_year_carry),
                    hours(r.workday_hours)
                )?;
            }
            Ok(())
        },
        |rows, w| {
            if rows.is_empty() {
                return writeln!(w, "No timesheet data yet. Start with `tsh set`.");
            }
            pretty_section(w, "Year   Months   Total h   Carry h   Workday h")?;
            for r in rows {
                writeln!(
                    w,
                    "{:<6} {:>6} {:>9} {:>9} {:>11}",
                    r.year,
                    r.months,
                    hours(r.total_hours),
                    hours(r.prev_year_carry),
                    hours(r.workday_hours)
                )?;
            }
            Ok(())
        },
    )
}

fn render_year_text(view: &YearView, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "year\t{}\tworkday\t{}\tcarry\t{}\ttotal\t{}",
        view.year,
        hours(view.workday_hours),
        hours(view.prev_year_carry),
        hours(view.total_hours)
    )?;
    for m in &view.months {
        writeln!(w, "month\t{}\t{}\t{}", m.key, m.days, hours(m.total_hours))?;
    }
    writeln!(
        w,
        "vacation\t{}\t{}",
        hours(view.vacation.system_remaining_hours),
        view.vacation.booked_days
    )?;
    for row in &view.vacation.rows {
        writeln!(w, "row\t{}\t{}\t{}", row.id, row.label, row.days)?;
    }
    Ok(())
}

fn render_year_pretty(view: &YearView, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Timesheet {}", view.year))?;
    pretty_kv(w, "Workday", format!("{} h", hours(view.workday_hours)))?;
    pretty_kv(w, "Carry-in", format!("{} h", hours(view.prev_year_carry)))?;
    pretty_kv(w, "Booked", format!("{} h", hours(view.total_hours)))?;
    writeln!(w)?;

    pretty_section(w, "Month   Days   Weekend   Hours")?;
    for m in &view.months {
        writeln!(
            w,
            "{:<7} {:>4} {:>9} {:>7}",
            m.month,
            m.days,
            m.weekend_days,
            hours(m.total_hours)
        )?;
    }
    writeln!(w)?;

    pretty_section(w, "Vacation")?;
    pretty_kv(
        w,
        "HR remaining",
        format!(
            "{} h ({:.1} days)",
            hours(view.vacation.system_remaining_hours),
            view.vacation.system_remaining_days
        ),
    )?;
    pretty_kv(w, "Ledger", format!("{} days", view.vacation.booked_days))?;
    for row in &view.vacation.rows {
        writeln!(w, "  {:<10} {:>6}  {}", row.id, row.days, row.label)?;
    }
    Ok(())
}
