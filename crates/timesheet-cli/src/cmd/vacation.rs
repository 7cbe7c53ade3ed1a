//! `tsh vacation`: per-year vacation ledger.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;
use timesheet_core::model::{ModelError, VacationRow};
use timesheet_core::{ErrorCode, PersistStatus};

use super::Context;
use super::edit::hours_arg;
use crate::output::{CliError, hours, pretty_kv, render_error, render_mode};

#[derive(Subcommand, Debug)]
pub enum VacationCommand {
    /// Append a ledger row. Negative days are vacation taken.
    Add(AddArgs),
    /// Remove a ledger row by id.
    Rm(RmArgs),
    /// Set the remaining entitlement reported by the HR system, in hours.
    Remaining(RemainingArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub year: i32,
    pub label: String,
    #[arg(value_parser = hours_arg, allow_hyphen_values = true)]
    pub days: f64,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    pub year: i32,
    pub id: String,
}

#[derive(Args, Debug)]
pub struct RemainingArgs {
    pub year: i32,
    #[arg(value_parser = hours_arg)]
    pub hours: f64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum VacationOutput {
    Added {
        year: i32,
        row: VacationRow,
        status: PersistStatus,
    },
    Removed {
        year: i32,
        row: VacationRow,
        status: PersistStatus,
    },
    Remaining {
        year: i32,
        system_remaining_hours: f64,
        status: PersistStatus,
    },
}

pub async fn run_vacation(command: &VacationCommand, ctx: &Context) -> Result<()> {
    let (mut session, lock) = ctx.open_locked().await?;

    let outcome: Result<Option<VacationOutput>, ModelError> = session.update(|state| {
        Ok(match command {
            VacationCommand::Add(args) => {
                let vac = &mut state.year_mut_or_default(args.year)?.vac;
                let id = vac.add_row(args.label.clone(), args.days);
                vac.rows.iter().find(|row| row.id == id).cloned().map(|row| {
                    VacationOutput::Added {
                        year: args.year,
                        row,
                        status: PersistStatus::Idle,
                    }
                })
            }
            VacationCommand::Rm(args) => state
                .years
                .get_mut(&args.year)
                .and_then(|year| year.vac.remove_row(&args.id))
                .map(|row| VacationOutput::Removed {
                    year: args.year,
                    row,
                    status: PersistStatus::Idle,
                }),
            VacationCommand::Remaining(args) => {
                let vac = &mut state.year_mut_or_default(args.year)?.vac;
                vac.system_remaining_hours = args.hours;
                Some(VacationOutput::Remaining {
                    year: args.year,
                    system_remaining_hours: args.hours,
                    status: PersistStatus::Idle,
                })
            }
        })
    });
    let persisted = ctx.finish(session, lock).await;

    let result = match outcome {
        Err(err) => return ctx.reject_input(&err),
        Ok(None) => {
            let VacationCommand::Rm(args) = command else {
                anyhow::bail!("vacation update produced no result");
            };
            let msg = format!("no vacation row '{}' in {}", args.id, args.year);
            render_error(
                ctx.output,
                &CliError::with_details(
                    &msg,
                    format!("List row ids with `tsh show --year {}`", args.year),
                    ErrorCode::InvalidInput,
                ),
            )?;
            anyhow::bail!("{msg}");
        }
        Ok(Some(result)) => result.with_status(persisted),
    };

    render_mode(ctx.output, &result, render_text, render_pretty)
}

impl VacationOutput {
    fn with_status(mut self, persisted: PersistStatus) -> Self {
        match &mut self {
            Self::Added { status, .. }
            | Self::Removed { status, .. }
            | Self::Remaining { status, .. } => *status = persisted,
        }
        self
    }
}

fn render_text(out: &VacationOutput, w: &mut dyn Write) -> std::io::Result<()> {
    match out {
        VacationOutput::Added { year, row, status } => {
            writeln!(w, "added\t{year}\t{}\t{}\t{}\t{status}", row.id, row.label, row.days)
        }
        VacationOutput::Removed { year, row, status } => {
            writeln!(w, "removed\t{year}\t{}\t{status}", row.id)
        }
        VacationOutput::Remaining {
            year,
            system_remaining_hours,
            status,
        } => writeln!(w, "remaining\t{year}\t{}\t{status}", hours(*system_remaining_hours)),
    }
}

fn render_pretty(out: &VacationOutput, w: &mut dyn Write) -> std::io::Result<()> {
    match out {
        VacationOutput::Added { year, row, status } => {
            writeln!(w, "Added vacation row to {year}")?;
            pretty_kv(w, "Id", &row.id)?;
            pretty_kv(w, "Label", &row.label)?;
            pretty_kv(w, "Days", row.days.to_string())?;
            pretty_kv(w, "Persist", status.as_str())
        }
        VacationOutput::Removed { year, row, status } => {
            writeln!(w, "Removed '{}' ({}) from {year}", row.label, row.id)?;
            pretty_kv(w, "Persist", status.as_str())
        }
        VacationOutput::Remaining {
            year,
            system_remaining_hours,
            status,
        } => {
            writeln!(w, "Updated remaining vacation for {year}")?;
            pretty_kv(w, "Remaining", format!("{} h", hours(*system_remaining_hours)))?;
            pretty_kv(w, "Persist", status.as_str())
        }
    }
}
