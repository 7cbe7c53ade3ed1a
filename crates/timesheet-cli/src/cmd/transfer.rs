//! `tsh export` and `tsh import`.

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use timesheet_core::ImportPolicy;
use timesheet_core::persist::ImportReport;
use timesheet_core::transfer::export_file_name;

use super::Context;
use crate::output::{CliError, pretty_kv, render_error, render_mode};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// File to write, or a directory to place a timestamped export in.
    /// Defaults to stdout.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Export file from any version of the app.
    pub file: PathBuf,

    /// Replace current data even if the file matches no known layout.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct ExportOutput {
    path: PathBuf,
    bytes: usize,
    years: usize,
}

pub async fn run_export(args: &ExportArgs, ctx: &Context) -> Result<()> {
    let session = ctx.open().await;
    let bytes = session.export().context("failed to serialize timesheet export")?;
    let years = session.state().years.len();
    session.close().await;

    let Some(target) = args.output.as_deref() else {
        let mut out = std::io::stdout().lock();
        out.write_all(&bytes)?;
        writeln!(out)?;
        return Ok(());
    };

    let path = export_target(target, chrono::Utc::now());
    std::fs::write(&path, &bytes)
        .with_context(|| format!("failed to write export to {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "timesheet exported");

    let result = ExportOutput {
        path,
        bytes: bytes.len(),
        years,
    };
    render_mode(
        ctx.output,
        &result,
        |r, w| writeln!(w, "{}", r.path.display()),
        |r, w| {
            writeln!(w, "Exported {} year(s)", r.years)?;
            pretty_kv(w, "File", r.path.display().to_string())?;
            pretty_kv(w, "Size", format!("{} bytes", r.bytes))
        },
    )
}

/// An existing directory receives a timestamped file; anything else is the file itself.
fn export_target(target: &Path, now: chrono::DateTime<chrono::Utc>) -> PathBuf {
    if target.is_dir() {
        target.join(export_file_name(now))
    } else {
        target.to_path_buf()
    }
}

pub async fn run_import(args: &ImportArgs, ctx: &Context) -> Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let policy = if args.force {
        ImportPolicy::Replace
    } else {
        ImportPolicy::RefuseUnrecognized
    };

    let (mut session, lock) = ctx.open_locked().await?;
    let outcome = session.import(&bytes, policy).await;
    ctx.finish(session, lock).await;

    let report: ImportReport = match outcome {
        Ok(report) => report,
        Err(err) => {
            render_error(ctx.output, &CliError::coded(err.to_string(), err.code()))?;
            anyhow::bail!("{err}");
        }
    };

    render_mode(
        ctx.output,
        &report,
        |r, w| writeln!(w, "{}\t{}\t{}\t{}", r.shape, r.years, r.skipped.len(), r.status),
        |r, w| {
            writeln!(w, "Imported {}", args.file.display())?;
            pretty_kv(w, "Layout", r.shape.as_str())?;
            pretty_kv(w, "Years", r.years.to_string())?;
            if !r.skipped.is_empty() {
                pretty_kv(w, "Skipped keys", r.skipped.join(", "))?;
            }
            pretty_kv(w, "Persist", r.status.as_str())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn directory_target_gets_timestamped_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let now = chrono::Utc
            .with_ymd_and_hms(2025, 9, 1, 12, 30, 0)
            .single()
            .expect("valid timestamp");

        let path = export_target(dir.path(), now);
        assert_eq!(path, dir.path().join("timesheet-2025-09-01T12-30-00-000Z.json"));

        let file = dir.path().join("backup.json");
        assert_eq!(export_target(&file, now), file);
    }
}
