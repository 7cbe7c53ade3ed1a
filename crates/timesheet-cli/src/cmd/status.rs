//! `tsh status`: where data lives and whether the stores are healthy.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use timesheet_core::PersistStatus;
use timesheet_core::persist::{BLOB_DIR, LOCAL_DIR};

use super::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Debug, Serialize)]
struct StatusOutput {
    data_dir: PathBuf,
    fast_store: PathBuf,
    blob_store: Option<PathBuf>,
    status: PersistStatus,
    years: usize,
    debounce_ms: u64,
    io_timeout_ms: u64,
    fast_quota_bytes: u64,
}

pub async fn run_status(ctx: &Context) -> Result<()> {
    let session = ctx.open().await;
    let result = StatusOutput {
        data_dir: ctx.data_dir.clone(),
        fast_store: ctx.data_dir.join(LOCAL_DIR),
        blob_store: session
            .blob_available()
            .then(|| ctx.data_dir.join(BLOB_DIR)),
        status: session.status(),
        years: session.state().years.len(),
        debounce_ms: ctx.config.persist.debounce_ms,
        io_timeout_ms: ctx.config.persist.io_timeout_ms,
        fast_quota_bytes: ctx.config.storage.fast_quota_bytes,
    };
    session.close().await;

    render_mode(
        ctx.output,
        &result,
        |r, w| {
            writeln!(w, "data_dir\t{}", r.data_dir.display())?;
            writeln!(w, "status\t{}", r.status)?;
            writeln!(w, "years\t{}", r.years)?;
            writeln!(
                w,
                "blob_store\t{}",
                r.blob_store
                    .as_ref()
                    .map_or_else(|| "unavailable".to_string(), |p| p.display().to_string())
            )
        },
        |r, w| {
            pretty_section(w, "Timesheet storage")?;
            pretty_kv(w, "Data dir", r.data_dir.display().to_string())?;
            pretty_kv(w, "Fast store", r.fast_store.display().to_string())?;
            pretty_kv(
                w,
                "Async store",
                r.blob_store
                    .as_ref()
                    .map_or_else(|| "unavailable".to_string(), |p| p.display().to_string()),
            )?;
            pretty_kv(w, "Status", r.status.as_str())?;
            pretty_kv(w, "Years", r.years.to_string())?;
            pretty_kv(w, "Debounce", format!("{} ms", r.debounce_ms))?;
            pretty_kv(w, "I/O timeout", format!("{} ms", r.io_timeout_ms))?;
            pretty_kv(w, "Fast quota", format!("{} bytes", r.fast_quota_bytes))
        },
    )
}
