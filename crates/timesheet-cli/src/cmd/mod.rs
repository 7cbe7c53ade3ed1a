pub mod completions;
pub mod edit;
pub mod show;
pub mod status;
pub mod transfer;
pub mod vacation;

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use timesheet_core::config::{self, StoreConfig};
use timesheet_core::lock::DataDirLock;
use timesheet_core::model::ModelError;
use timesheet_core::{ErrorCode, PersistStatus, Session};

use crate::output::{CliError, OutputMode, render_error};

/// How long a mutating command waits for another `tsh` to release the data dir.
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub data_dir: PathBuf,
    pub config: StoreConfig,
    pub output: OutputMode,
}

impl Context {
    /// Resolve the data directory, load its config, and pick the output mode.
    pub fn resolve(data_dir_flag: Option<&Path>, json: bool) -> Result<Self> {
        let data_dir = config::resolve_data_dir(data_dir_flag);
        let config = config::load_config(&data_dir)?;
        let output = OutputMode::from_resolved(config::resolve_output(json, &config));
        Ok(Self {
            data_dir,
            config,
            output,
        })
    }

    /// Open a session for reading. No lock is taken and nothing is written.
    pub async fn open(&self) -> Session {
        Session::open_dir_read_only(&self.data_dir, &self.config).await
    }

    /// Open a session holding the data-directory lock for its whole lifetime.
    pub async fn open_locked(&self) -> Result<(Session, DataDirLock)> {
        let lock = match DataDirLock::acquire(&self.data_dir, LOCK_TIMEOUT) {
            Ok(lock) => lock,
            Err(err) => {
                render_error(self.output, &CliError::coded(err.to_string(), err.code()))?;
                anyhow::bail!("{err}");
            }
        };
        let session = Session::open_dir(&self.data_dir, &self.config)
            .await
            .with_context(|| format!("failed to open timesheet in {}", self.data_dir.display()))?;
        Ok((session, lock))
    }

    /// Close a mutating session and report a failed final write.
    pub async fn finish(&self, session: Session, lock: DataDirLock) -> PersistStatus {
        let status = session.close().await;
        lock.release();
        if status == PersistStatus::Error {
            tracing::warn!(
                code = %ErrorCode::StoreWriteFailed,
                "changes kept in the fast store only; async store write failed"
            );
        }
        status
    }

    /// Render an invalid-coordinate error and turn it into a failure.
    pub fn reject_input(&self, err: &ModelError) -> Result<()> {
        self.reject_input_message(&err.to_string())
    }

    pub fn reject_input_message(&self, message: &str) -> Result<()> {
        render_error(
            self.output,
            &CliError::coded(message, ErrorCode::InvalidInput),
        )?;
        anyhow::bail!("{message}")
    }
}
