use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ErrorCode;

/// Name of the config file inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TIMESHEET_DATA_DIR";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub persist: PersistConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistConfig {
    /// Quiet period after the last mutation before a write cycle runs.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Upper bound on any single async-store read or write.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }
}

impl PersistConfig {
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub const fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Capacity of the fast store across all keys.
    #[serde(default = "default_fast_quota_bytes")]
    pub fast_quota_bytes: u64,
    /// Whether the async blob store may be detected at all.
    #[serde(default = "default_true")]
    pub blob_store: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            fast_quota_bytes: default_fast_quota_bytes(),
            blob_store: default_true(),
        }
    }
}

/// Load `<data_dir>/config.toml`, falling back to defaults when it is absent.
pub fn load_config(data_dir: &Path) -> Result<StoreConfig> {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(StoreConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<StoreConfig>(&content).with_context(|| {
        format!(
            "{}: Failed to parse {}",
            ErrorCode::ConfigParseError,
            path.display()
        )
    })
}

/// Resolve the data directory: explicit flag, then env, then the platform
/// data dir, then `./.timesheet`.
#[must_use]
pub fn resolve_data_dir(flag: Option<&Path>) -> PathBuf {
    resolve_data_dir_from(flag, env::var_os(DATA_DIR_ENV).map(PathBuf::from), dirs::data_dir())
}

fn resolve_data_dir_from(
    flag: Option<&Path>,
    env_dir: Option<PathBuf>,
    platform_dir: Option<PathBuf>,
) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    if let Some(dir) = env_dir.filter(|d| !d.as_os_str().is_empty()) {
        return dir;
    }
    platform_dir.map_or_else(|| PathBuf::from(".timesheet"), |dir| dir.join("timesheet"))
}

/// Resolve the CLI output mode name: `--json` > `FORMAT` env > config > TTY detection.
#[must_use]
pub fn resolve_output(cli_json: bool, config: &StoreConfig) -> &'static str {
    resolve_output_from(
        cli_json,
        config.output.as_deref(),
        env::var("FORMAT").ok().as_deref(),
        std::io::stdout().is_terminal(),
    )
}

/// Accepted spellings of an output mode. `human` and `table` are older names.
fn output_mode_name(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

fn resolve_output_from(
    cli_json: bool,
    config_output: Option<&str>,
    env_format: Option<&str>,
    stdout_is_tty: bool,
) -> &'static str {
    if cli_json {
        return "json";
    }
    env_format
        .and_then(output_mode_name)
        .or_else(|| config_output.and_then(output_mode_name))
        .unwrap_or(if stdout_is_tty { "pretty" } else { "text" })
}

const fn default_true() -> bool {
    true
}

const fn default_debounce_ms() -> u64 {
    300
}

const fn default_io_timeout_ms() -> u64 {
    2_000
}

const fn default_fast_quota_bytes() -> u64 {
    5 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(dir.path()).expect("load should succeed");
        assert_eq!(cfg.persist.debounce_ms, 300);
        assert_eq!(cfg.persist.io_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.storage.fast_quota_bytes, 5 * 1024 * 1024);
        assert!(cfg.storage.blob_store);
        assert_eq!(cfg.output, None);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "output = \"json\"\n\n[persist]\ndebounce_ms = 50\n\n[storage]\nblob_store = false\n",
        )
        .expect("write config");

        let cfg = load_config(dir.path()).expect("parse");
        assert_eq!(cfg.persist.debounce(), Duration::from_millis(50));
        assert_eq!(cfg.persist.io_timeout_ms, 2_000);
        assert!(!cfg.storage.blob_store);
        assert_eq!(cfg.output.as_deref(), Some("json"));
    }

    #[test]
    fn malformed_config_reports_parse_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), "[persist\n").expect("write config");
        let err = load_config(dir.path()).expect_err("must fail");
        assert!(format!("{err:#}").contains("E1002"));
    }

    #[test]
    fn data_dir_precedence() {
        let flag = PathBuf::from("/flag");
        let env_dir = Some(PathBuf::from("/env"));
        let platform = Some(PathBuf::from("/platform"));

        assert_eq!(
            resolve_data_dir_from(Some(&flag), env_dir.clone(), platform.clone()),
            flag
        );
        assert_eq!(
            resolve_data_dir_from(None, env_dir, platform.clone()),
            PathBuf::from("/env")
        );
        assert_eq!(
            resolve_data_dir_from(None, Some(PathBuf::new()), platform),
            PathBuf::from("/platform/timesheet")
        );
        assert_eq!(
            resolve_data_dir_from(None, None, None),
            PathBuf::from(".timesheet")
        );
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        assert_eq!(resolve_output_from(true, Some("pretty"), Some("text"), true), "json");
    }

    #[test]
    fn env_beats_config_and_aliases_are_normalized() {
        assert_eq!(resolve_output_from(false, Some("table"), Some("human"), false), "pretty");
        assert_eq!(resolve_output_from(false, Some("human"), Some("table"), true), "text");
        assert_eq!(resolve_output_from(false, Some(" JSON "), Some("bogus"), true), "json");
    }

    #[test]
    fn tty_decides_when_nothing_is_configured() {
        assert_eq!(resolve_output_from(false, None, None, true), "pretty");
        assert_eq!(resolve_output_from(false, None, None, false), "text");
    }
}
