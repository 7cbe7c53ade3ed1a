use std::fmt;
use std::io;
use std::time::Duration;

use crate::migrate::Shape;

/// Machine-readable error codes for scripting and status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    StoreUnavailable,
    StoreReadFailed,
    StoreWriteFailed,
    StoreQuotaExceeded,
    StoreTimeout,
    ImportParseFailed,
    ImportUnrecognized,
    InvalidInput,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::StoreUnavailable => "E3001",
            Self::StoreReadFailed => "E3002",
            Self::StoreWriteFailed => "E5001",
            Self::StoreQuotaExceeded => "E5003",
            Self::StoreTimeout => "E5004",
            Self::ImportParseFailed => "E4001",
            Self::ImportUnrecognized => "E4002",
            Self::InvalidInput => "E2005",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::StoreUnavailable => "Storage backend unavailable",
            Self::StoreReadFailed => "Storage read failed",
            Self::StoreWriteFailed => "Storage write failed",
            Self::StoreQuotaExceeded => "Storage quota exceeded",
            Self::StoreTimeout => "Storage operation timed out",
            Self::ImportParseFailed => "Import file is not valid JSON",
            Self::ImportUnrecognized => "Import file matches no known timesheet layout",
            Self::InvalidInput => "Invalid year, month, day, or value",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to the user.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in <data-dir>/config.toml and retry."),
            Self::StoreUnavailable => None,
            Self::StoreReadFailed => Some("The stored copy is ignored; the next save rewrites it."),
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::StoreQuotaExceeded => {
                Some("Raise storage.fast_quota_bytes or export and prune old years.")
            }
            Self::StoreTimeout => Some("Raise persist.io_timeout_ms if the disk is slow."),
            Self::ImportParseFailed => Some("Check that the file is a timesheet JSON export."),
            Self::ImportUnrecognized => {
                Some("Pass --force to replace current data with an empty timesheet anyway.")
            }
            Self::InvalidInput => Some("Months are 1-12 and days must exist in that month."),
            Self::LockContention => Some("Retry after the other `tsh` process exits."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failure of a single storage backend operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("writing {key} needs {needed} bytes but the store is capped at {limit}")]
    QuotaExceeded { key: String, needed: u64, limit: u64 },

    #[error("{op} did not finish within {waited:?}")]
    Timeout { op: &'static str, waited: Duration },

    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::StoreWriteFailed,
            Self::QuotaExceeded { .. } => ErrorCode::StoreQuotaExceeded,
            Self::Timeout { .. } => ErrorCode::StoreTimeout,
            Self::InvalidKey(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// Why an import was refused.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("import is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("import matches no known timesheet layout (detected {0})")]
    UnrecognizedShape(Shape),
}

impl ImportError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Parse(_) => ErrorCode::ImportParseFailed,
            Self::UnrecognizedShape(_) => ErrorCode::ImportUnrecognized,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}
