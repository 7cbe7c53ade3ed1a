use serde::{Deserialize, Serialize};
use std::fmt;

/// Externally observable persistence health.
///
/// `Idle` until the startup load finds data, `Loaded` after it does, then
/// `Saved` or `Error` after each write cycle depending on the async store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistStatus {
    #[default]
    Idle,
    Loaded,
    Saved,
    Error,
}

impl PersistStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Saved => "saved",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PersistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
