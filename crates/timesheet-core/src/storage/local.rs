//! Directory-backed fast store with a byte quota.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{FastStore, validate_key};
use crate::error::StoreError;

/// One file per key under a directory, capped at `quota` bytes in total.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
    quota: u64,
}

impl LocalStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>, quota: u64) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, quota })
    }

    /// A store rooted at `dir` without touching the filesystem. Reads of a
    /// missing directory behave like reads of a missing key.
    #[must_use]
    pub fn existing(dir: impl Into<PathBuf>, quota: u64) -> Self {
        Self {
            dir: dir.into(),
            quota,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub const fn quota(&self) -> u64 {
        self.quota
    }

    /// Bytes used by every key except `excluding`.
    fn usage_excluding(&self, excluding: &str) -> io::Result<u64> {
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name == excluding || name.starts_with('.') {
                continue;
            }
            let meta = entry.metadata()?;
            if meta.is_file() {
                total += meta.len();
            }
        }
        Ok(total)
    }
}

impl FastStore for LocalStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        validate_key(key)?;
        match fs::read(self.dir.join(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;

        let needed = self.usage_excluding(key)? + bytes.len() as u64;
        if needed > self.quota {
            return Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                needed,
                limit: self.quota,
            });
        }

        // The temp file is removed on drop if any step below fails.
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{key}."))
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.dir.join(key)).map_err(io::Error::from)?;
        Ok(())
    }
}
