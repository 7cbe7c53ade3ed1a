use crate::error::ErrorCode;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

/// Name of the lock file inside the data directory.
pub const LOCK_FILE: &str = ".lock";

/// Failure to take the data-directory lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another process kept the lock for the whole wait.
    #[error("data dir is in use by another tsh (waited {waited:?} on {})", path.display())]
    Timeout { path: PathBuf, waited: Duration },
    #[error("cannot open lock file: {0}")]
    Io(#[from] io::Error),
}

impl LockError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::Io(_) => ErrorCode::StoreWriteFailed,
        }
    }

    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

/// RAII guard giving one process exclusive use of a data directory.
///
/// Two sessions over the same directory would each debounce their own copy
/// of the state and overwrite one another, so mutating sessions hold this for
/// their whole lifetime.
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
    path: PathBuf,
}

impl DataDirLock {
    /// Acquire an exclusive advisory lock on `<data_dir>/.lock`.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(LOCK_FILE);

        let start = Instant::now();
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)?;

            if file.try_lock_exclusive().is_ok() {
                return Ok(Self { file, path });
            }

            if start.elapsed() >= timeout {
                return Err(LockError::Timeout {
                    path,
                    waited: start.elapsed(),
                });
            }

            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Explicitly release the lock. Release also happens automatically on drop.
    pub fn release(self) {
        let _ = self.file.unlock();
    }

    /// Return the lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::{DataDirLock, LOCK_FILE, LockError};
    use crate::error::ErrorCode;
    use std::{
        sync::{Arc, Barrier},
        thread,
        time::Duration,
    };

    #[test]
    fn lock_allows_acquire_and_release() -> Result<(), LockError> {
        let dir = tempfile::tempdir()?;
        let lock = DataDirLock::acquire(dir.path(), Duration::from_millis(50))?;
        assert_eq!(lock.path(), dir.path().join(LOCK_FILE).as_path());
        lock.release();
        Ok(())
    }

    #[test]
    fn lock_times_out_when_held() {
        let dir = tempfile::tempdir().unwrap();
        let _guard = DataDirLock::acquire(dir.path(), Duration::from_millis(50)).unwrap();
        let err = DataDirLock::acquire(dir.path(), Duration::from_millis(20)).unwrap_err();

        assert!(matches!(err, LockError::Timeout { ref path, .. } if path == &dir.path().join(LOCK_FILE)));
        assert_eq!(err.code(), ErrorCode::LockContention);
        assert!(err.hint().is_some());
        assert!(err.to_string().contains("in use by another tsh"));
    }

    #[test]
    fn lock_release_allows_follow_up_lock() -> Result<(), LockError> {
        let dir = tempfile::tempdir()?;
        {
            let _first = DataDirLock::acquire(dir.path(), Duration::from_millis(50))?;
        }

        let _second = DataDirLock::acquire(dir.path(), Duration::from_millis(50))?;
        Ok(())
    }

    #[test]
    fn contention_is_resolved_after_holder_releases() -> Result<(), LockError> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().to_path_buf();

        let blocker = Arc::new(Barrier::new(2));
        let waiter = Arc::new(Barrier::new(2));

        let blocker_thread = Arc::clone(&blocker);
        let waiter_thread = Arc::clone(&waiter);
        let root_in_thread = root.clone();
        let handle = thread::spawn(move || {
            let _holder = DataDirLock::acquire(&root_in_thread, Duration::from_millis(200)).unwrap();
            blocker_thread.wait();
            waiter_thread.wait();
        });

        blocker.wait();
        assert!(matches!(
            DataDirLock::acquire(&root, Duration::from_millis(20)),
            Err(LockError::Timeout { .. })
        ));
        waiter.wait();
        handle.join().unwrap();

        let follow_up = DataDirLock::acquire(&root, Duration::from_millis(50))?;
        follow_up.release();
        Ok(())
    }
}
