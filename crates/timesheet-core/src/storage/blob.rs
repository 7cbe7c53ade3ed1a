//! File-backed async blob store.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{BlobStore, validate_key};
use crate::error::StoreError;

/// Prefix of the throwaway files written by [`FileBlobStore::detect`].
const PROBE_PREFIX: &str = ".probe";

/// Blobs stored as files under one directory, accessed through tokio.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Probe `dir` for use as a blob store.
    ///
    /// Returns `None` when the directory cannot be created or written. That is
    /// an expected condition (read-only media, sandboxed runtimes) and is only
    /// logged at debug level.
    pub async fn detect(dir: impl Into<PathBuf>) -> Option<Self> {
        let dir = dir.into();
        match probe(&dir).await {
            Ok(()) => Some(Self { dir }),
            Err(err) => {
                tracing::debug!(dir = %dir.display(), error = %err, "async blob store unavailable");
                None
            }
        }
    }

    /// Use `dir` as a blob store only if it already exists. Nothing is created
    /// or written, so read-only sessions leave the data dir untouched.
    pub async fn existing(dir: impl Into<PathBuf>) -> Option<Self> {
        let dir = dir.into();
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Some(Self { dir }),
            _ => None,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Each probe gets its own random file name, so concurrent detections in the
/// same directory never remove one another's file.
async fn probe(dir: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tempfile::Builder::new()
        .prefix(PROBE_PREFIX)
        .tempfile_in(dir)?
        .close()
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        validate_key(name)?;
        match tokio::fs::read(self.dir.join(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        validate_key(name)?;
        // Removed on drop, including when a timeout cancels this future.
        let tmp = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".tmp")
            .tempfile_in(&self.dir)?
            .into_temp_path();
        {
            let mut file = tokio::fs::OpenOptions::new().write(true).open(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
        }
        tmp.persist(self.dir.join(name)).map_err(io::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BLOB_NAME;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn detect_creates_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileBlobStore::detect(dir.path().join("blobs"))
            .await
            .expect("writable dir is detected");
        assert!(store.dir().is_dir());
        assert_eq!(entries(store.dir()), Vec::<String>::new());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_detection_in_one_dir_always_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blobs = dir.path().join("blobs");
        for _ in 0..100 {
            let (a, b) = tokio::join!(
                tokio::spawn(FileBlobStore::detect(blobs.clone())),
                tokio::spawn(FileBlobStore::detect(blobs.clone())),
            );
            assert!(a.expect("join").is_some());
            assert!(b.expect("join").is_some());
        }
        assert_eq!(entries(&blobs), Vec::<String>::new());
    }

    #[tokio::test]
    async fn existing_never_creates_the_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blobs = dir.path().join("blobs");
        assert!(FileBlobStore::existing(&blobs).await.is_none());
        assert!(!blobs.exists());

        std::fs::create_dir(&blobs).expect("mkdir");
        assert!(FileBlobStore::existing(&blobs).await.is_some());
        assert_eq!(entries(&blobs), Vec::<String>::new());
    }

    #[tokio::test]
    async fn failed_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileBlobStore::detect(dir.path()).await.expect("detected");
        // A non-empty directory in the way makes the final rename fail.
        std::fs::create_dir_all(dir.path().join(BLOB_NAME).join("occupied")).expect("mkdir");

        assert!(store.write(BLOB_NAME, b"{}").await.is_err());
        assert_eq!(entries(dir.path()), vec![BLOB_NAME.to_string()]);
    }

    #[tokio::test]
    async fn detect_returns_none_when_path_is_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").expect("write file");
        assert!(FileBlobStore::detect(&file).await.is_none());
    }

    #[tokio::test]
    async fn write_then_read_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileBlobStore::detect(dir.path()).await.expect("detected");

        assert!(store.read(BLOB_NAME).await.expect("read").is_none());
        store.write(BLOB_NAME, b"{\"version\":2}").await.expect("write");
        assert_eq!(
            store.read(BLOB_NAME).await.expect("read"),
            Some(b"{\"version\":2}".to_vec())
        );
    }
}
