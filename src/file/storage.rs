//! File storage for filestash.
//!
//! Physical layout of uploaded bytes. Files are stored in a sharded
//! directory structure keyed by the first two characters of the stored
//! name:
//! ```text
//! {upload_dir}/
//! ├── 3f/
//! │   └── 3f2a9c0e5b7d4e1f8a6b2c9d0e1f2a3b.pdf
//! ├── a0/
//! │   └── a07c...e9          (no extension)
//! └── ...
//! ```
//! In-flight uploads live next to their destination with a `.part`
//! suffix until they are complete.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::{Result, StashError};

/// Suffix of files still being written.
pub const PARTIAL_SUFFIX: &str = ".part";

/// File storage service for managing physical files.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for file storage.
    base_path: PathBuf,
    /// Upload size ceiling in bytes.
    max_upload_bytes: Option<u64>,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>, max_upload_bytes: Option<u64>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self {
            base_path,
            max_upload_bytes,
        })
    }

    /// Create a FileStorage from the storage section of the configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::new(&config.upload_dir, config.max_upload_bytes)
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Upload size ceiling, `None` when unbounded.
    pub fn max_upload_bytes(&self) -> Option<u64> {
        self.max_upload_bytes
    }

    /// Get the full file path for a stored name.
    ///
    /// The path is constructed as `{base_path}/{shard}/{stored_name}`.
    pub fn path_for(&self, stored_name: &str) -> PathBuf {
        self.base_path.join(Self::shard(stored_name)).join(stored_name)
    }

    /// Path of the in-flight sibling of `path_for(stored_name)`.
    pub fn partial_path_for(&self, stored_name: &str) -> PathBuf {
        self.base_path
            .join(Self::shard(stored_name))
            .join(format!("{stored_name}{PARTIAL_SUFFIX}"))
    }

    /// First two characters of the stored name.
    fn shard(stored_name: &str) -> &str {
        stored_name.get(..2).unwrap_or(stored_name)
    }

    /// Open stored bytes for reading.
    ///
    /// A missing file is reported as `NotFound("file content")`.
    pub async fn open(&self, path: impl AsRef<Path>) -> Result<tokio::fs::File> {
        match tokio::fs::File::open(path.as_ref()).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StashError::NotFound("file content".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a stored file.
    ///
    /// Returns `true` if the file was deleted, `false` if it did not exist.
    /// Other failures are logged and swallowed.
    pub async fn remove(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match tokio::fs::remove_file(path).await {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Stored file already absent");
                false
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove stored file");
                false
            }
        }
    }

    /// Check if a file exists at the given path.
    pub async fn exists(&self, path: impl AsRef<Path>) -> bool {
        tokio::fs::try_exists(path.as_ref()).await.unwrap_or(false)
    }

    /// Delete `.part` files left behind by interrupted uploads.
    ///
    /// Meant to run once at startup, before the server accepts requests.
    pub fn sweep_partials(&self) -> Result<usize> {
        let mut removed = 0;

        for shard in fs::read_dir(&self.base_path)?.flatten() {
            let shard_path = shard.path();
            if !shard_path.is_dir() {
                continue;
            }
            let Ok(entries) = fs::read_dir(&shard_path) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let is_partial = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(PARTIAL_SUFFIX));
                if !is_partial {
                    continue;
                }
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to remove partial upload")
                    }
                }
            }
        }

        if removed > 0 {
            info!(count = removed, "Removed stale partial uploads");
        }
        Ok(removed)
    }

    /// Clean up empty shard directories.
    pub fn cleanup_empty_dirs(&self) -> Result<usize> {
        let mut removed = 0;

        if let Ok(entries) = fs::read_dir(&self.base_path) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    if let Ok(dir_entries) = fs::read_dir(&path) {
                        if dir_entries.count() == 0 && fs::remove_dir(&path).is_ok() {
                            removed += 1;
                        }
                    }
                }
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (FileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("uploads"), Some(1024)).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_new_creates_directory() {
        let (storage, _temp) = create_test_storage();
        assert!(storage.base_path().is_dir());
        assert_eq!(storage.max_upload_bytes(), Some(1024));
    }

    #[test]
    fn test_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            upload_dir: temp_dir.path().join("up").to_string_lossy().into_owned(),
            max_upload_bytes: None,
        };
        let storage = FileStorage::from_config(&config).unwrap();
        assert!(storage.base_path().is_dir());
        assert!(storage.max_upload_bytes().is_none());
    }

    #[test]
    fn test_path_for_is_sharded() {
        let (storage, _temp) = create_test_storage();
        let path = storage.path_for("ab12cd.txt");
        assert_eq!(path, storage.base_path().join("ab").join("ab12cd.txt"));

        let partial = storage.partial_path_for("ab12cd.txt");
        assert_eq!(
            partial,
            storage.base_path().join("ab").join("ab12cd.txt.part")
        );
    }

    #[test]
    fn test_shard_short_name() {
        assert_eq!(FileStorage::shard("a"), "a");
        assert_eq!(FileStorage::shard("abc"), "ab");
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let (storage, _temp) = create_test_storage();
        let result = storage.open(storage.path_for("ffffffff")).await;
        match result {
            Err(StashError::NotFound(what)) => assert_eq!(what, "file content"),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remove() {
        let (storage, _temp) = create_test_storage();
        let path = storage.path_for("abcdef.bin");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"data").unwrap();

        assert!(storage.exists(&path).await);
        assert!(storage.remove(&path).await);
        assert!(!storage.exists(&path).await);
        assert!(!storage.remove(&path).await);
    }

    #[test]
    fn test_sweep_partials() {
        let (storage, _temp) = create_test_storage();
        let shard = storage.base_path().join("ab");
        fs::create_dir_all(&shard).unwrap();
        fs::write(shard.join("abcd.txt.part"), b"partial").unwrap();
        fs::write(shard.join("abef.txt"), b"complete").unwrap();
        fs::write(storage.base_path().join("stray.part"), b"top level").unwrap();

        assert_eq!(storage.sweep_partials().unwrap(), 1);
        assert!(!shard.join("abcd.txt.part").exists());
        assert!(shard.join("abef.txt").exists());
    }

    #[test]
    fn test_cleanup_empty_dirs() {
        let (storage, _temp) = create_test_storage();
        fs::create_dir_all(storage.base_path().join("aa")).unwrap();
        fs::create_dir_all(storage.base_path().join("bb")).unwrap();
        fs::write(storage.base_path().join("bb").join("bbcc"), b"x").unwrap();

        assert_eq!(storage.cleanup_empty_dirs().unwrap(), 1);
        assert!(!storage.base_path().join("aa").exists());
        assert!(storage.base_path().join("bb").exists());
    }
}
