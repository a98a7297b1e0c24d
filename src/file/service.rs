//! File service for filestash.
//!
//! This module provides high-level file operations including:
//! - Streaming upload with size and hash enforcement
//! - Download with ownership checks
//! - File listing and deletion

use sqlx::SqlitePool;
use tokio::io::AsyncRead;
use tracing::{info, warn};

use crate::auth::permission::{authorize_resource, ensure_active};
use crate::db::User;
use crate::{Result, StashError};

use super::ingest::ingest;
use super::metadata::{FileRecord, FileRepository, NewFileRecord};
use super::storage::FileStorage;

/// File service for managing uploads and downloads.
pub struct FileService<'a> {
    pool: &'a SqlitePool,
    storage: &'a FileStorage,
}

impl<'a> FileService<'a> {
    /// Create a new FileService.
    pub fn new(pool: &'a SqlitePool, storage: &'a FileStorage) -> Self {
        Self { pool, storage }
    }

    fn repo(&self) -> FileRepository<'a> {
        FileRepository::new(self.pool)
    }

    /// Store an upload owned by `owner` and record it.
    ///
    /// If the record cannot be written the stored bytes are removed again,
    /// so no file exists on disk without metadata.
    pub async fn upload<R>(
        &self,
        owner: &User,
        reader: R,
        filename: Option<&str>,
        content_type: Option<String>,
    ) -> Result<FileRecord>
    where
        R: AsyncRead + Unpin,
    {
        let owner = ensure_active(Some(owner))?;

        let ingested = ingest(
            self.storage,
            reader,
            filename,
            self.storage.max_upload_bytes(),
        )
        .await?;

        let new_record = NewFileRecord {
            owner_id: owner.id,
            // ingest already rejected a missing name
            original_name: filename.unwrap_or_default().to_string(),
            stored_name: ingested.stored_name.clone(),
            content_type,
            size_bytes: i64::try_from(ingested.size_bytes).unwrap_or(i64::MAX),
            sha256: ingested.sha256.clone(),
            storage_path: ingested.storage_path.to_string_lossy().into_owned(),
        };

        match self.repo().create(&new_record).await {
            Ok(record) => {
                info!(
                    file_id = record.id,
                    owner_id = owner.id,
                    size_bytes = record.size_bytes,
                    "File uploaded"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(
                    stored_name = %ingested.stored_name,
                    error = %e,
                    "Failed to record upload, removing stored bytes"
                );
                self.storage.remove(&ingested.storage_path).await;
                Err(e)
            }
        }
    }

    /// Get a record the user may access.
    pub async fn get(&self, user: &User, id: i64) -> Result<FileRecord> {
        let record = self
            .repo()
            .get_by_id(id)
            .await?
            .ok_or_else(|| StashError::NotFound("file".to_string()))?;

        authorize_resource(Some(user), record.owner_id)?;
        Ok(record)
    }

    /// Open a file for download.
    ///
    /// Missing bytes are reported as `NotFound("file content")`, distinct
    /// from a missing record.
    pub async fn open_download(
        &self,
        user: &User,
        id: i64,
    ) -> Result<(FileRecord, tokio::fs::File)> {
        let record = self.get(user, id).await?;
        let file = self.storage.open(&record.storage_path).await.inspect_err(|e| {
            if matches!(e, StashError::NotFound(_)) {
                warn!(file_id = record.id, path = %record.storage_path, "Stored bytes missing");
            }
        })?;
        Ok((record, file))
    }

    /// Delete a file.
    ///
    /// The bytes are removed best-effort; the record is removed regardless.
    pub async fn delete(&self, user: &User, id: i64) -> Result<()> {
        let record = self.get(user, id).await?;

        self.storage.remove(&record.storage_path).await;
        self.repo().delete(record.id).await?;

        info!(file_id = record.id, user_id = user.id, "File deleted");
        Ok(())
    }

    /// List the user's own files, newest first.
    pub async fn list(&self, user: &User) -> Result<Vec<FileRecord>> {
        let user = ensure_active(Some(user))?;
        self.repo().list_by_owner(user.id).await
    }

    /// Remove the stored bytes of every file owned by `owner_id`.
    ///
    /// Records are left alone; deleting the user removes them through the
    /// foreign key cascade. Returns the number of files removed from disk.
    pub async fn purge_owner(&self, owner_id: i64) -> Result<usize> {
        let records = self.repo().list_by_owner(owner_id).await?;

        let mut removed = 0;
        for record in &records {
            if self.storage.remove(&record.storage_path).await {
                removed += 1;
            }
        }

        info!(owner_id, files = records.len(), removed, "Purged stored files");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, Role, UserRepository, UserUpdate};
    use crate::Database;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    struct Fixture {
        db: Database,
        storage: FileStorage,
        _temp: TempDir,
    }

    async fn setup(max: Option<u64>) -> Fixture {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::new(temp.path().join("uploads"), max).unwrap();
        let db = Database::open_in_memory().await.unwrap();
        Fixture {
            db,
            storage,
            _temp: temp,
        }
    }

    async fn create_user(db: &Database, name: &str, role: Role) -> User {
        UserRepository::new(db.pool())
            .create(&NewUser::new(format!("{name}@example.com"), name, "hash").with_role(role))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_and_download() {
        let f = setup(None).await;
        let alice = create_user(&f.db, "alice", Role::User).await;
        let service = FileService::new(f.db.pool(), &f.storage);

        let record = service
            .upload(
                &alice,
                &b"content"[..],
                Some("notes.txt"),
                Some("text/plain".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(record.original_name, "notes.txt");
        assert_eq!(record.size_bytes, 7);
        assert!(record.stored_name.ends_with(".txt"));

        let (found, mut file) = service.open_download(&alice, record.id).await.unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.unwrap();
        assert_eq!(found.id, record.id);
        assert_eq!(buf, b"content");
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let f = setup(Some(3)).await;
        let alice = create_user(&f.db, "alice", Role::User).await;
        let service = FileService::new(f.db.pool(), &f.storage);

        let result = service
            .upload(&alice, &b"toolong"[..], Some("a.txt"), None)
            .await;

        assert!(matches!(result, Err(StashError::PayloadTooLarge { limit: 3 })));
        assert!(service.list(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_record_failure_removes_bytes() {
        let f = setup(None).await;
        let ghost = User {
            id: 999,
            email: "ghost@example.com".to_string(),
            username: "ghost".to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
            is_active: true,
            created_at: String::new(),
        };
        let service = FileService::new(f.db.pool(), &f.storage);

        // Foreign key rejects the unknown owner.
        let result = service.upload(&ghost, &b"data"[..], Some("a.txt"), None).await;
        assert!(result.is_err());

        f.storage.cleanup_empty_dirs().unwrap();
        assert_eq!(std::fs::read_dir(f.storage.base_path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_other_user_forbidden_admin_allowed() {
        let f = setup(None).await;
        let alice = create_user(&f.db, "alice", Role::User).await;
        let bob = create_user(&f.db, "bob", Role::User).await;
        let admin = create_user(&f.db, "root", Role::Admin).await;
        let service = FileService::new(f.db.pool(), &f.storage);

        let record = service
            .upload(&alice, &b"secret"[..], Some("s.txt"), None)
            .await
            .unwrap();

        assert!(matches!(
            service.get(&bob, record.id).await,
            Err(StashError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(&bob, record.id).await,
            Err(StashError::Forbidden(_))
        ));
        assert!(service.open_download(&admin, record.id).await.is_ok());
        service.delete(&admin, record.id).await.unwrap();
        assert!(matches!(
            service.get(&alice, record.id).await,
            Err(StashError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_inactive_owner_rejected() {
        let f = setup(None).await;
        let alice = create_user(&f.db, "alice", Role::User).await;
        let service = FileService::new(f.db.pool(), &f.storage);
        let record = service
            .upload(&alice, &b"x"[..], Some("x.txt"), None)
            .await
            .unwrap();

        let alice = UserRepository::new(f.db.pool())
            .update(alice.id, &UserUpdate::new().is_active(false))
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(
            service.get(&alice, record.id).await,
            Err(StashError::AccountInactive)
        ));
    }

    #[tokio::test]
    async fn test_missing_bytes() {
        let f = setup(None).await;
        let alice = create_user(&f.db, "alice", Role::User).await;
        let service = FileService::new(f.db.pool(), &f.storage);
        let record = service
            .upload(&alice, &b"bytes"[..], Some("b.bin"), None)
            .await
            .unwrap();

        std::fs::remove_file(&record.storage_path).unwrap();

        match service.open_download(&alice, record.id).await {
            Err(StashError::NotFound(what)) => assert_eq!(what, "file content"),
            other => panic!("expected missing content, got {:?}", other.map(|(r, _)| r)),
        }

        // Delete still removes the record.
        service.delete(&alice, record.id).await.unwrap();
        match service.get(&alice, record.id).await {
            Err(StashError::NotFound(what)) => assert_eq!(what, "file"),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_only_own_files() {
        let f = setup(None).await;
        let alice = create_user(&f.db, "alice", Role::User).await;
        let bob = create_user(&f.db, "bob", Role::User).await;
        let service = FileService::new(f.db.pool(), &f.storage);

        service
            .upload(&alice, &b"1"[..], Some("1.txt"), None)
            .await
            .unwrap();
        let newest = service
            .upload(&alice, &b"2"[..], Some("2.txt"), None)
            .await
            .unwrap();
        service
            .upload(&bob, &b"3"[..], Some("3.txt"), None)
            .await
            .unwrap();

        let files = service.list(&alice).await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, newest.id);
    }

    #[tokio::test]
    async fn test_purge_owner() {
        let f = setup(None).await;
        let alice = create_user(&f.db, "alice", Role::User).await;
        let service = FileService::new(f.db.pool(), &f.storage);

        let a = service
            .upload(&alice, &b"a"[..], Some("a.txt"), None)
            .await
            .unwrap();
        let b = service
            .upload(&alice, &b"b"[..], Some("b.txt"), None)
            .await
            .unwrap();

        assert_eq!(service.purge_owner(alice.id).await.unwrap(), 2);
        assert!(!std::path::Path::new(&a.storage_path).exists());
        assert!(!std::path::Path::new(&b.storage_path).exists());
    }
}
