//! File records and their repository.

use sqlx::SqlitePool;

use crate::{Result, StashError};

const FILE_COLUMNS: &str = "id, owner_id, original_name, stored_name, content_type, size_bytes, \
                            sha256, storage_path, created_at";

/// Metadata of one stored upload.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// Owning user.
    pub owner_id: i64,
    /// Filename as sent by the client.
    pub original_name: String,
    /// Server-generated name on disk.
    pub stored_name: String,
    /// MIME type as sent by the client.
    pub content_type: Option<String>,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Lowercase hex SHA-256, absent for empty files.
    pub sha256: Option<String>,
    /// Location of the bytes.
    pub storage_path: String,
    /// Upload timestamp (RFC 3339, UTC).
    pub created_at: String,
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Owning user.
    pub owner_id: i64,
    /// Filename as sent by the client.
    pub original_name: String,
    /// Server-generated name on disk.
    pub stored_name: String,
    /// MIME type as sent by the client.
    pub content_type: Option<String>,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Lowercase hex SHA-256.
    pub sha256: Option<String>,
    /// Location of the bytes.
    pub storage_path: String,
}

/// Repository for file records.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a record and return it with its assigned ID and timestamp.
    pub async fn create(&self, file: &NewFileRecord) -> Result<FileRecord> {
        let result = sqlx::query(
            "INSERT INTO files (owner_id, original_name, stored_name, content_type, size_bytes, sha256, storage_path)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.owner_id)
        .bind(&file.original_name)
        .bind(&file.stored_name)
        .bind(&file.content_type)
        .bind(file.size_bytes)
        .bind(&file.sha256)
        .bind(&file.storage_path)
        .execute(self.pool)
        .await
        .map_err(|e| StashError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| StashError::NotFound("file".to_string()))
    }

    /// Get a record by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?");
        let record = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| StashError::Database(e.to_string()))?;

        Ok(record)
    }

    /// List records owned by a user, newest first.
    pub async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE owner_id = ? ORDER BY id DESC");
        let records = sqlx::query_as::<_, FileRecord>(&sql)
            .bind(owner_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| StashError::Database(e.to_string()))?;

        Ok(records)
    }

    /// Delete a record by ID.
    ///
    /// Returns true if a record was deleted, false if not found.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| StashError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Count records owned by a user.
    pub async fn count_by_owner(&self, owner_id: i64) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| StashError::Database(e.to_string()))?;
        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool())
            .create(&NewUser::new("alice@example.com", "alice", "hash"))
            .await
            .unwrap();
        (db, user.id)
    }

    fn new_record(owner_id: i64, stored_name: &str) -> NewFileRecord {
        NewFileRecord {
            owner_id,
            original_name: "report.pdf".to_string(),
            stored_name: stored_name.to_string(),
            content_type: Some("application/pdf".to_string()),
            size_bytes: 42,
            sha256: Some("ab".repeat(32)),
            storage_path: format!("/tmp/{stored_name}"),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (db, owner) = setup().await;
        let repo = FileRepository::new(db.pool());

        let record = repo.create(&new_record(owner, "aaaa.pdf")).await.unwrap();
        assert_eq!(record.owner_id, owner);
        assert_eq!(record.original_name, "report.pdf");
        assert_eq!(record.size_bytes, 42);
        assert!(!record.created_at.is_empty());

        let found = repo.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.stored_name, "aaaa.pdf");
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stored_name_unique() {
        let (db, owner) = setup().await;
        let repo = FileRepository::new(db.pool());

        repo.create(&new_record(owner, "same")).await.unwrap();
        assert!(repo.create(&new_record(owner, "same")).await.is_err());
    }

    #[tokio::test]
    async fn test_owner_must_exist() {
        let (db, _) = setup().await;
        let repo = FileRepository::new(db.pool());

        assert!(repo.create(&new_record(999, "orphan")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_by_owner_newest_first() {
        let (db, owner) = setup().await;
        let other = UserRepository::new(db.pool())
            .create(&NewUser::new("bob@example.com", "bob", "hash"))
            .await
            .unwrap();
        let repo = FileRepository::new(db.pool());

        let first = repo.create(&new_record(owner, "one")).await.unwrap();
        let second = repo.create(&new_record(owner, "two")).await.unwrap();
        repo.create(&new_record(other.id, "three")).await.unwrap();

        let records = repo.list_by_owner(owner).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second.id);
        assert_eq!(records[1].id, first.id);
        assert_eq!(repo.count_by_owner(other.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let (db, owner) = setup().await;
        let repo = FileRepository::new(db.pool());

        let record = repo.create(&new_record(owner, "gone")).await.unwrap();
        assert!(repo.delete(record.id).await.unwrap());
        assert!(!repo.delete(record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_delete_cascades() {
        let (db, owner) = setup().await;
        let repo = FileRepository::new(db.pool());
        repo.create(&new_record(owner, "x1")).await.unwrap();
        repo.create(&new_record(owner, "x2")).await.unwrap();

        UserRepository::new(db.pool()).delete(owner).await.unwrap();
        assert_eq!(repo.count_by_owner(owner).await.unwrap(), 0);
    }
}
