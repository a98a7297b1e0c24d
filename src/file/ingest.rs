//! Streaming upload ingestion.
//!
//! Copies an upload from any [`AsyncRead`] to its final location in
//! [`FileStorage`], hashing with SHA-256 and enforcing the size ceiling
//! as bytes arrive. Nothing is buffered beyond one chunk.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::storage::FileStorage;
use crate::StashError;

/// Read buffer size.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Name used when sanitizing leaves nothing.
const FALLBACK_NAME: &str = "file";

/// Longest extension kept on a stored name.
pub const MAX_EXTENSION_LEN: usize = 16;

/// Upload ingestion errors.
#[derive(Error, Debug)]
pub enum UploadError {
    /// No filename, or only whitespace.
    #[error("no file provided")]
    MissingFilename,

    /// The upload exceeded the configured ceiling.
    #[error("file too large (limit {limit} bytes)")]
    TooLarge {
        /// Ceiling in bytes.
        limit: u64,
    },

    /// The upload stream broke off before the file was complete.
    #[error("upload stream interrupted: {0}")]
    Interrupted(std::io::Error),

    /// Writing storage failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for StashError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::MissingFilename | UploadError::Interrupted(_) => {
                StashError::BadRequest(e.to_string())
            }
            UploadError::TooLarge { limit } => StashError::PayloadTooLarge { limit },
            UploadError::Io(io) => StashError::Io(io),
        }
    }
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    /// Generated name on disk.
    pub stored_name: String,
    /// Final location of the bytes.
    pub storage_path: PathBuf,
    /// Number of bytes written.
    pub size_bytes: u64,
    /// Lowercase hex SHA-256, `None` for an empty upload.
    pub sha256: Option<String>,
}

/// Reduce a client-supplied filename to a storage-safe name.
///
/// Backslashes count as separators, only the last path segment is kept,
/// and every run of characters outside `[A-Za-z0-9._-]` becomes one `_`.
///
/// # Examples
///
/// ```
/// use filestash::file::sanitize_filename;
///
/// assert_eq!(sanitize_filename("C:\\Users\\me\\My Report.PDF"), "My_Report.PDF");
/// assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
/// assert_eq!(sanitize_filename("///"), "file");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let normalized = name.trim().replace('\\', "/");
    let last = normalized.rsplit('/').next().unwrap_or("");

    let mut out = String::with_capacity(last.len());
    let mut in_run = false;
    for c in last.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }

    if out.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        out
    }
}

/// Lowercase extension of an already sanitized name, if any.
///
/// Dotfiles such as `.env` have no extension. Extensions longer than
/// [`MAX_EXTENSION_LEN`] are dropped so stored names stay well under the
/// filesystem name limit.
pub fn extension(sanitized: &str) -> Option<String> {
    Path::new(sanitized)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= MAX_EXTENSION_LEN)
        .map(|e| e.to_ascii_lowercase())
}

/// Generate a fresh stored name: 32 hex characters plus the extension.
pub fn generate_stored_name(client_filename: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    match extension(&sanitize_filename(client_filename)) {
        Some(ext) => format!("{id}.{ext}"),
        None => id,
    }
}

/// Stream `reader` into storage.
///
/// Bytes go to a `.part` file opened exclusively; on success it is
/// synced and renamed to the final path. Any failure, including exceeding
/// `max_bytes`, removes the partial file before returning.
pub async fn ingest<R>(
    storage: &FileStorage,
    reader: R,
    client_filename: Option<&str>,
    max_bytes: Option<u64>,
) -> Result<IngestedFile, UploadError>
where
    R: AsyncRead + Unpin,
{
    let client_filename = client_filename
        .filter(|name| !name.trim().is_empty())
        .ok_or(UploadError::MissingFilename)?;

    let stored_name = generate_stored_name(client_filename);
    let final_path = storage.path_for(&stored_name);
    let partial_path = storage.partial_path_for(&stored_name);

    if let Some(parent) = final_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&partial_path)
        .await?;

    match write_chunks(file, reader, max_bytes).await {
        Ok((size_bytes, digest)) => {
            if let Err(e) = tokio::fs::rename(&partial_path, &final_path).await {
                discard_partial(&partial_path).await;
                return Err(e.into());
            }

            let sha256 = (size_bytes > 0).then_some(digest);
            info!(
                stored_name = %stored_name,
                size_bytes,
                "Upload stored"
            );
            Ok(IngestedFile {
                stored_name,
                storage_path: final_path,
                size_bytes,
                sha256,
            })
        }
        Err(e) => {
            discard_partial(&partial_path).await;
            Err(e)
        }
    }
}

/// Copy chunks into `file`, returning the byte count and hex digest.
async fn write_chunks<R>(
    mut file: tokio::fs::File,
    mut reader: R,
    max_bytes: Option<u64>,
) -> Result<(u64, String), UploadError>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = Sha256::new();
    let mut total: u64 = 0;
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(UploadError::Interrupted)?;
        if n == 0 {
            break;
        }

        total += n as u64;
        if let Some(limit) = max_bytes {
            if total > limit {
                debug!(limit, received = total, "Upload exceeded size ceiling");
                return Err(UploadError::TooLarge { limit });
            }
        }

        hasher.update(&buf[..n]);
        file.write_all(&buf[..n]).await?;
    }

    file.flush().await?;
    file.sync_all().await?;

    Ok((total, hex::encode(hasher.finalize())))
}

/// Best-effort removal of an unfinished upload.
async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial upload");
        }
    }
}
