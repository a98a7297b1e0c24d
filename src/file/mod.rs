//! File management module for filestash.
//!
//! This module provides:
//! - Streaming ingestion with SHA-256 hashing and a size ceiling
//! - Sharded on-disk storage with random stored names
//! - File records and ownership-checked operations on them

mod ingest;
mod metadata;
mod service;
mod storage;

pub use ingest::{
    extension, generate_stored_name, ingest, sanitize_filename, IngestedFile, UploadError,
    CHUNK_SIZE, MAX_EXTENSION_LEN,
};
pub use metadata::{FileRecord, FileRepository, NewFileRecord};
pub use service::FileService;
pub use storage::{FileStorage, PARTIAL_SUFFIX};
