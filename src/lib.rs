//! filestash - multi-user file storage service
//!
//! Users authenticate with a bearer token, upload files that are streamed
//! to disk with a SHA-256 digest, and download or delete the files they own.
//! Administrators manage accounts and can reach every file.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{
    authenticate, hash_password, register, register_with_role, validate_password,
    verify_password, PasswordError, PermissionError, Principal, RegistrationError,
    RegistrationRequest, TokenError, TokenService, ValidationError,
};
pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository, UserUpdate};
pub use error::{Result, StashError};
pub use file::{FileRecord, FileRepository, FileService, FileStorage, UploadError};
pub use web::{create_router, AppState, WebServer};
