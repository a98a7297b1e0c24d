//! API handlers and shared application state.

pub mod auth;
pub mod file;
pub mod health;
pub mod user;

pub use auth::*;
pub use file::*;
pub use health::*;
pub use user::*;

use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::Config;
use crate::db::Database;
use crate::file::FileStorage;
use crate::Result;

/// State shared by all handlers. Immutable after startup.
pub struct AppState {
    /// Database handle.
    pub db: Arc<Database>,
    /// Access token issuer and validator.
    pub tokens: Arc<TokenService>,
    /// Upload storage.
    pub storage: Arc<FileStorage>,
}

impl AppState {
    /// Assemble state from already constructed services.
    pub fn new(db: Database, tokens: TokenService, storage: FileStorage) -> Self {
        Self {
            db: Arc::new(db),
            tokens: Arc::new(tokens),
            storage: Arc::new(storage),
        }
    }

    /// Build the token service and storage from configuration.
    pub fn from_config(config: &Config, db: Database) -> Result<Self> {
        let tokens = TokenService::new(&config.auth)?;
        let storage = FileStorage::from_config(&config.storage)?;
        Ok(Self::new(db, tokens, storage))
    }
}
