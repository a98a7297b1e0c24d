//! Test helpers for Web API tests.
//!
//! Builds the real router over an in-memory database and a temporary
//! upload directory, and drives it with `axum_test::TestServer`.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use filestash::config::AuthConfig;
use filestash::{
    create_router, register_with_role, AppState, Database, FileStorage, RegistrationRequest,
    Role, TokenService, UserRepository,
};

/// Password used for every test account.
pub const PASSWORD: &str = "password123";

/// A running test application.
pub struct TestApp {
    /// HTTP test server over the real router.
    pub server: TestServer,
    /// Shared state, for direct database and storage access.
    pub state: Arc<AppState>,
    /// Upload directory; removed on drop.
    pub upload_dir: TempDir,
}

impl TestApp {
    /// Create an app with no upload ceiling.
    pub async fn new() -> Self {
        Self::with_max_upload(None).await
    }

    /// Create an app with the given upload ceiling.
    pub async fn with_max_upload(max_upload_bytes: Option<u64>) -> Self {
        let upload_dir = TempDir::new().expect("Failed to create upload dir");

        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let tokens = TokenService::new(&AuthConfig {
            secret_key: "test-secret-key-for-testing-only".to_string(),
            ..AuthConfig::default()
        })
        .expect("Failed to create token service");
        let storage = FileStorage::new(upload_dir.path(), max_upload_bytes)
            .expect("Failed to create storage");

        let state = Arc::new(AppState::new(db, tokens, storage));
        let router = create_router(state.clone(), &[]);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            state,
            upload_dir,
        }
    }

    /// Create an account directly, bypassing the API.
    pub async fn create_user(&self, username: &str, role: Role) -> i64 {
        let repo = UserRepository::new(self.state.db.pool());
        let request =
            RegistrationRequest::new(format!("{username}@example.com"), username, PASSWORD);
        register_with_role(&repo, request, role)
            .await
            .expect("Failed to create user")
            .id
    }

    /// Log in through the API and return the access token.
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "username": username, "password": PASSWORD }))
            .await;
        response.assert_status_ok();

        response.json::<Value>()["data"]["access_token"]
            .as_str()
            .expect("No access token in response")
            .to_string()
    }

    /// Create an account and log in as it.
    pub async fn user_with_token(&self, username: &str, role: Role) -> (i64, String) {
        let id = self.create_user(username, role).await;
        let token = self.login(username).await;
        (id, token)
    }

    /// Count regular files below the upload directory.
    pub fn stored_file_count(&self) -> usize {
        count_files(self.upload_dir.path())
    }
}

/// Authorization header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Header name re-exported for test files.
pub const AUTH: axum::http::HeaderName = AUTHORIZATION;

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}
