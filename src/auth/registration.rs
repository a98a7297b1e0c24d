//! User registration for filestash.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{validate_email, validate_username, ValidationError};
use crate::auth::{hash_password, PasswordError};
use crate::db::{NewUser, Role, User, UserRepository};
use crate::StashError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Password rejected or hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Email or username already taken.
    #[error("{0}")]
    Conflict(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<StashError> for RegistrationError {
    fn from(e: StashError) -> Self {
        match e {
            StashError::Conflict(msg) => RegistrationError::Conflict(msg),
            other => RegistrationError::Database(other.to_string()),
        }
    }
}

impl From<RegistrationError> for StashError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::Validation(v) => StashError::Validation(v.to_string()),
            RegistrationError::Password(p) => p.into(),
            RegistrationError::Conflict(msg) => StashError::Conflict(msg),
            RegistrationError::Database(msg) => StashError::Database(msg),
        }
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Email address.
    pub email: String,
    /// Desired username.
    pub username: String,
    /// Password (6-72 characters).
    pub password: String,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Register a new user with the `user` role.
///
/// Uniqueness is left to the datastore: a concurrent registration that
/// loses the race is reported as [`RegistrationError::Conflict`].
pub async fn register(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
) -> std::result::Result<User, RegistrationError> {
    register_with_role(repo, request, Role::User).await
}

/// Register a new user with a caller-chosen role.
///
/// The HTTP surface never reaches this with anything but [`Role::User`];
/// administrators are created by calling it directly against the datastore.
pub async fn register_with_role(
    repo: &UserRepository<'_>,
    request: RegistrationRequest,
    role: Role,
) -> std::result::Result<User, RegistrationError> {
    validate_email(&request.email)?;
    validate_username(&request.username)?;

    let password_hash = hash_password(&request.password)?;

    let new_user =
        NewUser::new(&request.email, &request.username, password_hash).with_role(role);
    let user = repo.create(&new_user).await?;

    info!(
        username = %user.username,
        user_id = user.id,
        role = %user.role,
        "New user registered"
    );

    Ok(user)
}
