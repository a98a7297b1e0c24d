//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::{not_empty_trimmed, valid_username};
use crate::db::Role;

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 6, max = 72, message = "Password must be 6 to 72 characters"))]
    pub password: String,
}

/// User registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address.
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// Username.
    #[validate(custom(function = "valid_username"))]
    pub username: String,
    /// Password.
    #[validate(length(min = 6, max = 72, message = "Password must be 6 to 72 characters"))]
    pub password: String,
}

/// Self-service profile update. At least one field must be present.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMeRequest {
    /// New email address.
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    /// New username.
    #[serde(default)]
    #[validate(custom(function = "valid_username"))]
    pub username: Option<String>,
    /// New password.
    #[serde(default)]
    #[validate(length(min = 6, max = 72, message = "Password must be 6 to 72 characters"))]
    pub password: Option<String>,
}

/// Administrative user update. At least one field must be present.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    /// New email address.
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    /// New username.
    #[serde(default)]
    #[validate(custom(function = "valid_username"))]
    pub username: Option<String>,
    /// New password.
    #[serde(default)]
    #[validate(length(min = 6, max = 72, message = "Password must be 6 to 72 characters"))]
    pub password: Option<String>,
    /// New role (`user` or `admin`).
    #[serde(default)]
    pub role: Option<Role>,
    /// New active flag.
    #[serde(default)]
    pub is_active: Option<bool>,
}
