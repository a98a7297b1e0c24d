//! Authentication module for filestash.
//!
//! This module provides password hashing, credential verification,
//! access tokens, registration, and permission checks.

mod credentials;
mod password;
pub mod permission;
mod registration;
pub mod token;
pub mod validation;

pub use credentials::authenticate;
pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use permission::PermissionError;
pub use registration::{register, register_with_role, RegistrationError, RegistrationRequest};
pub use token::{Principal, TokenError, TokenService};
pub use validation::ValidationError;
