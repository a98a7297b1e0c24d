//! Middleware and request guards for Web API.

pub mod auth;
pub mod cors;

pub use auth::{AdminUser, CurrentUser};
pub use cors::create_cors_layer;
