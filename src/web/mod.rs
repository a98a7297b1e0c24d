//! Web API module for filestash.
//!
//! JSON over HTTP: authentication, user management, and file upload and
//! download. Every protected route authenticates with a bearer token.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
