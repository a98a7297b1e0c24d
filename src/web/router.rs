//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_file, delete_user, download_file, get_file, get_me, get_user, health, list_files,
    list_users, login, register_user, update_me, update_user, upload_file, AppState,
};
use super::middleware::create_cors_layer;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let auth_routes = Router::new().route("/login", post(login));

    let user_routes = Router::new()
        .route("/", get(list_users).post(register_user))
        .route("/me", get(get_me).put(update_me))
        .route("/:id", get(get_user).put(update_user).delete(delete_user));

    // The ingestor enforces the upload ceiling while streaming.
    let file_routes = Router::new()
        .route("/", get(list_files))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route("/:id", get(get_file).delete(delete_file))
        .route("/:id/download", get(download_file));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/files", file_routes);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}
