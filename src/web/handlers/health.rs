//! Health check handler.

use axum::Json;

use crate::web::dto::HealthResponse;

/// GET /health - Liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
