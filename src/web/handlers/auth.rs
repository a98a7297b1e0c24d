//! Authentication handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::auth::authenticate;
use crate::db::UserRepository;
use crate::web::dto::{ApiResponse, LoginRequest, LoginResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// POST /api/auth/login - Exchange credentials for an access token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let repo = UserRepository::new(state.db.pool());

    let user = authenticate(&repo, &req.username, &req.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Could not validate credentials"))?;

    let access_token = state.tokens.issue(user.id, user.role)?;

    tracing::info!(user_id = user.id, username = %user.username, "User logged in");

    Ok(Json(ApiResponse::new(LoginResponse::bearer(
        access_token,
        state.tokens.lifetime_secs(),
    ))))
}
