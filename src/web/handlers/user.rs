//! User handlers for Web API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::{hash_password, register, RegistrationRequest};
use crate::db::{UserRepository, UserUpdate};
use crate::file::FileService;
use crate::web::dto::{
    AdminUpdateUserRequest, ApiResponse, RegisterRequest, UpdateMeRequest, UserResponse,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AdminUser, CurrentUser};
use crate::StashError;

const EMPTY_UPDATE: &str = "No fields to update";

/// POST /api/users - Register a new account.
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let repo = UserRepository::new(state.db.pool());
    let request = RegistrationRequest::new(req.email, req.username, req.password);

    let user = register(&repo, request)
        .await
        .map_err(StashError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserResponse::from(user))),
    ))
}

/// GET /api/users/me - Current user's profile.
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::new(UserResponse::from(user)))
}

/// PUT /api/users/me - Update the current user's profile.
///
/// Role and active flag cannot be changed here.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateMeRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let mut update = UserUpdate::new();
    if let Some(email) = req.email {
        update = update.email(email);
    }
    if let Some(username) = req.username {
        update = update.username(username);
    }
    if let Some(password) = req.password {
        update = update.password_hash(hash_password(&password).map_err(StashError::from)?);
    }

    if update.is_empty() {
        return Err(ApiError::bad_request(EMPTY_UPDATE));
    }

    let updated = UserRepository::new(state.db.pool())
        .update(user.id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::new(UserResponse::from(updated))))
}

/// GET /api/users - List all users (admin).
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let users = UserRepository::new(state.db.pool()).list_all().await?;
    let users = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(ApiResponse::new(users)))
}

/// GET /api/users/:id - Get a user (admin).
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = UserRepository::new(state.db.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::new(UserResponse::from(user))))
}

/// PUT /api/users/:id - Update any field of a user (admin).
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<AdminUpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let mut update = UserUpdate::new();
    if let Some(email) = req.email {
        update = update.email(email);
    }
    if let Some(username) = req.username {
        update = update.username(username);
    }
    if let Some(password) = req.password {
        update = update.password_hash(hash_password(&password).map_err(StashError::from)?);
    }
    if let Some(role) = req.role {
        update = update.role(role);
    }
    if let Some(is_active) = req.is_active {
        update = update.is_active(is_active);
    }

    if update.is_empty() {
        return Err(ApiError::bad_request(EMPTY_UPDATE));
    }

    let updated = UserRepository::new(state.db.pool())
        .update(user_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!(admin_id = admin.id, user_id, "User updated by admin");

    Ok(Json(ApiResponse::new(UserResponse::from(updated))))
}

/// DELETE /api/users/:id - Delete a user and everything they own (admin).
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let repo = UserRepository::new(state.db.pool());
    if repo.get_by_id(user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    FileService::new(state.db.pool(), &state.storage)
        .purge_owner(user_id)
        .await?;

    // File records go with the user through the foreign key cascade.
    if !repo.delete(user_id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(admin_id = admin.id, user_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}
