//! Bearer token authentication extractors.
//!
//! Every protected handler takes [`CurrentUser`] or [`AdminUser`]. The
//! token only names the user; the user record is loaded fresh on each
//! request, so deactivation and role changes apply immediately.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;

use crate::auth::permission::{ensure_active, require_admin};
use crate::db::{User, UserRepository};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::StashError;

/// Extractor for an authenticated, active user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Missing header and non-Bearer schemes both end up here.
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| {
                debug!("No bearer credentials: {}", e);
                ApiError::from(StashError::AuthenticationRequired)
            })?;

        let principal = state
            .tokens
            .validate(bearer.token())
            .map_err(StashError::from)?;

        let user = UserRepository::new(state.db.pool())
            .get_by_id(principal.subject_id)
            .await?
            .ok_or_else(|| {
                debug!(user_id = principal.subject_id, "Token subject no longer exists");
                StashError::AuthenticationRequired
            })?;

        ensure_active(Some(&user)).map_err(StashError::from)?;

        Ok(CurrentUser(user))
    }
}

/// Extractor for an authenticated, active administrator.
///
/// The role is taken from the stored user, not from the token claim.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_admin(Some(&user)).map_err(StashError::from)?;
        Ok(AdminUser(user))
    }
}
