//! Permission checking for filestash.
//!
//! Role and ownership checks applied after a user has been loaded from
//! the bearer token. Every check reads the current user record, so a role
//! change or deactivation takes effect on the next request.

use thiserror::Error;

use crate::db::User;
use crate::StashError;

/// Permission-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// No user could be derived from the request.
    #[error("authentication required")]
    NotAuthenticated,

    /// User account is not active.
    #[error("account is inactive")]
    AccountInactive,

    /// Operation requires the administrator role.
    #[error("administrator role required")]
    AdminRequired,

    /// User is neither the owner of the resource nor an administrator.
    #[error("not allowed to access this resource")]
    NotOwner,
}

impl From<PermissionError> for StashError {
    fn from(e: PermissionError) -> Self {
        match e {
            PermissionError::NotAuthenticated => StashError::AuthenticationRequired,
            PermissionError::AccountInactive => StashError::AccountInactive,
            PermissionError::AdminRequired | PermissionError::NotOwner => {
                StashError::Forbidden(e.to_string())
            }
        }
    }
}

/// Require an authenticated, active user.
///
/// # Examples
///
/// ```
/// use filestash::auth::permission::{ensure_active, PermissionError};
///
/// assert!(matches!(ensure_active(None), Err(PermissionError::NotAuthenticated)));
/// ```
pub fn ensure_active(user: Option<&User>) -> Result<&User, PermissionError> {
    let user = user.ok_or(PermissionError::NotAuthenticated)?;
    if !user.is_active {
        return Err(PermissionError::AccountInactive);
    }
    Ok(user)
}

/// Require an active administrator.
pub fn require_admin(user: Option<&User>) -> Result<&User, PermissionError> {
    let user = ensure_active(user)?;
    if !user.is_admin() {
        return Err(PermissionError::AdminRequired);
    }
    Ok(user)
}

/// Check if a user may read or delete a resource owned by `owner_id`.
///
/// Rules:
/// - The owner is always allowed.
/// - Administrators are allowed on any resource.
pub fn can_access_resource(user: &User, owner_id: i64) -> bool {
    user.id == owner_id || user.is_admin()
}

/// Guard a resource owned by `owner_id`.
///
/// Combines [`ensure_active`] and [`can_access_resource`].
pub fn authorize_resource(user: Option<&User>, owner_id: i64) -> Result<(), PermissionError> {
    let user = ensure_active(user)?;
    if !can_access_resource(user, owner_id) {
        return Err(PermissionError::NotOwner);
    }
    Ok(())
}
