//! Username/password verification.

use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::auth::verify_password;
use crate::db::{User, UserRepository};
use crate::Result;

/// Hash checked when the username is unknown, so that a miss costs the
/// same Argon2 work as a wrong password.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| crate::auth::hash_password("filestash-dummy-password").ok())
        .as_deref()
}

/// Verify a username/password pair.
///
/// Returns the matching active user. Unknown username, wrong password, and
/// inactive account all return `Ok(None)`; callers cannot tell them apart.
/// Datastore failures are returned as errors.
pub async fn authenticate(
    repo: &UserRepository<'_>,
    username: &str,
    password: &str,
) -> Result<Option<User>> {
    let Some(user) = repo.get_by_username(username).await? else {
        if let Some(hash) = dummy_hash() {
            let _ = verify_password(password, hash);
        }
        debug!(username = %username, "Login failed: unknown user");
        return Ok(None);
    };

    if verify_password(password, &user.password_hash).is_err() {
        warn!(username = %username, user_id = user.id, "Login failed: wrong password");
        return Ok(None);
    }

    if !user.is_active {
        warn!(username = %username, user_id = user.id, "Login failed: account inactive");
        return Ok(None);
    }

    Ok(Some(user))
}
