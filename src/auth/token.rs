//! JWT access tokens.
//!
//! Tokens carry the user id (`sub`, decimal string), the role at issue
//! time, and `iat`/`exp` in seconds since the epoch. They are not stored
//! anywhere; validity is the signature plus expiry.

use std::str::FromStr;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::AuthConfig;
use crate::db::Role;
use crate::{Result, StashError};

/// Longest accepted access token lifetime (one year).
pub const MAX_LIFETIME_MINUTES: u64 = 60 * 24 * 365;

/// Token validation failure.
///
/// The concrete cause (expired, bad signature, malformed, ...) is only
/// logged, never returned to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token was not accepted.
    #[error("invalid or expired token")]
    InvalidToken,
}

impl From<TokenError> for StashError {
    fn from(_: TokenError) -> Self {
        StashError::AuthenticationRequired
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID as decimal string).
    pub sub: String,
    /// User role at issue time.
    pub role: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

/// Identity recovered from a valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// User ID.
    pub subject_id: i64,
    /// Role claim.
    pub role: Role,
}

/// Issues and validates access tokens.
///
/// Built once at startup from the immutable auth configuration.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    lifetime_secs: i64,
}

impl TokenService {
    /// Create a token service.
    ///
    /// Fails with a configuration error when the secret is empty or the
    /// algorithm is not one of `HS256`, `HS384`, `HS512`.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        if config.secret_key.is_empty() {
            return Err(StashError::Config("SECRET_KEY must not be empty".to_string()));
        }

        let algorithm = Algorithm::from_str(&config.algorithm)
            .map_err(|_| StashError::Config(format!("unknown algorithm: {}", config.algorithm)))?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(StashError::Config(format!(
                "unsupported algorithm {}: only HS256, HS384 and HS512 are allowed",
                config.algorithm
            )));
        }

        if config.access_token_expire_minutes > MAX_LIFETIME_MINUTES {
            return Err(StashError::Config(format!(
                "token lifetime of {} minutes exceeds the maximum of {} minutes",
                config.access_token_expire_minutes, MAX_LIFETIME_MINUTES
            )));
        }
        let lifetime_secs = i64::try_from(config.access_token_expire_minutes)
            .ok()
            .and_then(|m| m.checked_mul(60))
            .ok_or_else(|| StashError::Config("token lifetime is too large".to_string()))?;

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            algorithm,
            validation,
            lifetime_secs,
        })
    }

    /// Token lifetime in seconds.
    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    /// Issue a token for `subject_id` valid from now.
    pub fn issue(&self, subject_id: i64, role: Role) -> Result<String> {
        self.issue_at(subject_id, role, Utc::now().timestamp())
    }

    /// Issue a token as if it had been created at `issued_at` (epoch seconds).
    pub fn issue_at(&self, subject_id: i64, role: Role, issued_at: i64) -> Result<String> {
        let exp = issued_at
            .checked_add(self.lifetime_secs)
            .ok_or_else(|| StashError::Config("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: subject_id.to_string(),
            role: role.as_str().to_string(),
            iat: issued_at,
            exp,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| StashError::Config(format!("failed to sign token: {e}")))
    }

    /// Validate a token and extract its principal.
    pub fn validate(&self, token: &str) -> std::result::Result<Principal, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!("Token rejected: {}", e);
            TokenError::InvalidToken
        })?;

        let subject_id = data.claims.sub.parse::<i64>().map_err(|_| {
            debug!(sub = %data.claims.sub, "Token rejected: unparsable subject");
            TokenError::InvalidToken
        })?;

        let role = Role::from_str(&data.claims.role).map_err(|_| {
            debug!(role = %data.claims.role, "Token rejected: unknown role");
            TokenError::InvalidToken
        })?;

        Ok(Principal { subject_id, role })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config(secret: &str, algorithm: &str) -> AuthConfig {
        AuthConfig {
            secret_key: secret.to_string(),
            algorithm: algorithm.to_string(),
            access_token_expire_minutes: 60,
        }
    }

    fn service() -> TokenService {
        TokenService::new(&auth_config("test-secret", "HS256")).unwrap()
    }

    #[test]
    fn test_issue_and_validate() {
        let svc = service();
        let token = svc.issue(42, Role::Admin).unwrap();

        let principal = svc.validate(&token).unwrap();
        assert_eq!(
            principal,
            Principal {
                subject_id: 42,
                role: Role::Admin
            }
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = service();
        let issued_at = Utc::now().timestamp() - svc.lifetime_secs() - 5;
        let token = svc.issue_at(1, Role::User, issued_at).unwrap();

        assert_eq!(svc.validate(&token).unwrap_err(), TokenError::InvalidToken);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().issue(1, Role::User).unwrap();
        let other = TokenService::new(&auth_config("other-secret", "HS256")).unwrap();

        assert_eq!(other.validate(&token).unwrap_err(), TokenError::InvalidToken);
    }

    #[test]
    fn test_wrong_algorithm_rejected() {
        let token = TokenService::new(&auth_config("test-secret", "HS512"))
            .unwrap()
            .issue(1, Role::User)
            .unwrap();

        assert_eq!(
            service().validate(&token).unwrap_err(),
            TokenError::InvalidToken
        );
    }

    #[test]
    fn test_malformed_token_rejected() {
        let svc = service();
        assert_eq!(
            svc.validate("not.a.token").unwrap_err(),
            TokenError::InvalidToken
        );
        assert_eq!(svc.validate("").unwrap_err(), TokenError::InvalidToken);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let svc = service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "1".to_string(),
            role: "superuser".to_string(),
            iat: now,
            exp: now + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(svc.validate(&token).unwrap_err(), TokenError::InvalidToken);
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let svc = service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "alice".to_string(),
            role: "user".to_string(),
            iat: now,
            exp: now + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(svc.validate(&token).unwrap_err(), TokenError::InvalidToken);
    }

    #[test]
    fn test_empty_secret_refused() {
        let result = TokenService::new(&auth_config("", "HS256"));
        assert!(matches!(result, Err(StashError::Config(_))));
    }

    #[test]
    fn test_oversized_lifetime_refused() {
        let config = AuthConfig {
            access_token_expire_minutes: (i64::MAX / 60) as u64,
            ..auth_config("secret", "HS256")
        };
        assert!(matches!(
            TokenService::new(&config),
            Err(StashError::Config(_))
        ));

        let config = AuthConfig {
            access_token_expire_minutes: MAX_LIFETIME_MINUTES,
            ..auth_config("secret", "HS256")
        };
        let svc = TokenService::new(&config).unwrap();
        let token = svc.issue(1, Role::User).unwrap();
        assert_eq!(svc.validate(&token).unwrap().subject_id, 1);
    }

    #[test]
    fn test_issue_at_expiry_overflow() {
        let svc = service();
        let result = svc.issue_at(1, Role::User, i64::MAX - 1);
        assert!(matches!(result, Err(StashError::Config(_))));
    }

    #[test]
    fn test_non_hmac_algorithm_refused() {
        assert!(matches!(
            TokenService::new(&auth_config("secret", "RS256")),
            Err(StashError::Config(_))
        ));
        assert!(matches!(
            TokenService::new(&auth_config("secret", "none")),
            Err(StashError::Config(_))
        ));
    }

    #[test]
    fn test_claims_shape() {
        let svc = service();
        let token = svc.issue(7, Role::User).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims.sub, "7");
        assert_eq!(data.claims.role, "user");
        assert_eq!(data.claims.exp - data.claims.iat, 3600);
    }
}
