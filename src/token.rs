//! Signed tokens for sessions, account activation and password reset.
//!
//! All three share one HS256 secret; the `purpose` claim keeps an activation
//! link from being replayed as a session and vice versa. `ver` carries the
//! user's token version at minting time, so a password change retires every
//! session and reset link issued before it.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const ACTIVATION_TTL_HOURS: i64 = 24;
pub const RESET_TTL_HOURS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Access,
    Activation,
    Reset,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub purpose: TokenPurpose,
    #[serde(default)]
    pub ver: i32,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))
    }
}

pub fn issue(
    secret: &str,
    user_id: Uuid,
    role: &str,
    version: i32,
    purpose: TokenPurpose,
    ttl: Duration,
) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        purpose,
        ver: version,
        exp: expiration.timestamp().max(0) as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Decode a token and check that it was minted for `purpose`.
pub fn verify(secret: &str, token: &str, purpose: TokenPurpose) -> AppResult<Claims> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    if decoded.claims.purpose != purpose {
        return Err(AppError::Unauthorized("Invalid or expired token".into()));
    }
    Ok(decoded.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn access_token_round_trips() {
        let id = Uuid::new_v4();
        let token = issue(SECRET, id, "manager", 3, TokenPurpose::Access, Duration::hours(1)).unwrap();
        let claims = verify(SECRET, &token, TokenPurpose::Access).unwrap();
        assert_eq!(claims.user_id().unwrap(), id);
        assert_eq!(claims.role, "manager");
        assert_eq!(claims.ver, 3);
    }

    #[test]
    fn purpose_mismatch_is_rejected() {
        let token = issue(
            SECRET,
            Uuid::new_v4(),
            "customer",
            0,
            TokenPurpose::Activation,
            Duration::hours(ACTIVATION_TTL_HOURS),
        )
        .unwrap();
        assert!(matches!(
            verify(SECRET, &token, TokenPurpose::Access),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue(
            SECRET,
            Uuid::new_v4(),
            "customer",
            0,
            TokenPurpose::Reset,
            Duration::hours(-2),
        )
        .unwrap();
        assert!(verify(SECRET, &token, TokenPurpose::Reset).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue(SECRET, Uuid::new_v4(), "customer", 0, TokenPurpose::Access, Duration::hours(1))
            .unwrap();
        assert!(verify("other", &token, TokenPurpose::Access).is_err());
    }
}
