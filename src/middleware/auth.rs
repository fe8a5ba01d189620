use axum::{extract::FromRequestParts, http::header};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entity::users::Entity as Users,
    error::{AppError, AppResult},
    models::Role,
    state::AppState,
    token::{self, TokenPurpose},
};

pub const SESSION_COOKIE: &str = "access_token";

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_manager(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Manager)
}

pub fn ensure_staff(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_staff() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// The user themself, or a manager acting on their behalf.
pub fn ensure_self_or_manager(user: &AuthUser, target: Uuid) -> Result<(), AppError> {
    if user.user_id == target || user.role == Role::Manager {
        return Ok(());
    }
    Err(AppError::Forbidden)
}

pub fn session_cookie(config: &AppConfig, token: &str) -> String {
    let max_age = config.session_ttl_hours * 3600;
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}"
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie(config: &AppConfig) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn bearer_token(parts: &axum::http::request::Parts) -> Result<Option<String>, AppError> {
    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    if !auth_str.starts_with("Bearer ") {
        return Err(AppError::Unauthorized("Invalid Authorization scheme".into()));
    }
    Ok(Some(auth_str.trim_start_matches("Bearer ").trim().to_string()))
}

fn cookie_token(parts: &axum::http::request::Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| find_cookie(raw, SESSION_COOKIE))
}

fn find_cookie(raw: &str, name: &str) -> Option<String> {
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

/// Resolve an access token to the account behind it.
///
/// Role and active flag are read from the users table on every request, so
/// a demotion or deactivation takes effect immediately. A token minted before
/// the last password change no longer matches `token_version`.
pub async fn authenticate(state: &AppState, token: &str) -> AppResult<AuthUser> {
    let claims = token::verify(&state.config.jwt_secret, token, TokenPurpose::Access)?;
    let account = Users::find_by_id(claims.user_id()?)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))?;

    if account.token_version != claims.ver {
        return Err(AppError::Unauthorized("Session has expired".into()));
    }
    if !account.is_active {
        return Err(AppError::Forbidden);
    }
    let role = account
        .role
        .parse::<Role>()
        .map_err(|_| AppError::Unauthorized("Invalid role on account".into()))?;

    Ok(AuthUser {
        user_id: account.id,
        role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(parts)? {
            Some(token) => token,
            None => cookie_token(parts)
                .ok_or_else(|| AppError::Unauthorized("Missing credentials".into()))?,
        };
        authenticate(state, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn finds_session_cookie_among_others() {
        let raw = "theme=dark; access_token=abc.def.ghi; lang=vi";
        assert_eq!(find_cookie(raw, SESSION_COOKIE).as_deref(), Some("abc.def.ghi"));
        assert_eq!(find_cookie("access_token=", SESSION_COOKIE), None);
        assert_eq!(find_cookie("other=1", SESSION_COOKIE), None);
    }

    #[test]
    fn role_guards() {
        assert!(ensure_staff(&user(Role::Employee)).is_ok());
        assert!(ensure_staff(&user(Role::Customer)).is_err());
        assert!(ensure_manager(&user(Role::Employee)).is_err());
        assert!(ensure_manager(&user(Role::Manager)).is_ok());
    }

    #[test]
    fn self_or_manager_guard() {
        let customer = user(Role::Customer);
        assert!(ensure_self_or_manager(&customer, customer.user_id).is_ok());
        assert!(ensure_self_or_manager(&customer, Uuid::new_v4()).is_err());
        assert!(ensure_self_or_manager(&user(Role::Manager), Uuid::new_v4()).is_ok());
    }

    #[test]
    fn secure_flag_follows_config() {
        let mut config = AppConfig::for_database("postgres://localhost/test");
        assert!(!session_cookie(&config, "t").contains("Secure"));
        config.cookie_secure = true;
        let cookie = session_cookie(&config, "t");
        assert!(cookie.starts_with("access_token=t;"));
        assert!(cookie.ends_with("; Secure"));
        assert!(clear_session_cookie(&config).contains("Max-Age=0"));
    }
}
