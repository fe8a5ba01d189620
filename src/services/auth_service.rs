use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{
        ActivateRequest, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
        LoginResponse, RegisterRequest, ResetPasswordRequest,
    },
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    mailer::Email,
    middleware::auth::AuthUser,
    models::{Role, User},
    response::{ApiResponse, Meta},
    state::AppState,
    token::{self, ACTIVATION_TTL_HOURS, RESET_TTL_HOURS, TokenPurpose},
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password_hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::BadRequest("email is invalid".into()));
    }
    Ok(email)
}

pub async fn find_by_email(state: &AppState, email: &str) -> AppResult<Option<UserModel>> {
    let user = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(&state.orm)
        .await?;
    Ok(user)
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let email = normalize_email(&payload.email)?;
    let full_name = payload.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(AppError::BadRequest("full_name is required".into()));
    }
    validate_password(&payload.password)?;

    if find_by_email(state, &email).await?.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        full_name: Set(full_name),
        email: Set(email),
        password_hash: Set(hash_password(&payload.password)?),
        phone: Set(payload.phone),
        address: Set(None),
        birthday: Set(None),
        role: Set(Role::Customer.as_str().to_string()),
        is_active: Set(false),
        avatar_url: Set(None),
        token_version: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    let activation = token::issue(
        &state.config.jwt_secret,
        user.id,
        &user.role,
        user.token_version,
        TokenPurpose::Activation,
        Duration::hours(ACTIVATION_TTL_HOURS),
    )?;
    send_mail(
        state,
        &user.email,
        "Activate your account",
        format!(
            "Welcome {}! Activate your account: {}/activate?token={}",
            user.full_name, state.config.public_url, activation
        ),
    );

    audit::record(
        &state.pool,
        user.id,
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("User created", User::try_from(user)?, None))
}

pub async fn activate_account(
    state: &AppState,
    payload: ActivateRequest,
) -> AppResult<ApiResponse<User>> {
    let claims = token::verify(
        &state.config.jwt_secret,
        &payload.token,
        TokenPurpose::Activation,
    )?;
    let user = Users::find_by_id(claims.user_id()?)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let user = if user.is_active {
        user
    } else {
        let mut active: UserActive = user.into();
        active.is_active = Set(true);
        active.updated_at = Set(Utc::now().into());
        active.update(&state.orm).await?
    };

    tracing::info!(user_id = %user.id, "account activated");
    Ok(ApiResponse::success(
        "Account activated",
        User::try_from(user)?,
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let email = payload.email.trim().to_lowercase();
    let user = match find_by_email(state, &email).await? {
        Some(u) => u,
        None => return Err(AppError::BadRequest("Invalid email or password".into())),
    };

    if !verify_password(&user.password_hash, &payload.password)? {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }
    if !user.is_active {
        return Err(AppError::Forbidden);
    }

    let token = token::issue(
        &state.config.jwt_secret,
        user.id,
        &user.role,
        user.token_version,
        TokenPurpose::Access,
        Duration::hours(state.config.session_ttl_hours),
    )?;

    audit::record(
        &state.pool,
        user.id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token,
            user: User::try_from(user)?,
        },
        Some(Meta::empty()),
    ))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))?;
    if !model.is_active {
        return Err(AppError::Forbidden);
    }
    Ok(ApiResponse::success("OK", User::try_from(model)?, None))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    validate_password(&payload.new_password)?;
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if !verify_password(&model.password_hash, &payload.old_password)? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    set_password(state, model, &payload.new_password).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "password_change",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::done("Password changed"))
}

/// Always succeeds so the response does not reveal which emails exist.
pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = payload.email.trim().to_lowercase();
    if let Some(user) = find_by_email(state, &email).await? {
        let reset = token::issue(
            &state.config.jwt_secret,
            user.id,
            &user.role,
            user.token_version,
            TokenPurpose::Reset,
            Duration::hours(RESET_TTL_HOURS),
        )?;
        send_mail(
            state,
            &user.email,
            "Reset your password",
            format!(
                "Reset your password within {RESET_TTL_HOURS} hour: {}/reset-password?token={}",
                state.config.public_url, reset
            ),
        );
    } else {
        tracing::debug!("password reset requested for unknown email");
    }

    Ok(ApiResponse::done(
        "If the account exists, a reset link has been sent",
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    validate_password(&payload.new_password)?;
    let claims = token::verify(&state.config.jwt_secret, &payload.token, TokenPurpose::Reset)?;
    let model = Users::find_by_id(claims.user_id()?)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    // A used link, or one issued before a later password change, is stale.
    if claims.ver != model.token_version {
        return Err(AppError::Unauthorized("Invalid or expired token".into()));
    }
    let user_id = model.id;
    set_password(state, model, &payload.new_password).await?;

    audit::record(
        &state.pool,
        user_id,
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::done("Password has been reset"))
}

/// Store a new password hash and retire every token minted for the old one.
pub async fn set_password(
    state: &AppState,
    model: UserModel,
    new_password: &str,
) -> AppResult<UserModel> {
    let next_version = model.token_version.wrapping_add(1);
    let mut active: UserActive = model.into();
    active.password_hash = Set(hash_password(new_password)?);
    active.token_version = Set(next_version);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(&state.orm).await?)
}

fn send_mail(state: &AppState, to: &str, subject: &str, body: String) {
    let email = Email {
        to: to.to_string(),
        subject: subject.to_string(),
        body,
    };
    if let Err(err) = state.mailer.send(email) {
        tracing::warn!(error = %err, to, "sending email failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(verify_password(&hash, "s3cret!").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            normalize_email("  Jane@Example.COM ").unwrap(),
            "jane@example.com"
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
    }
}
