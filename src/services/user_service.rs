use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::users::{
        AvatarRequest, CreateUserRequest, ResetUserPasswordRequest, UpdateUserRequest, UserList,
        UserSummary,
    },
    entity::users::{ActiveModel, Column, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_manager, ensure_self_or_manager},
    models::{Role, User, stored},
    response::{ApiResponse, Meta},
    routes::params::UserListQuery,
    services::{
        auth_service::{find_by_email, hash_password, normalize_email, set_password, validate_password},
        contains_pattern,
    },
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_manager(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(role) = query.role {
        condition = condition.add(Column::Role.eq(role.as_str()));
    }
    if let Some(is_active) = query.is_active {
        condition = condition.add(Column::IsActive.eq(is_active));
    }
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::FullName).ilike(pattern.clone()))
                .add(Expr::col(Column::Email).ilike(pattern)),
        );
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_user(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    ensure_self_or_manager(user, id)?;
    let model = find_user(state, id).await?;
    Ok(ApiResponse::success("OK", User::try_from(model)?, None))
}

/// Back-office account creation; the account is usable immediately.
pub async fn create_user(
    state: &AppState,
    user: &AuthUser,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_manager(user)?;
    let email = normalize_email(&payload.email)?;
    let full_name = required_name(&payload.full_name)?;
    validate_password(&payload.password)?;
    if find_by_email(state, &email).await?.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let now = Utc::now();
    let created = ActiveModel {
        id: Set(Uuid::new_v4()),
        full_name: Set(full_name),
        email: Set(email),
        password_hash: Set(hash_password(&payload.password)?),
        phone: Set(payload.phone),
        address: Set(payload.address),
        birthday: Set(payload.birthday),
        role: Set(payload.role.as_str().to_string()),
        is_active: Set(true),
        avatar_url: Set(None),
        token_version: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "user_create",
        "users",
        serde_json::json!({ "user_id": created.id, "role": created.role }),
    )
    .await;

    Ok(ApiResponse::success(
        "User created",
        User::try_from(created)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_self_or_manager(user, id)?;
    let is_manager = user.role == Role::Manager;
    if !is_manager && (payload.role.is_some() || payload.is_active.is_some()) {
        return Err(AppError::Forbidden);
    }
    let full_name = required_name(&payload.full_name)?;
    let existing = find_user(state, id).await?;

    let mut active: ActiveModel = existing.into();
    active.full_name = Set(full_name);
    active.phone = Set(payload.phone);
    active.address = Set(payload.address);
    active.birthday = Set(payload.birthday);
    if let Some(role) = payload.role {
        active.role = Set(role.as_str().to_string());
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "user_update",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User updated",
        User::try_from(updated)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_avatar(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AvatarRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_self_or_manager(user, id)?;
    let url = payload.avatar_url.trim();
    if url.is_empty() {
        return Err(AppError::BadRequest("avatar_url must not be empty".into()));
    }
    let existing = find_user(state, id).await?;

    let mut active: ActiveModel = existing.into();
    active.avatar_url = Set(Some(url.to_string()));
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "user_avatar",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Avatar updated",
        User::try_from(updated)?,
        Some(Meta::empty()),
    ))
}

pub async fn reset_user_password(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ResetUserPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_manager(user)?;
    validate_password(&payload.new_password)?;
    let existing = find_user(state, id).await?;
    set_password(state, existing, &payload.new_password).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "user_password_reset",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::done("Password reset"))
}

pub async fn user_summary(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<UserSummary>> {
    ensure_manager(user)?;
    let rows: Vec<(String, bool, i64)> = sqlx::query_as(
        r#"
        SELECT role, is_active, COUNT(*)::BIGINT
        FROM users
        GROUP BY role, is_active
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success("User summary", tally(rows)?, None))
}

fn tally(rows: Vec<(String, bool, i64)>) -> AppResult<UserSummary> {
    let mut summary = UserSummary::default();
    for (role, is_active, count) in rows {
        summary.total += count;
        match stored::<Role>(&role)? {
            Role::Customer => summary.customers += count,
            Role::Employee => summary.employees += count,
            Role::Manager => summary.managers += count,
        }
        if is_active {
            summary.active += count;
        } else {
            summary.inactive += count;
        }
    }
    Ok(summary)
}

async fn find_user(state: &AppState, id: Uuid) -> AppResult<UserModel> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

fn required_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("full_name is required".into()));
    }
    Ok(name.to_string())
}
