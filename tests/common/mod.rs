#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use jewelry_store_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::catalog::CreateProductRequest,
    entity::{categories::ActiveModel as CategoryActive, users::ActiveModel as UserActive},
    mailer::MemoryMailer,
    middleware::auth::AuthUser,
    models::Role,
    services::product_service,
    state::AppState,
    token::{self, TokenPurpose},
};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

/// Returns `None` when no database is configured so the caller can skip.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests."
            );
            None
        }
    }
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<(AppState, Arc<MemoryMailer>)> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    let mailer = Arc::new(MemoryMailer::default());
    let config = AppConfig::for_database(database_url);
    let state = AppState::with_mailer(pool, config, mailer.clone());
    Ok((state, mailer))
}

/// Tests share one database and run in parallel, so every fixture gets unique names.
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

pub async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        full_name: Set(unique("user")),
        email: Set(format!("{}@example.com", unique(role.as_str()))),
        password_hash: Set("dummy".into()),
        phone: Set(None),
        address: Set(None),
        birthday: Set(None),
        role: Set(role.as_str().to_string()),
        is_active: Set(true),
        avatar_url: Set(None),
        token_version: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub async fn create_category(state: &AppState) -> anyhow::Result<Uuid> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(unique("category")),
    }
    .insert(&state.orm)
    .await?;
    Ok(category.id)
}

pub async fn create_product(
    state: &AppState,
    manager: &AuthUser,
    category_id: Uuid,
    price: i64,
    quantity: i32,
) -> anyhow::Result<Uuid> {
    let resp = product_service::create_product(
        state,
        manager,
        CreateProductRequest {
            name: unique("product"),
            material: Some("18K gold".into()),
            description: None,
            price,
            quantity: Some(quantity),
            category_id,
            images: vec![],
            gemstones: vec![],
        },
    )
    .await?;
    let detail = resp.data.ok_or_else(|| anyhow::anyhow!("missing product"))?;
    Ok(detail.product.id)
}

pub async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let resp = product_service::get_inventory(state, product_id).await?;
    Ok(resp.data.ok_or_else(|| anyhow::anyhow!("missing inventory"))?.quantity)
}

/// Session token for a fixture user that has never changed its password.
pub fn access_token(state: &AppState, user: &AuthUser) -> anyhow::Result<String> {
    Ok(token::issue(
        &state.config.jwt_secret,
        user.user_id,
        user.role.as_str(),
        0,
        TokenPurpose::Access,
        Duration::hours(1),
    )?)
}
