use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::catalog::{CreateGemstoneRequest, GemstoneInput, GemstoneList},
    entity::gemstones::{ActiveModel, Column, Entity as Gemstones},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_manager},
    models::Gemstone,
    response::{ApiResponse, Meta},
    services::product_service::ensure_product,
    state::AppState,
};

pub fn validate_gemstone(input: &GemstoneInput) -> AppResult<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("gemstone name is required".into()));
    }
    if !input.weight.is_finite() || input.weight <= 0.0 {
        return Err(AppError::BadRequest(
            "gemstone weight must be a positive number".into(),
        ));
    }
    Ok(())
}

pub async fn list_gemstones(
    state: &AppState,
    product_id: Uuid,
) -> AppResult<ApiResponse<GemstoneList>> {
    ensure_product(&state.orm, product_id).await?;
    let items = Gemstones::find()
        .filter(Column::ProductId.eq(product_id))
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Gemstone::from)
        .collect();
    Ok(ApiResponse::success("Gemstones", GemstoneList { items }, None))
}

pub async fn create_gemstone(
    state: &AppState,
    user: &AuthUser,
    payload: CreateGemstoneRequest,
) -> AppResult<ApiResponse<Gemstone>> {
    ensure_manager(user)?;
    validate_gemstone(&payload.gemstone)?;
    ensure_product(&state.orm, payload.product_id).await?;

    let GemstoneInput {
        name,
        weight,
        size,
        color,
    } = payload.gemstone;
    let gemstone = ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(payload.product_id),
        name: Set(name.trim().to_string()),
        weight: Set(weight),
        size: Set(size),
        color: Set(color),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "gemstone_create",
        "gemstones",
        serde_json::json!({ "gemstone_id": gemstone.id, "product_id": gemstone.product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Gemstone created",
        Gemstone::from(gemstone),
        Some(Meta::empty()),
    ))
}

pub async fn update_gemstone(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: GemstoneInput,
) -> AppResult<ApiResponse<Gemstone>> {
    ensure_manager(user)?;
    validate_gemstone(&payload)?;

    let existing = Gemstones::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(payload.name.trim().to_string());
    active.weight = Set(payload.weight);
    active.size = Set(payload.size);
    active.color = Set(payload.color);
    let gemstone = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "gemstone_update",
        "gemstones",
        serde_json::json!({ "gemstone_id": gemstone.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Gemstone updated",
        Gemstone::from(gemstone),
        Some(Meta::empty()),
    ))
}

pub async fn delete_gemstone(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_manager(user)?;
    let result = Gemstones::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "gemstone_delete",
        "gemstones",
        serde_json::json!({ "gemstone_id": id }),
    )
    .await;

    Ok(ApiResponse::done("Gemstone deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, weight: f64) -> GemstoneInput {
        GemstoneInput {
            name: name.into(),
            weight,
            size: None,
            color: Some("red".into()),
        }
    }

    #[test]
    fn accepts_positive_weight() {
        assert!(validate_gemstone(&input("Ruby", 0.35)).is_ok());
    }

    #[test]
    fn rejects_non_positive_or_non_finite_weight() {
        for weight in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                validate_gemstone(&input("Ruby", weight)),
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn requires_name() {
        assert!(validate_gemstone(&input("  ", 1.0)).is_err());
    }
}
