use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::liquidations::{CreateLiquidationRequest, InspectLiquidationRequest, LiquidationList},
    entity::liquidations::{ActiveModel, Column, Entity as Liquidations},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_manager, ensure_staff},
    models::{Liquidation, LiquidationState, PendingWorkflow, stored},
    response::{ApiResponse, Meta},
    routes::params::LiquidationQuery,
    state::AppState,
};

pub async fn list_liquidations(
    state: &AppState,
    user: &AuthUser,
    query: LiquidationQuery,
) -> AppResult<ApiResponse<LiquidationList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Liquidations::find();
    if let Some(liquidation_state) = query.state {
        finder = finder.filter(Column::State.eq(liquidation_state.as_str()));
    }
    let finder = finder
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Liquidation::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Liquidations",
        LiquidationList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_liquidation(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Liquidation>> {
    ensure_staff(user)?;
    let model = Liquidations::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", Liquidation::try_from(model)?, None))
}

pub async fn create_liquidation(
    state: &AppState,
    user: &AuthUser,
    payload: CreateLiquidationRequest,
) -> AppResult<ApiResponse<Liquidation>> {
    ensure_staff(user)?;
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        created_by: Set(user.user_id),
        inspected_by: Set(None),
        state: Set(LiquidationState::Pending.as_str().to_string()),
        note: Set(clean_note(payload.note)),
        created_at: Set(Utc::now().into()),
        inspected_at: Set(None),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "liquidation_create",
        "liquidations",
        serde_json::json!({ "liquidation_id": model.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Liquidation created",
        Liquidation::try_from(model)?,
        Some(Meta::empty()),
    ))
}

pub async fn inspect_liquidation(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InspectLiquidationRequest,
) -> AppResult<ApiResponse<Liquidation>> {
    ensure_manager(user)?;
    let target = if payload.approve {
        LiquidationState::Approved
    } else {
        LiquidationState::Rejected
    };

    let txn = state.orm.begin().await?;
    let model = Liquidations::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let next = stored::<LiquidationState>(&model.state)?.transition(target)?;

    let previous_note = model.note.clone();
    let mut active: ActiveModel = model.into();
    active.state = Set(next.as_str().to_string());
    active.inspected_by = Set(Some(user.user_id));
    active.inspected_at = Set(Some(Utc::now().into()));
    active.note = Set(clean_note(payload.note).or(previous_note));
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "liquidation_inspect",
        "liquidations",
        serde_json::json!({ "liquidation_id": id, "state": next.as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Liquidation inspected",
        Liquidation::try_from(updated)?,
        Some(Meta::empty()),
    ))
}

fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
