use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::suppliers::{SupplierList, SupplierRequest},
    entity::{
        imports::{Column as ImportCol, Entity as Imports},
        suppliers::{ActiveModel, Column, Entity as Suppliers},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_manager, ensure_staff},
    models::Supplier,
    response::{ApiResponse, Meta},
    routes::params::SupplierQuery,
    services::contains_pattern,
    state::AppState,
};

pub async fn list_suppliers(
    state: &AppState,
    user: &AuthUser,
    query: SupplierQuery,
) -> AppResult<ApiResponse<SupplierList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Suppliers::find();
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        finder = finder.filter(Expr::col(Column::Name).ilike(contains_pattern(search)));
    }
    let finder = finder.order_by_asc(Column::Name).order_by_asc(Column::Id);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Supplier::from)
        .collect();

    Ok(ApiResponse::success(
        "Suppliers",
        SupplierList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_supplier(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Supplier>> {
    ensure_staff(user)?;
    let supplier = Suppliers::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", Supplier::from(supplier), None))
}

pub async fn create_supplier(
    state: &AppState,
    user: &AuthUser,
    payload: SupplierRequest,
) -> AppResult<ApiResponse<Supplier>> {
    ensure_manager(user)?;
    let name = supplier_name(&payload.name)?;

    let supplier = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        address: Set(payload.address),
        phone: Set(payload.phone),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "supplier_create",
        "suppliers",
        serde_json::json!({ "supplier_id": supplier.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Supplier created",
        Supplier::from(supplier),
        Some(Meta::empty()),
    ))
}

pub async fn update_supplier(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: SupplierRequest,
) -> AppResult<ApiResponse<Supplier>> {
    ensure_manager(user)?;
    let name = supplier_name(&payload.name)?;
    let existing = Suppliers::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(name);
    active.address = Set(payload.address);
    active.phone = Set(payload.phone);
    let supplier = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "supplier_update",
        "suppliers",
        serde_json::json!({ "supplier_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Supplier updated",
        Supplier::from(supplier),
        Some(Meta::empty()),
    ))
}

pub async fn delete_supplier(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_manager(user)?;
    let referenced = Imports::find()
        .filter(ImportCol::SupplierId.eq(id))
        .count(&state.orm)
        .await?;
    if referenced > 0 {
        return Err(AppError::BadRequest(format!(
            "supplier has {referenced} imports"
        )));
    }

    let result = Suppliers::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "supplier_delete",
        "suppliers",
        serde_json::json!({ "supplier_id": id }),
    )
    .await;

    Ok(ApiResponse::done("Supplier deleted"))
}

fn supplier_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    Ok(name.to_string())
}
