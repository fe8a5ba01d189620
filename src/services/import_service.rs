use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::imports::{
        CreateImportRequest, ImportDetailInput, ImportDetailList, ImportList, ImportWithDetails,
    },
    entity::{
        import_details::{ActiveModel as DetailActive, Column as DetailCol, Entity as ImportDetails},
        imports::{ActiveModel, Column, Entity as Imports, Model as ImportModel},
        products::{Column as ProdCol, Entity as Products},
        suppliers::Entity as Suppliers,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_manager, ensure_staff},
    models::{Import, ImportDetail, ImportStatus, PendingWorkflow, stored},
    response::{ApiResponse, Meta},
    routes::params::{ImportListQuery, SortOrder},
    state::AppState,
};

pub async fn list_imports(
    state: &AppState,
    user: &AuthUser,
    query: ImportListQuery,
) -> AppResult<ApiResponse<ImportList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }
    if let Some(supplier_id) = query.supplier_id {
        condition = condition.add(Column::SupplierId.eq(supplier_id));
    }

    let finder = Imports::find().filter(condition);
    let finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(Column::CreatedAt).order_by_asc(Column::Id),
        SortOrder::Desc => finder.order_by_desc(Column::CreatedAt).order_by_desc(Column::Id),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Import::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Imports",
        ImportList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_import(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ImportWithDetails>> {
    ensure_staff(user)?;
    let import = Imports::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let supplier_name = Suppliers::find_by_id(import.supplier_id)
        .one(&state.orm)
        .await?
        .map(|s| s.name)
        .unwrap_or_default();
    let details = load_details(&state.orm, id).await?;

    Ok(ApiResponse::success(
        "OK",
        ImportWithDetails {
            import: Import::try_from(import)?,
            supplier_name,
            details,
        },
        None,
    ))
}

pub async fn get_import_details(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ImportDetailList>> {
    ensure_staff(user)?;
    if Imports::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let items = load_details(&state.orm, id).await?;
    Ok(ApiResponse::success("OK", ImportDetailList { items }, None))
}

/// Record a pending delivery. The total is derived from the lines, never taken from the client.
pub async fn create_import(
    state: &AppState,
    user: &AuthUser,
    payload: CreateImportRequest,
) -> AppResult<ApiResponse<ImportWithDetails>> {
    ensure_staff(user)?;
    let total_price = validate_details(&payload.details)?;

    let txn = state.orm.begin().await?;
    let supplier = Suppliers::find_by_id(payload.supplier_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::BadRequest("supplier not found".into()))?;

    let product_ids: HashSet<Uuid> = payload.details.iter().map(|d| d.product_id).collect();
    let found = Products::find()
        .filter(ProdCol::Id.is_in(product_ids.iter().copied()))
        .count(&txn)
        .await? as usize;
    if found != product_ids.len() {
        return Err(AppError::BadRequest("one or more products not found".into()));
    }

    let import = ActiveModel {
        id: Set(Uuid::new_v4()),
        supplier_id: Set(supplier.id),
        staff_id: Set(user.user_id),
        total_price: Set(total_price),
        status: Set(ImportStatus::Pending.as_str().to_string()),
        decided_by: Set(None),
        decided_at: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    let mut details = Vec::with_capacity(payload.details.len());
    for (line_no, line) in (1..).zip(&payload.details) {
        let detail = DetailActive {
            id: Set(Uuid::new_v4()),
            import_id: Set(import.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            import_price: Set(line.import_price),
            line_no: Set(line_no),
        }
        .insert(&txn)
        .await?;
        details.push(ImportDetail::from(detail));
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "import_create",
        "imports",
        serde_json::json!({ "import_id": import.id, "total_price": total_price }),
    )
    .await;

    Ok(ApiResponse::success(
        "Import created",
        ImportWithDetails {
            import: Import::try_from(import)?,
            supplier_name: supplier.name,
            details,
        },
        Some(Meta::empty()),
    ))
}

/// Accept a pending import and add every line's quantity to stock.
pub async fn accept_import(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Import>> {
    ensure_manager(user)?;
    let txn = state.orm.begin().await?;
    let import = lock_import(&txn, id).await?;
    let next = stored::<ImportStatus>(&import.status)?.transition(ImportStatus::Accepted)?;

    let details = ImportDetails::find()
        .filter(DetailCol::ImportId.eq(id))
        .all(&txn)
        .await?;

    // Several lines may name the same product; fold them and lock in id order.
    let mut per_product: BTreeMap<Uuid, i32> = BTreeMap::new();
    for detail in &details {
        let entry = per_product.entry(detail.product_id).or_insert(0);
        *entry = entry
            .checked_add(detail.quantity)
            .ok_or_else(|| AppError::BadRequest("import quantity out of range".into()))?;
    }

    if !per_product.is_empty() {
        Products::find()
            .filter(ProdCol::Id.is_in(per_product.keys().copied()))
            .order_by_asc(ProdCol::Id)
            .lock(LockType::Update)
            .all(&txn)
            .await?;
    }

    for (product_id, quantity) in &per_product {
        let updated = Products::update_many()
            .col_expr(ProdCol::Quantity, Expr::col(ProdCol::Quantity).add(*quantity))
            .col_expr(ProdCol::UpdatedAt, SimpleExpr::from(Expr::current_timestamp()))
            .filter(ProdCol::Id.eq(*product_id))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "product {product_id} no longer exists"
            )));
        }
    }

    let updated = decide(&txn, import, next, user.user_id).await?;
    txn.commit().await?;

    tracing::info!(import_id = %id, products = per_product.len(), "import accepted");
    audit::record(
        &state.pool,
        user.user_id,
        "import_accept",
        "imports",
        serde_json::json!({ "import_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Import accepted",
        Import::try_from(updated)?,
        Some(Meta::empty()),
    ))
}

pub async fn reject_import(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Import>> {
    ensure_manager(user)?;
    let txn = state.orm.begin().await?;
    let import = lock_import(&txn, id).await?;
    let next = stored::<ImportStatus>(&import.status)?.transition(ImportStatus::Rejected)?;
    let updated = decide(&txn, import, next, user.user_id).await?;
    txn.commit().await?;

    tracing::info!(import_id = %id, "import rejected");
    audit::record(
        &state.pool,
        user.user_id,
        "import_reject",
        "imports",
        serde_json::json!({ "import_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Import rejected",
        Import::try_from(updated)?,
        Some(Meta::empty()),
    ))
}

/// Validate the lines and return their total value.
fn validate_details(details: &[ImportDetailInput]) -> AppResult<i64> {
    if details.is_empty() {
        return Err(AppError::BadRequest(
            "an import needs at least one line".into(),
        ));
    }
    let mut total: i64 = 0;
    for line in details {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".into(),
            ));
        }
        if line.import_price < 0 {
            return Err(AppError::BadRequest(
                "import price must not be negative".into(),
            ));
        }
        total = line
            .import_price
            .checked_mul(line.quantity as i64)
            .and_then(|amount| total.checked_add(amount))
            .ok_or_else(|| AppError::BadRequest("import total out of range".into()))?;
    }
    Ok(total)
}

async fn load_details<C: ConnectionTrait>(conn: &C, import_id: Uuid) -> AppResult<Vec<ImportDetail>> {
    Ok(ImportDetails::find()
        .filter(DetailCol::ImportId.eq(import_id))
        .order_by_asc(DetailCol::LineNo)
        .all(conn)
        .await?
        .into_iter()
        .map(ImportDetail::from)
        .collect())
}

async fn lock_import(txn: &DatabaseTransaction, id: Uuid) -> AppResult<ImportModel> {
    Imports::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)
}

async fn decide(
    txn: &DatabaseTransaction,
    import: ImportModel,
    status: ImportStatus,
    manager_id: Uuid,
) -> AppResult<ImportModel> {
    let mut active: ActiveModel = import.into();
    active.status = Set(status.as_str().to_string());
    active.decided_by = Set(Some(manager_id));
    active.decided_at = Set(Some(Utc::now().into()));
    Ok(active.update(txn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, import_price: i64) -> ImportDetailInput {
        ImportDetailInput {
            product_id: Uuid::new_v4(),
            quantity,
            import_price,
        }
    }

    #[test]
    fn total_is_sum_of_lines() {
        let total = validate_details(&[line(10, 400_000), line(2, 150_000)]).unwrap();
        assert_eq!(total, 4_300_000);
    }

    #[test]
    fn rejects_empty_or_invalid_lines() {
        assert!(validate_details(&[]).is_err());
        assert!(validate_details(&[line(0, 100)]).is_err());
        assert!(validate_details(&[line(1, -1)]).is_err());
        assert!(validate_details(&[line(i32::MAX, i64::MAX)]).is_err());
    }
}
