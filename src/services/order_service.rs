use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderDetailLine, OrderDetailList, OrderList, OrderSummary, OrderWithDetails},
    entity::{
        order_details::{Column as DetailCol, Entity as OrderDetails, Model as DetailModel},
        orders::{ActiveModel, Column, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Order, OrderDetail, OrderStatus, PendingWorkflow, stored},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::cart_service::line_total,
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_staff(user)?;
    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }
    if let Some(user_id) = query.user_id {
        condition = condition.add(Column::UserId.eq(user_id));
    }
    paginate_orders(state, condition, &query).await
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let mut condition = Condition::all().add(Column::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }
    paginate_orders(state, condition, &query).await
}

async fn paginate_orders(
    state: &AppState,
    condition: Condition,
    query: &OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let finder = Orders::find().filter(condition);
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
        .map(Order::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithDetails>> {
    let order = visible_order(state, user, id).await?;
    let details = OrderDetails::find()
        .filter(DetailCol::OrderId.eq(order.id))
        .order_by_asc(DetailCol::LineNo)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderDetail::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithDetails {
            order: Order::try_from(order)?,
            details,
        },
        None,
    ))
}

pub async fn get_order_details(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetailList>> {
    let order = visible_order(state, user, id).await?;
    let details = OrderDetails::find()
        .filter(DetailCol::OrderId.eq(order.id))
        .order_by_asc(DetailCol::LineNo)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = details.iter().map(|d| d.product_id).collect();
    let names: HashMap<Uuid, String> = if ids.is_empty() {
        HashMap::new()
    } else {
        Products::find()
            .filter(ProdCol::Id.is_in(ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect()
    };

    let items = details
        .into_iter()
        .map(|d| {
            Ok(OrderDetailLine {
                product_name: names.get(&d.product_id).cloned().unwrap_or_default(),
                line_total: line_total(d.price, d.quantity)?,
                id: d.id,
                product_id: d.product_id,
                line_no: d.line_no,
                quantity: d.quantity,
                price: d.price,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success("OK", OrderDetailList { items }, None))
}

pub async fn complete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_staff(user)?;
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id).await?;
    let next = stored::<OrderStatus>(&order.status)?.transition(OrderStatus::Completed)?;
    let updated = set_status(&txn, order, next, user.user_id).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, staff_id = %user.user_id, "order completed");
    audit::record(
        &state.pool,
        user.user_id,
        "order_complete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order completed",
        Order::try_from(updated)?,
        Some(Meta::empty()),
    ))
}

/// Reject a pending order and put its quantities back on the shelf.
pub async fn reject_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_staff(user)?;
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id).await?;
    let next = stored::<OrderStatus>(&order.status)?.transition(OrderStatus::Rejected)?;

    let details = OrderDetails::find()
        .filter(DetailCol::OrderId.eq(order.id))
        .order_by_asc(DetailCol::ProductId)
        .all(&txn)
        .await?;
    restock(&txn, &details).await?;

    let updated = set_status(&txn, order, next, user.user_id).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, staff_id = %user.user_id, "order rejected");
    audit::record(
        &state.pool,
        user.user_id,
        "order_reject",
        "orders",
        serde_json::json!({ "order_id": id, "restocked_lines": details.len() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order rejected",
        Order::try_from(updated)?,
        Some(Meta::empty()),
    ))
}

pub async fn order_summary(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderSummary>> {
    ensure_staff(user)?;
    let summary = summarize(state).await?;
    Ok(ApiResponse::success("Order summary", summary, None))
}

/// Per-status counts plus revenue of completed orders.
pub(crate) async fn summarize(state: &AppState) -> AppResult<OrderSummary> {
    let rows: Vec<(String, i64, i64)> = sqlx::query_as(
        r#"
        SELECT status, COUNT(*)::BIGINT, COALESCE(SUM(total_price), 0)::BIGINT
        FROM orders
        GROUP BY status
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let mut summary = OrderSummary::default();
    for (status, count, amount) in rows {
        summary.total += count;
        match stored::<OrderStatus>(&status)? {
            OrderStatus::Pending => summary.pending = count,
            OrderStatus::Completed => {
                summary.completed = count;
                summary.revenue = amount;
            }
            OrderStatus::Rejected => summary.rejected = count,
        }
    }
    Ok(summary)
}

/// Customers only see their own orders; anyone else's is reported as missing.
async fn visible_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<OrderModel> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if !user.is_staff() && order.user_id != user.user_id {
        return Err(AppError::NotFound);
    }
    Ok(order)
}

async fn lock_order(txn: &DatabaseTransaction, id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)
}

async fn set_status(
    txn: &DatabaseTransaction,
    order: OrderModel,
    status: OrderStatus,
    staff_id: Uuid,
) -> AppResult<OrderModel> {
    let mut active: ActiveModel = order.into();
    active.status = Set(status.as_str().to_string());
    active.staff_id = Set(Some(staff_id));
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(txn).await?)
}

async fn restock(txn: &DatabaseTransaction, details: &[DetailModel]) -> AppResult<()> {
    for detail in details {
        Products::update_many()
            .col_expr(ProdCol::Quantity, Expr::col(ProdCol::Quantity).add(detail.quantity))
            .col_expr(ProdCol::UpdatedAt, SimpleExpr::from(Expr::current_timestamp()))
            .filter(ProdCol::Id.eq(detail.product_id))
            .exec(txn)
            .await?;
    }
    Ok(())
}
