use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::{
        dashboard::{RevenueSeries, TopCustomerList, TopProductList},
        orders::OrderSummary,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{RevenueQuery, TopQuery},
    services::dashboard_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/revenue", get(revenue))
        .route("/top-products", get(top_products))
        .route("/top-customers", get(top_customers))
        .route("/order-stats", get(order_stats))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/revenue",
    params(
        ("from" = Option<String>, Query, description = "First day (YYYY-MM-DD), default 30 days ago"),
        ("to" = Option<String>, Query, description = "Last day (YYYY-MM-DD), default today"),
    ),
    responses(
        (status = 200, description = "Daily revenue of completed orders", body = ApiResponse<RevenueSeries>),
        (status = 403, description = "Managers only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn revenue(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RevenueQuery>,
) -> AppResult<Json<ApiResponse<RevenueSeries>>> {
    let resp = dashboard_service::revenue(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/top-products",
    params(
        ("limit" = Option<i64>, Query, description = "Rows to return, default 5"),
        ("from" = Option<String>, Query, description = "First day (YYYY-MM-DD)"),
        ("to" = Option<String>, Query, description = "Last day (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Best selling products", body = ApiResponse<TopProductList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn top_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<ApiResponse<TopProductList>>> {
    let resp = dashboard_service::top_products(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/top-customers",
    params(
        ("limit" = Option<i64>, Query, description = "Rows to return, default 5"),
        ("from" = Option<String>, Query, description = "First day (YYYY-MM-DD)"),
        ("to" = Option<String>, Query, description = "Last day (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Customers by amount spent", body = ApiResponse<TopCustomerList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn top_customers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<ApiResponse<TopCustomerList>>> {
    let resp = dashboard_service::top_customers(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/order-stats",
    responses(
        (status = 200, description = "Order counts and revenue", body = ApiResponse<OrderSummary>),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn order_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderSummary>>> {
    let resp = dashboard_service::order_stats(&state, &user).await?;
    Ok(Json(resp))
}
