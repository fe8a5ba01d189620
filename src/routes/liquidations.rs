use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::liquidations::{CreateLiquidationRequest, InspectLiquidationRequest, LiquidationList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Liquidation,
    response::ApiResponse,
    routes::params::LiquidationQuery,
    services::liquidation_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_liquidations).post(create_liquidation))
        .route("/{id}", get(get_liquidation))
        .route("/{id}/inspect", post(inspect_liquidation))
}

#[utoipa::path(
    get,
    path = "/api/liquidations",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("state" = Option<String>, Query, description = "pending, approved or rejected"),
    ),
    responses(
        (status = 200, description = "Liquidation requests", body = ApiResponse<LiquidationList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Liquidations"
)]
pub async fn list_liquidations(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LiquidationQuery>,
) -> AppResult<Json<ApiResponse<LiquidationList>>> {
    let resp = liquidation_service::list_liquidations(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/liquidations",
    request_body = CreateLiquidationRequest,
    responses(
        (status = 200, description = "Liquidation request filed", body = ApiResponse<Liquidation>)
    ),
    security(("bearer_auth" = [])),
    tag = "Liquidations"
)]
pub async fn create_liquidation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateLiquidationRequest>,
) -> AppResult<Json<ApiResponse<Liquidation>>> {
    let resp = liquidation_service::create_liquidation(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/liquidations/{id}",
    params(
        ("id" = Uuid, Path, description = "Liquidation ID")
    ),
    responses(
        (status = 200, description = "Liquidation request", body = ApiResponse<Liquidation>),
        (status = 404, description = "Liquidation not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Liquidations"
)]
pub async fn get_liquidation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Liquidation>>> {
    let resp = liquidation_service::get_liquidation(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/liquidations/{id}/inspect",
    params(
        ("id" = Uuid, Path, description = "Liquidation ID")
    ),
    request_body = InspectLiquidationRequest,
    responses(
        (status = 200, description = "Approved or rejected", body = ApiResponse<Liquidation>),
        (status = 409, description = "Already inspected"),
    ),
    security(("bearer_auth" = [])),
    tag = "Liquidations"
)]
pub async fn inspect_liquidation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<InspectLiquidationRequest>,
) -> AppResult<Json<ApiResponse<Liquidation>>> {
    let resp = liquidation_service::inspect_liquidation(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
