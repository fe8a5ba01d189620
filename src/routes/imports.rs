use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::imports::{CreateImportRequest, ImportDetailList, ImportList, ImportWithDetails},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Import,
    response::ApiResponse,
    routes::params::ImportListQuery,
    services::import_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_imports).post(create_import))
        .route("/{id}", get(get_import))
        .route("/{id}/details", get(get_import_details))
        .route("/{id}/accept", post(accept_import))
        .route("/{id}/reject", post(reject_import))
}

#[utoipa::path(
    get,
    path = "/api/imports",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "pending, accepted or rejected"),
        ("supplier_id" = Option<Uuid>, Query, description = "Filter by supplier"),
        ("sort_order" = Option<String>, Query, description = "asc or desc by created_at"),
    ),
    responses(
        (status = 200, description = "Imports", body = ApiResponse<ImportList>),
        (status = 403, description = "Staff only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Imports"
)]
pub async fn list_imports(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ImportListQuery>,
) -> AppResult<Json<ApiResponse<ImportList>>> {
    let resp = import_service::list_imports(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/imports",
    request_body = CreateImportRequest,
    responses(
        (status = 200, description = "Pending import recorded", body = ApiResponse<ImportWithDetails>),
        (status = 400, description = "Unknown supplier/product or invalid lines"),
    ),
    security(("bearer_auth" = [])),
    tag = "Imports"
)]
pub async fn create_import(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateImportRequest>,
) -> AppResult<Json<ApiResponse<ImportWithDetails>>> {
    let resp = import_service::create_import(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/imports/{id}",
    params(
        ("id" = Uuid, Path, description = "Import ID")
    ),
    responses(
        (status = 200, description = "Import with supplier and lines", body = ApiResponse<ImportWithDetails>),
        (status = 404, description = "Import not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Imports"
)]
pub async fn get_import(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ImportWithDetails>>> {
    let resp = import_service::get_import(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/imports/{id}/details",
    params(
        ("id" = Uuid, Path, description = "Import ID")
    ),
    responses(
        (status = 200, description = "Import lines", body = ApiResponse<ImportDetailList>),
        (status = 404, description = "Import not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Imports"
)]
pub async fn get_import_details(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ImportDetailList>>> {
    let resp = import_service::get_import_details(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/imports/{id}/accept",
    params(
        ("id" = Uuid, Path, description = "Import ID")
    ),
    responses(
        (status = 200, description = "Import accepted and stock added", body = ApiResponse<Import>),
        (status = 404, description = "Import not found"),
        (status = 409, description = "Import already decided"),
    ),
    security(("bearer_auth" = [])),
    tag = "Imports"
)]
pub async fn accept_import(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Import>>> {
    let resp = import_service::accept_import(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/imports/{id}/reject",
    params(
        ("id" = Uuid, Path, description = "Import ID")
    ),
    responses(
        (status = 200, description = "Import rejected", body = ApiResponse<Import>),
        (status = 404, description = "Import not found"),
        (status = 409, description = "Import already decided"),
    ),
    security(("bearer_auth" = [])),
    tag = "Imports"
)]
pub async fn reject_import(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Import>>> {
    let resp = import_service::reject_import(&state, &user, id).await?;
    Ok(Json(resp))
}
