//! Gemstone, category and inventory endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::catalog::{
        CategoryList, CategoryRequest, CreateGemstoneRequest, GemstoneInput, GemstoneList,
        Inventory, InventoryAdjustRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Category, Gemstone},
    response::ApiResponse,
    routes::params::GemstoneQuery,
    services::{category_service, gemstone_service, product_service},
    state::AppState,
};

pub fn gemstone_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_gemstones).post(create_gemstone))
        .route("/{id}", put(update_gemstone).delete(delete_gemstone))
}

pub fn category_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/{id}", put(update_category).delete(delete_category))
}

pub fn inventory_router() -> Router<AppState> {
    Router::new().route("/{product_id}", get(get_inventory).patch(adjust_inventory))
}

#[utoipa::path(
    get,
    path = "/api/gemstones",
    params(
        ("product_id" = Uuid, Query, description = "Product whose gemstones to list")
    ),
    responses(
        (status = 200, description = "Gemstones of a product", body = ApiResponse<GemstoneList>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Gemstones"
)]
pub async fn list_gemstones(
    State(state): State<AppState>,
    Query(query): Query<GemstoneQuery>,
) -> AppResult<Json<ApiResponse<GemstoneList>>> {
    let resp = gemstone_service::list_gemstones(&state, query.product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/gemstones",
    request_body = CreateGemstoneRequest,
    responses(
        (status = 200, description = "Create gemstone", body = ApiResponse<Gemstone>),
        (status = 400, description = "Invalid name or weight"),
    ),
    security(("bearer_auth" = [])),
    tag = "Gemstones"
)]
pub async fn create_gemstone(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateGemstoneRequest>,
) -> AppResult<Json<ApiResponse<Gemstone>>> {
    let resp = gemstone_service::create_gemstone(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/gemstones/{id}",
    params(
        ("id" = Uuid, Path, description = "Gemstone ID")
    ),
    request_body = GemstoneInput,
    responses(
        (status = 200, description = "Update gemstone", body = ApiResponse<Gemstone>),
        (status = 400, description = "Invalid name or weight"),
        (status = 404, description = "Gemstone not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Gemstones"
)]
pub async fn update_gemstone(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<GemstoneInput>,
) -> AppResult<Json<ApiResponse<Gemstone>>> {
    let resp = gemstone_service::update_gemstone(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/gemstones/{id}",
    params(
        ("id" = Uuid, Path, description = "Gemstone ID")
    ),
    responses(
        (status = 200, description = "Gemstone deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Gemstone not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Gemstones"
)]
pub async fn delete_gemstone(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = gemstone_service::delete_gemstone(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "All categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = category_service::list_categories(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Create category", body = ApiResponse<Category>),
        (status = 400, description = "Name missing or taken"),
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = category_service::create_category(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Rename category", body = ApiResponse<Category>),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn update_category(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = category_service::update_category(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category deleted", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Category still has products"),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn delete_category(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = category_service::delete_category(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/inventory/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Current stock", body = ApiResponse<Inventory>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Inventory"
)]
pub async fn get_inventory(
    Path(product_id): Path<Uuid>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Inventory>>> {
    let resp = product_service::get_inventory(&state, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/inventory/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    request_body = InventoryAdjustRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<Inventory>),
        (status = 400, description = "Stock would go negative"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inventory"
)]
pub async fn adjust_inventory(
    Path(product_id): Path<Uuid>,
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<InventoryAdjustRequest>,
) -> AppResult<Json<ApiResponse<Inventory>>> {
    let resp = product_service::adjust_inventory(&state, &user, product_id, payload).await?;
    Ok(Json(resp))
}
