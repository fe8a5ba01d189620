use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::cart::{
        AddToCartRequest, CartDto, ConfirmCartRequest, ConfirmCartResponse,
        UpdateQuantityRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my-cart", get(my_cart))
        .route("/add-product", post(add_product))
        .route("/remove-product/{product_id}", delete(remove_product))
        .route("/update-quantity", put(update_quantity))
        .route("/confirm", post(confirm))
        .route("/clear", delete(clear))
}

#[utoipa::path(
    get,
    path = "/api/carts/my-cart",
    responses(
        (status = 200, description = "Active cart of the current user", body = ApiResponse<CartDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn my_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    let resp = cart_service::get_my_cart(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/carts/add-product",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Add quantity of a product", body = ApiResponse<CartDto>),
        (status = 400, description = "Bad quantity, unavailable product or not enough stock"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    let resp = cart_service::add_product(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/carts/remove-product/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Removed from cart", body = ApiResponse<CartDto>),
        (status = 404, description = "Product not in cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    let resp = cart_service::remove_product(&state, &user, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/carts/update-quantity",
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Set line quantity", body = ApiResponse<CartDto>),
        (status = 400, description = "Bad quantity or not enough stock"),
        (status = 404, description = "Product not in cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateQuantityRequest>,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    let resp = cart_service::update_quantity(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/carts/confirm",
    request_body = ConfirmCartRequest,
    responses(
        (status = 200, description = "Order placed from the cart", body = ApiResponse<ConfirmCartResponse>),
        (status = 400, description = "Empty cart or missing shipping data"),
        (status = 409, description = "Insufficient stock"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn confirm(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ConfirmCartRequest>,
) -> AppResult<Json<ApiResponse<ConfirmCartResponse>>> {
    let resp = cart_service::confirm_cart(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/carts/clear",
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<CartDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    let resp = cart_service::clear_cart(&state, &user).await?;
    Ok(Json(resp))
}
