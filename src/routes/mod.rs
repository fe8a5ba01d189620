use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod doc;
pub mod health;
pub mod imports;
pub mod liquidations;
pub mod orders;
pub mod params;
pub mod products;
pub mod suppliers;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/gemstones", catalog::gemstone_router())
        .nest("/categories", catalog::category_router())
        .nest("/inventory", catalog::inventory_router())
        .nest("/carts", cart::router())
        .nest("/orders", orders::router())
        .nest("/imports", imports::router())
        .nest("/suppliers", suppliers::router())
        .nest("/users", users::router())
        .nest("/liquidations", liquidations::router())
        .nest("/dashboard", dashboard::router())
}
