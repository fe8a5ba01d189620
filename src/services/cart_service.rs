use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{
        AddToCartRequest, CartDto, CartLine, ConfirmCartRequest, ConfirmCartResponse,
        UpdateQuantityRequest,
    },
    entity::{
        cart_items::{ActiveModel as CartItemActive, Column as ItemCol, Entity as CartItems},
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        order_details::ActiveModel as DetailActive,
        orders::ActiveModel as OrderActive,
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartStatus, OrderStatus, ProductStatus, stored},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn get_my_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartDto>> {
    let cart = get_or_create_cart(state, user.user_id).await?;
    let dto = build_cart_dto(&state.orm, cart).await?;
    Ok(ApiResponse::success("OK", dto, None))
}

/// Add `quantity` on top of whatever is already in the cart.
///
/// The unit price is captured the first time a product enters the cart and is
/// not refreshed when more of it is added.
pub async fn add_product(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartDto>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let cart = get_or_create_cart(state, user.user_id).await?;
    let txn = state.orm.begin().await?;
    let cart = lock_cart(&txn, cart.id).await?;
    let product = available_product(&txn, payload.product_id).await?;

    let existing = CartItems::find()
        .filter(
            Condition::all()
                .add(ItemCol::CartId.eq(cart.id))
                .add(ItemCol::ProductId.eq(payload.product_id)),
        )
        .one(&txn)
        .await?;

    match existing {
        Some(item) => {
            let quantity = item
                .quantity
                .checked_add(payload.quantity)
                .ok_or_else(|| AppError::BadRequest("quantity out of range".into()))?;
            ensure_in_stock(&product, quantity)?;
            let mut active: CartItemActive = item.into();
            active.quantity = Set(quantity);
            active.update(&txn).await?;
        }
        None => {
            ensure_in_stock(&product, payload.quantity)?;
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(payload.quantity),
                price_at_add: Set(product.price),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
        }
    }

    let cart = touch_cart(&txn, cart).await?;
    let dto = build_cart_dto(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("OK", dto, None))
}

pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateQuantityRequest,
) -> AppResult<ApiResponse<CartDto>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;
    let cart = find_active_cart(&txn, user.user_id, true)
        .await?
        .ok_or(AppError::NotFound)?;
    let item = CartItems::find()
        .filter(
            Condition::all()
                .add(ItemCol::CartId.eq(cart.id))
                .add(ItemCol::ProductId.eq(payload.product_id)),
        )
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let product = available_product(&txn, payload.product_id).await?;
    ensure_in_stock(&product, payload.quantity)?;

    let mut active: CartItemActive = item.into();
    active.quantity = Set(payload.quantity);
    active.update(&txn).await?;

    let cart = touch_cart(&txn, cart).await?;
    let dto = build_cart_dto(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("OK", dto, None))
}

pub async fn remove_product(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartDto>> {
    let txn = state.orm.begin().await?;
    let cart = find_active_cart(&txn, user.user_id, true)
        .await?
        .ok_or(AppError::NotFound)?;

    let result = CartItems::delete_many()
        .filter(
            Condition::all()
                .add(ItemCol::CartId.eq(cart.id))
                .add(ItemCol::ProductId.eq(product_id)),
        )
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    let cart = touch_cart(&txn, cart).await?;
    let dto = build_cart_dto(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success("Removed from cart", dto, Some(Meta::empty())))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartDto>> {
    let cart = get_or_create_cart(state, user.user_id).await?;
    let txn = state.orm.begin().await?;
    let cart = lock_cart(&txn, cart.id).await?;
    CartItems::delete_many()
        .filter(ItemCol::CartId.eq(cart.id))
        .exec(&txn)
        .await?;
    let cart = touch_cart(&txn, cart).await?;
    let dto = build_cart_dto(&txn, cart).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cart_clear",
        "carts",
        serde_json::json!({ "cart_id": dto.id }),
    )
    .await;

    Ok(ApiResponse::success("Cart cleared", dto, Some(Meta::empty())))
}

/// Turn the active cart into a pending order.
///
/// One transaction covers the stock check, the stock decrement, the order and
/// its details, and retiring the cart. Product rows are locked in id order so
/// concurrent checkouts over the same products serialize instead of
/// deadlocking; the decrement itself is guarded by `quantity >= n`. Order
/// lines keep the order in which products entered the cart.
pub async fn confirm_cart(
    state: &AppState,
    user: &AuthUser,
    payload: ConfirmCartRequest,
) -> AppResult<ApiResponse<ConfirmCartResponse>> {
    let shipping_address = payload.shipping_address.trim().to_string();
    let phone = payload.phone_number.trim().to_string();
    if shipping_address.is_empty() {
        return Err(AppError::BadRequest("shipping address is required".into()));
    }
    if phone.is_empty() {
        return Err(AppError::BadRequest("phone number is required".into()));
    }

    let txn = state.orm.begin().await?;

    let cart = find_active_cart(&txn, user.user_id, true)
        .await?
        .ok_or_else(|| AppError::BadRequest("Cart is empty".into()))?;

    let items = CartItems::find()
        .filter(ItemCol::CartId.eq(cart.id))
        .order_by_asc(ItemCol::CreatedAt)
        .order_by_asc(ItemCol::Id)
        .all(&txn)
        .await?;
    if items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut total_price: i64 = 0;
    for item in &items {
        let product = products.get(&item.product_id).ok_or_else(|| {
            AppError::BadRequest(format!("product {} no longer exists", item.product_id))
        })?;
        if stored::<ProductStatus>(&product.status)? != ProductStatus::Active {
            return Err(AppError::BadRequest(format!(
                "{} is no longer available",
                product.name
            )));
        }
        if product.quantity < item.quantity {
            return Err(AppError::Conflict(format!(
                "Insufficient stock for {}: {} requested, {} available",
                product.name, item.quantity, product.quantity
            )));
        }
        total_price = add_amount(total_price, line_total(item.price_at_add, item.quantity)?)?;
    }

    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        staff_id: Set(None),
        total_price: Set(total_price),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        shipping_address: Set(shipping_address),
        phone: Set(phone),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    for (line_no, item) in (1..).zip(&items) {
        DetailActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            price: Set(item.price_at_add),
            line_no: Set(line_no),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let updated = Products::update_many()
            .col_expr(ProdCol::Quantity, Expr::col(ProdCol::Quantity).sub(item.quantity))
            .col_expr(ProdCol::UpdatedAt, SimpleExpr::from(Expr::current_timestamp()))
            .filter(ProdCol::Id.eq(item.product_id))
            .filter(ProdCol::Quantity.gte(item.quantity))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Insufficient stock for product {}",
                item.product_id
            )));
        }
    }

    let mut retired: CartActive = cart.into();
    retired.status = Set(CartStatus::CheckedOut.as_str().to_string());
    retired.updated_at = Set(now.into());
    retired.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, total_price, "cart confirmed");
    audit::record(
        &state.pool,
        user.user_id,
        "checkout",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_price": total_price }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        ConfirmCartResponse {
            order_id: order.id,
            total_price,
        },
        Some(Meta::empty()),
    ))
}

async fn find_active_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    lock: bool,
) -> AppResult<Option<CartModel>> {
    let mut finder = Carts::find().filter(
        Condition::all()
            .add(CartCol::UserId.eq(user_id))
            .add(CartCol::Status.eq(CartStatus::Active.as_str())),
    );
    if lock {
        finder = finder.lock(LockType::Update);
    }
    Ok(finder.one(conn).await?)
}

async fn get_or_create_cart(state: &AppState, user_id: Uuid) -> AppResult<CartModel> {
    if let Some(cart) = find_active_cart(&state.orm, user_id, false).await? {
        return Ok(cart);
    }

    let now = Utc::now();
    let inserted = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        status: Set(CartStatus::Active.as_str().to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await;

    match inserted {
        Ok(cart) => Ok(cart),
        // A concurrent request created it first; the partial unique index rejected ours.
        Err(err) => find_active_cart(&state.orm, user_id, false)
            .await?
            .ok_or(AppError::OrmError(err)),
    }
}

async fn lock_cart<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> AppResult<CartModel> {
    let cart = Carts::find_by_id(cart_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    if stored::<CartStatus>(&cart.status)? != CartStatus::Active {
        return Err(AppError::Conflict("cart has already been checked out".into()));
    }
    Ok(cart)
}

async fn touch_cart<C: ConnectionTrait>(conn: &C, cart: CartModel) -> AppResult<CartModel> {
    let mut active: CartActive = cart.into();
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

async fn available_product<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> AppResult<ProductModel> {
    let product = Products::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::BadRequest("product not found".to_string()))?;
    if stored::<ProductStatus>(&product.status)? != ProductStatus::Active {
        return Err(AppError::BadRequest("product is not available".into()));
    }
    Ok(product)
}

fn ensure_in_stock(product: &ProductModel, quantity: i32) -> AppResult<()> {
    if quantity > product.quantity {
        return Err(AppError::BadRequest(format!(
            "only {} of {} in stock",
            product.quantity, product.name
        )));
    }
    Ok(())
}

async fn build_cart_dto<C: ConnectionTrait>(conn: &C, cart: CartModel) -> AppResult<CartDto> {
    let items = CartItems::find()
        .filter(ItemCol::CartId.eq(cart.id))
        .order_by_asc(ItemCol::CreatedAt)
        .order_by_asc(ItemCol::Id)
        .all(conn)
        .await?;

    let ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let names: HashMap<Uuid, String> = if ids.is_empty() {
        HashMap::new()
    } else {
        Products::find()
            .filter(ProdCol::Id.is_in(ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect()
    };

    let mut total: i64 = 0;
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let amount = line_total(item.price_at_add, item.quantity)?;
        total = add_amount(total, amount)?;
        lines.push(CartLine {
            name: names.get(&item.product_id).cloned().unwrap_or_default(),
            product_id: item.product_id,
            quantity: item.quantity,
            price_at_add: item.price_at_add,
            line_total: amount,
        });
    }

    Ok(CartDto {
        id: cart.id,
        status: stored(&cart.status)?,
        items: lines,
        total,
        created_at: cart.created_at.with_timezone(&Utc),
        updated_at: cart.updated_at.with_timezone(&Utc),
    })
}

/// `price × quantity`, refusing amounts that do not fit in an `i64`.
pub(crate) fn line_total(price: i64, quantity: i32) -> AppResult<i64> {
    price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| AppError::BadRequest("line total out of range".into()))
}

fn add_amount(total: i64, amount: i64) -> AppResult<i64> {
    total
        .checked_add(amount)
        .ok_or_else(|| AppError::BadRequest("cart total out of range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_multiplies_frozen_price() {
        assert_eq!(line_total(1_000_000, 2).unwrap(), 2_000_000);
        assert_eq!(line_total(0, 7).unwrap(), 0);
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        assert!(matches!(
            line_total(i64::MAX / 2, 3),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            add_amount(i64::MAX, 1),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(add_amount(2_000_000, 500_000).unwrap(), 2_500_000);
    }
}
