use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::LockType;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::catalog::{
        CreateProductRequest, Inventory, InventoryAdjustRequest, ProductDetail, ProductList,
        ProductPreview, ProductPreviewList, UpdateProductRequest,
    },
    entity::{
        categories::Entity as Categories,
        gemstones::{ActiveModel as GemstoneActive, Column as GemCol, Entity as Gemstones},
        product_images::{ActiveModel as ImageActive, Column as ImageCol, Entity as ProductImages},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_manager},
    models::{Category, Gemstone, Product, ProductImage, ProductStatus, stored},
    response::{ApiResponse, Meta},
    routes::params::{PreviewQuery, ProductQuery, ProductSortBy, SortOrder},
    services::{contains_pattern, gemstone_service::validate_gemstone},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Material).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    if let Some(status) = query.status {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col).order_by_asc(Column::Id),
        SortOrder::Desc => finder.order_by_desc(sort_col).order_by_desc(Column::Id),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

/// Skip/take window in canonical order (oldest first, id as tie-break).
pub async fn list_product_previews(
    state: &AppState,
    query: PreviewQuery,
) -> AppResult<ApiResponse<ProductPreviewList>> {
    let (skip, take) = query.window();
    let mut finder = Products::find();
    if let Some(category_id) = query.category_id {
        finder = finder.filter(Column::CategoryId.eq(category_id));
    }
    let finder = finder
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id);

    let total = finder.clone().count(&state.orm).await? as i64;
    let products = finder
        .offset(skip as u64)
        .limit(take as u64)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let mut thumbnails: HashMap<Uuid, String> = HashMap::new();
    if !ids.is_empty() {
        let images = ProductImages::find()
            .filter(ImageCol::ProductId.is_in(ids))
            .order_by_asc(ImageCol::ImageOrder)
            .all(&state.orm)
            .await?;
        for image in images {
            thumbnails.entry(image.product_id).or_insert(image.url);
        }
    }

    let items = products
        .into_iter()
        .map(|p| {
            Ok(ProductPreview {
                id: p.id,
                thumbnail: thumbnails.remove(&p.id),
                status: stored(&p.status)?,
                name: p.name,
                price: p.price,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Products",
        ProductPreviewList { items },
        Some(Meta::window(skip, take, total)),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let detail = load_detail(&state.orm, product).await?;
    Ok(ApiResponse::success("Product", detail, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_manager(user)?;
    let quantity = payload.quantity.unwrap_or(0);
    let name = validate_product_fields(&payload.name, payload.price, quantity)?;
    for gemstone in &payload.gemstones {
        validate_gemstone(gemstone)?;
    }
    if payload.images.iter().any(|url| url.trim().is_empty()) {
        return Err(AppError::BadRequest("image url must not be empty".into()));
    }

    let txn = state.orm.begin().await?;
    ensure_category(&txn, payload.category_id).await?;

    let now = Utc::now();
    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        material: Set(payload.material),
        description: Set(payload.description),
        price: Set(payload.price),
        quantity: Set(quantity),
        category_id: Set(payload.category_id),
        status: Set(ProductStatus::Active.as_str().to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    for (index, url) in payload.images.iter().enumerate() {
        ImageActive {
            product_id: Set(product.id),
            image_order: Set(index as i32 + 1),
            url: Set(url.trim().to_string()),
        }
        .insert(&txn)
        .await?;
    }

    for gemstone in payload.gemstones {
        GemstoneActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            name: Set(gemstone.name.trim().to_string()),
            weight: Set(gemstone.weight),
            size: Set(gemstone.size),
            color: Set(gemstone.color),
        }
        .insert(&txn)
        .await?;
    }

    let detail = load_detail(&txn, product).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": detail.product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_manager(user)?;
    let name = validate_product_fields(&payload.name, payload.price, payload.quantity)?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_category(&state.orm, payload.category_id).await?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(name);
    active.material = Set(payload.material);
    active.description = Set(payload.description);
    active.price = Set(payload.price);
    active.quantity = Set(payload.quantity);
    active.category_id = Set(payload.category_id);
    active.status = Set(payload.status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    let detail = load_detail(&state.orm, product).await?;
    Ok(ApiResponse::success("Updated", detail, Some(Meta::empty())))
}

/// Products referenced by orders and imports are kept; deleting deactivates.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_manager(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    active.status = Set(ProductStatus::Inactive.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_deactivate",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deactivated",
        Product::try_from(product)?,
        Some(Meta::empty()),
    ))
}

pub async fn get_inventory(state: &AppState, product_id: Uuid) -> AppResult<ApiResponse<Inventory>> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Inventory",
        Inventory {
            product_id: product.id,
            quantity: product.quantity,
        },
        None,
    ))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Inventory>> {
    ensure_manager(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_quantity = product
        .quantity
        .checked_add(payload.delta)
        .ok_or_else(|| AppError::BadRequest("quantity out of range".into()))?;
    if new_quantity < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }

    let mut active: ActiveModel = product.into();
    active.quantity = Set(new_quantity);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "inventory_adjust",
        "products",
        serde_json::json!({ "product_id": updated.id, "delta": payload.delta }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory updated",
        Inventory {
            product_id: updated.id,
            quantity: updated.quantity,
        },
        Some(Meta::empty()),
    ))
}

pub(crate) async fn ensure_product<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> AppResult<ProductModel> {
    Products::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

async fn ensure_category<C: ConnectionTrait>(conn: &C, category_id: Uuid) -> AppResult<()> {
    if Categories::find_by_id(category_id).one(conn).await?.is_none() {
        return Err(AppError::BadRequest("category not found".into()));
    }
    Ok(())
}

async fn load_detail<C: ConnectionTrait>(conn: &C, product: ProductModel) -> AppResult<ProductDetail> {
    let category = Categories::find_by_id(product.category_id)
        .one(conn)
        .await?
        .map(Category::from)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("product without category")))?;

    let images = ProductImages::find()
        .filter(ImageCol::ProductId.eq(product.id))
        .order_by_asc(ImageCol::ImageOrder)
        .all(conn)
        .await?
        .into_iter()
        .map(ProductImage::from)
        .collect();

    let gemstones = Gemstones::find()
        .filter(GemCol::ProductId.eq(product.id))
        .order_by_asc(GemCol::Name)
        .all(conn)
        .await?
        .into_iter()
        .map(Gemstone::from)
        .collect();

    Ok(ProductDetail {
        product: Product::try_from(product)?,
        category,
        images,
        gemstones,
    })
}

fn validate_product_fields(name: &str, price: i64, quantity: i32) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    if price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if quantity < 0 {
        return Err(AppError::BadRequest("quantity must not be negative".into()));
    }
    Ok(name.to_string())
}
