use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::catalog::{AddImageRequest, ImageList, ReplaceImagesRequest},
    entity::{
        product_images::{ActiveModel, Column, Entity as ProductImages},
        products::Entity as Products,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_manager},
    models::ProductImage,
    response::{ApiResponse, Meta},
    services::product_service::ensure_product,
    state::AppState,
};

pub async fn list_images(state: &AppState, product_id: Uuid) -> AppResult<ApiResponse<ImageList>> {
    ensure_product(&state.orm, product_id).await?;
    let items = ProductImages::find()
        .filter(Column::ProductId.eq(product_id))
        .order_by_asc(Column::ImageOrder)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ProductImage::from)
        .collect();
    Ok(ApiResponse::success("Images", ImageList { items }, None))
}

/// Append an image after the current last one.
pub async fn add_image(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: AddImageRequest,
) -> AppResult<ApiResponse<ProductImage>> {
    ensure_manager(user)?;
    let url = clean_url(&payload.url)?;

    let txn = state.orm.begin().await?;
    lock_product(&txn, product_id).await?;

    let last = ProductImages::find()
        .filter(Column::ProductId.eq(product_id))
        .order_by_desc(Column::ImageOrder)
        .one(&txn)
        .await?;
    let next_order = last.map(|image| image.image_order + 1).unwrap_or(1);

    let image = ActiveModel {
        product_id: Set(product_id),
        image_order: Set(next_order),
        url: Set(url),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "image_add",
        "product_images",
        serde_json::json!({ "product_id": product_id, "image_order": next_order }),
    )
    .await;

    Ok(ApiResponse::success(
        "Image added",
        ProductImage::from(image),
        Some(Meta::empty()),
    ))
}

pub async fn delete_image(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    image_order: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_manager(user)?;
    let result = ProductImages::delete_by_id((product_id, image_order))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "image_delete",
        "product_images",
        serde_json::json!({ "product_id": product_id, "image_order": image_order }),
    )
    .await;

    Ok(ApiResponse::done("Image deleted"))
}

/// Swap the whole ordered image set in one transaction; either every url lands or none.
pub async fn replace_images(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: ReplaceImagesRequest,
) -> AppResult<ApiResponse<ImageList>> {
    ensure_manager(user)?;
    let urls = payload
        .urls
        .iter()
        .map(|url| clean_url(url))
        .collect::<AppResult<Vec<_>>>()?;

    let txn = state.orm.begin().await?;
    lock_product(&txn, product_id).await?;

    ProductImages::delete_many()
        .filter(Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;

    let mut items = Vec::with_capacity(urls.len());
    for (index, url) in urls.into_iter().enumerate() {
        let image = ActiveModel {
            product_id: Set(product_id),
            image_order: Set(index as i32 + 1),
            url: Set(url),
        }
        .insert(&txn)
        .await?;
        items.push(ProductImage::from(image));
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "image_replace",
        "product_images",
        serde_json::json!({ "product_id": product_id, "count": items.len() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Images replaced",
        ImageList { items },
        Some(Meta::empty()),
    ))
}

async fn lock_product(txn: &DatabaseTransaction, product_id: Uuid) -> AppResult<()> {
    Products::find_by_id(product_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(())
}

fn clean_url(url: &str) -> AppResult<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::BadRequest("image url must not be empty".into()));
    }
    Ok(url.to_string())
}
