use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Category, Gemstone, Product, ProductImage, ProductStatus};

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct GemstoneInput {
    pub name: String,
    pub weight: f64,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub material: Option<String>,
    pub description: Option<String>,
    pub price: i64,
    pub quantity: Option<i32>,
    pub category_id: Uuid,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub gemstones: Vec<GemstoneInput>,
}

/// Full replacement of the editable product fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: String,
    pub material: Option<String>,
    pub description: Option<String>,
    pub price: i64,
    pub quantity: i32,
    pub category_id: Uuid,
    pub status: ProductStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct ProductPreview {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub status: ProductStatus,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductPreviewList {
    pub items: Vec<ProductPreview>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Category,
    pub images: Vec<ProductImage>,
    pub gemstones: Vec<Gemstone>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGemstoneRequest {
    pub product_id: Uuid,
    #[serde(flatten)]
    pub gemstone: GemstoneInput,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GemstoneList {
    pub items: Vec<Gemstone>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddImageRequest {
    pub url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceImagesRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageList {
    pub items: Vec<ProductImage>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Inventory {
    pub product_id: Uuid,
    pub quantity: i32,
}
