use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Import, ImportDetail};

#[derive(Debug, Deserialize, ToSchema, Clone)]
pub struct ImportDetailInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub import_price: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateImportRequest {
    pub supplier_id: Uuid,
    pub details: Vec<ImportDetailInput>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportWithDetails {
    pub import: Import,
    pub supplier_name: String,
    pub details: Vec<ImportDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportList {
    pub items: Vec<Import>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportDetailList {
    pub items: Vec<ImportDetail>,
}
