use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Liquidation;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLiquidationRequest {
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InspectLiquidationRequest {
    pub approve: bool,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LiquidationList {
    pub items: Vec<Liquidation>,
}
