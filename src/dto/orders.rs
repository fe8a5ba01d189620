use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderDetail};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithDetails {
    pub order: Order,
    pub details: Vec<OrderDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub line_no: i32,
    pub quantity: i32,
    pub price: i64,
    pub line_total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailList {
    pub items: Vec<OrderDetailLine>,
}

#[derive(Debug, Serialize, ToSchema, Default, PartialEq)]
pub struct OrderSummary {
    pub total: i64,
    pub pending: i64,
    pub completed: i64,
    pub rejected: i64,
    pub revenue: i64,
}
