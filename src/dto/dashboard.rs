use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct RevenuePoint {
    pub day: NaiveDate,
    pub revenue: i64,
    pub orders: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RevenueSeries {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total: i64,
    pub points: Vec<RevenuePoint>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProductList {
    pub items: Vec<TopProduct>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct TopCustomer {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub orders: i64,
    pub total_spent: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopCustomerList {
    pub items: Vec<TopCustomer>,
}
