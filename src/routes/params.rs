use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{ImportStatus, LiquidationState, OrderStatus, ProductStatus, Role};

#[derive(Debug, Deserialize, ToSchema, Default, Clone, Copy)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Deserialize, ToSchema, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Deserialize, ToSchema, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
    Name,
}

// Query strings are flat; `serde(flatten)` does not survive urlencoded numbers,
// so each query repeats `page`/`per_page` and exposes `pagination()`.

#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub status: Option<ProductStatus>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Offset window over the catalog in canonical order.
#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct PreviewQuery {
    pub skip: Option<i64>,
    pub take: Option<i64>,
    pub category_id: Option<Uuid>,
}

impl PreviewQuery {
    pub fn window(&self) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let take = self.take.unwrap_or(20).clamp(1, 100);
        (skip, take)
    }
}

#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct GemstoneQuery {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
    pub user_id: Option<Uuid>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct ImportListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<ImportStatus>,
    pub supplier_id: Option<Uuid>,
    pub sort_order: Option<SortOrder>,
}

impl ImportListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub q: Option<String>,
}

impl UserListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct SupplierQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
}

impl SupplierQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct LiquidationQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub state: Option<LiquidationState>,
}

impl LiquidationQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct RevenueQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Ranking window; without dates every completed order counts.
#[derive(Debug, Deserialize, ToSchema, Default)]
pub struct TopQuery {
    pub limit: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl TopQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(5).clamp(1, 50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        assert_eq!(Pagination::new(3, 10).normalize(), (3, 10, 20));
        assert_eq!(Pagination::new(0, 1000).normalize(), (1, 100, 0));
    }

    #[test]
    fn preview_window_clamps_skip_and_take() {
        let query = PreviewQuery {
            skip: Some(-4),
            take: Some(0),
            category_id: None,
        };
        assert_eq!(query.window(), (0, 1));
        assert_eq!(PreviewQuery::default().window(), (0, 20));
    }

    #[test]
    fn top_limit_is_bounded() {
        assert_eq!(TopQuery::default().limit(), 5);
        let wide = TopQuery {
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(wide.limit(), 50);
    }
}
