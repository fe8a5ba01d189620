use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Paging information attached to list responses.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    /// Meta for skip/take style listings; `page` is the 1-based page the window starts on.
    pub fn window(skip: i64, take: i64, total: i64) -> Self {
        Self::new(skip / take.max(1) + 1, take, total)
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

impl ApiResponse<serde_json::Value> {
    /// Envelope for operations that have nothing to return.
    pub fn done(message: impl Into<String>) -> Self {
        Self::success(message, serde_json::json!({}), Some(Meta::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_meta_reports_page_of_skip() {
        let meta = Meta::window(4, 2, 5);
        assert_eq!(meta.page, Some(3));
        assert_eq!(meta.per_page, Some(2));
        assert_eq!(meta.total, Some(5));
    }
}
