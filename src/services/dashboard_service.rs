use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

use crate::{
    dto::{
        dashboard::{
            RevenuePoint, RevenueSeries, TopCustomer, TopCustomerList, TopProduct, TopProductList,
        },
        orders::OrderSummary,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_manager},
    models::OrderStatus,
    response::ApiResponse,
    routes::params::{RevenueQuery, TopQuery},
    services::order_service,
    state::AppState,
};

pub const DEFAULT_REVENUE_DAYS: u64 = 30;

/// Daily revenue of completed orders over an inclusive date range.
pub async fn revenue(
    state: &AppState,
    user: &AuthUser,
    query: RevenueQuery,
) -> AppResult<ApiResponse<RevenueSeries>> {
    ensure_manager(user)?;
    let (from, to) = revenue_range(&query, Utc::now().date_naive())?;
    let (start, end) = day_bounds(from, to)?;

    let points: Vec<RevenuePoint> = sqlx::query_as(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::DATE AS day,
               COALESCE(SUM(total_price), 0)::BIGINT AS revenue,
               COUNT(*)::BIGINT AS orders
        FROM orders
        WHERE status = $1 AND created_at >= $2 AND created_at < $3
        GROUP BY day
        ORDER BY day
        "#,
    )
    .bind(OrderStatus::Completed.as_str())
    .bind(start)
    .bind(end)
    .fetch_all(&state.pool)
    .await?;

    let total = points.iter().map(|p| p.revenue).sum();
    Ok(ApiResponse::success(
        "Revenue",
        RevenueSeries {
            from,
            to,
            total,
            points,
        },
        None,
    ))
}

pub async fn top_products(
    state: &AppState,
    user: &AuthUser,
    query: TopQuery,
) -> AppResult<ApiResponse<TopProductList>> {
    ensure_manager(user)?;
    let (start, end) = optional_bounds(&query)?;
    let items: Vec<TopProduct> = sqlx::query_as(
        r#"
        SELECT p.id AS product_id,
               p.name,
               SUM(d.quantity)::BIGINT AS quantity_sold,
               SUM(d.quantity::BIGINT * d.price)::BIGINT AS revenue
        FROM order_details d
        JOIN orders o ON o.id = d.order_id
        JOIN products p ON p.id = d.product_id
        WHERE o.status = $1
          AND ($3::TIMESTAMPTZ IS NULL OR o.created_at >= $3)
          AND ($4::TIMESTAMPTZ IS NULL OR o.created_at < $4)
        GROUP BY p.id, p.name
        ORDER BY quantity_sold DESC, revenue DESC, p.id
        LIMIT $2
        "#,
    )
    .bind(OrderStatus::Completed.as_str())
    .bind(query.limit())
    .bind(start)
    .bind(end)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success("Top products", TopProductList { items }, None))
}

pub async fn top_customers(
    state: &AppState,
    user: &AuthUser,
    query: TopQuery,
) -> AppResult<ApiResponse<TopCustomerList>> {
    ensure_manager(user)?;
    let (start, end) = optional_bounds(&query)?;
    let items: Vec<TopCustomer> = sqlx::query_as(
        r#"
        SELECT u.id AS user_id,
               u.full_name,
               u.email,
               COUNT(o.id)::BIGINT AS orders,
               SUM(o.total_price)::BIGINT AS total_spent
        FROM orders o
        JOIN users u ON u.id = o.user_id
        WHERE o.status = $1
          AND ($3::TIMESTAMPTZ IS NULL OR o.created_at >= $3)
          AND ($4::TIMESTAMPTZ IS NULL OR o.created_at < $4)
        GROUP BY u.id, u.full_name, u.email
        ORDER BY total_spent DESC, orders DESC, u.id
        LIMIT $2
        "#,
    )
    .bind(OrderStatus::Completed.as_str())
    .bind(query.limit())
    .bind(start)
    .bind(end)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success("Top customers", TopCustomerList { items }, None))
}

pub async fn order_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderSummary>> {
    ensure_manager(user)?;
    let summary = order_service::summarize(state).await?;
    Ok(ApiResponse::success("Order stats", summary, None))
}

fn revenue_range(query: &RevenueQuery, today: NaiveDate) -> AppResult<(NaiveDate, NaiveDate)> {
    let to = query.to.unwrap_or(today);
    let from = match query.from {
        Some(from) => from,
        None => to
            .checked_sub_days(Days::new(DEFAULT_REVENUE_DAYS - 1))
            .ok_or_else(|| AppError::BadRequest("date out of range".into()))?,
    };
    if from > to {
        return Err(AppError::BadRequest("from must not be after to".into()));
    }
    Ok((from, to))
}

/// Ranking bounds; either side may stay open.
fn optional_bounds(
    query: &TopQuery,
) -> AppResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::BadRequest("from must not be after to".into()));
        }
    }
    let start = query.from.map(|from| from.and_time(NaiveTime::MIN).and_utc());
    let end = match query.to {
        Some(to) => Some(
            to.checked_add_days(Days::new(1))
                .ok_or_else(|| AppError::BadRequest("date out of range".into()))?
                .and_time(NaiveTime::MIN)
                .and_utc(),
        ),
        None => None,
    };
    Ok((start, end))
}

/// Half-open UTC instant range covering every day from `from` through `to`.
fn day_bounds(from: NaiveDate, to: NaiveDate) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let end = to
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AppError::BadRequest("date out of range".into()))?;
    Ok((
        from.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_range_is_last_thirty_days() {
        let (from, to) = revenue_range(&RevenueQuery::default(), date(2025, 3, 30)).unwrap();
        assert_eq!(to, date(2025, 3, 30));
        assert_eq!(from, date(2025, 3, 1));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let query = RevenueQuery {
            from: Some(date(2025, 2, 2)),
            to: Some(date(2025, 2, 1)),
        };
        assert!(matches!(
            revenue_range(&query, date(2025, 3, 1)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn ranking_bounds_are_optional() {
        assert_eq!(optional_bounds(&TopQuery::default()).unwrap(), (None, None));
        let one_day = TopQuery {
            limit: None,
            from: Some(date(2025, 1, 1)),
            to: Some(date(2025, 1, 1)),
        };
        let (start, end) = optional_bounds(&one_day).unwrap();
        assert_eq!((end.unwrap() - start.unwrap()).num_hours(), 24);
        let inverted = TopQuery {
            limit: None,
            from: Some(date(2025, 1, 2)),
            to: Some(date(2025, 1, 1)),
        };
        assert!(matches!(
            optional_bounds(&inverted),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn bounds_cover_the_last_day() {
        let (start, end) = day_bounds(date(2025, 1, 1), date(2025, 1, 1)).unwrap();
        assert_eq!((end - start).num_hours(), 24);
    }
}
