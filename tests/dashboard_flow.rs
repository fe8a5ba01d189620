mod common;

use chrono::{Days, NaiveDate, NaiveTime};
use jewelry_store_api::{
    dto::cart::{AddToCartRequest, ConfirmCartRequest},
    error::AppError,
    middleware::auth::AuthUser,
    models::Role,
    routes::params::{RevenueQuery, TopQuery},
    services::{cart_service, dashboard_service, order_service},
    state::AppState,
};
use uuid::Uuid;

async fn place_order(
    state: &AppState,
    customer: &AuthUser,
    lines: &[(Uuid, i32)],
) -> anyhow::Result<Uuid> {
    for &(product_id, quantity) in lines {
        cart_service::add_product(
            state,
            customer,
            AddToCartRequest {
                product_id,
                quantity,
            },
        )
        .await?;
    }
    let confirmed = cart_service::confirm_cart(
        state,
        customer,
        ConfirmCartRequest {
            shipping_address: "9 Market Road".into(),
            phone_number: "0123456789".into(),
        },
    )
    .await?
    .data
    .unwrap();
    Ok(confirmed.order_id)
}

/// A past day nobody else writes orders on, so the aggregates are exact.
fn quiet_day() -> NaiveDate {
    let offset = (Uuid::new_v4().as_u128() % 30_000) as u64;
    NaiveDate::from_ymd_opt(1900, 1, 1)
        .and_then(|d| d.checked_add_days(Days::new(offset)))
        .unwrap()
}

#[tokio::test]
async fn reports_count_completed_orders_only() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let employee = common::create_user(&state, Role::Employee).await?;
    let big_spender = common::create_user(&state, Role::Customer).await?;
    let small_spender = common::create_user(&state, Role::Customer).await?;
    let category = common::create_category(&state).await?;
    let pendant = common::create_product(&state, &manager, category, 100_000, 20).await?;
    let earring = common::create_product(&state, &manager, category, 40_000, 20).await?;

    let first = place_order(&state, &big_spender, &[(pendant, 2), (earring, 1)]).await?;
    let second = place_order(&state, &small_spender, &[(earring, 3)]).await?;
    let pending = place_order(&state, &big_spender, &[(pendant, 1)]).await?;
    let rejected = place_order(&state, &small_spender, &[(earring, 1)]).await?;
    order_service::complete_order(&state, &employee, first).await?;
    order_service::complete_order(&state, &employee, second).await?;
    order_service::reject_order(&state, &employee, rejected).await?;

    let day = quiet_day();
    sqlx::query("UPDATE orders SET created_at = $1 WHERE id = ANY($2)")
        .bind(day.and_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap()).and_utc())
        .bind(vec![first, second, pending, rejected])
        .execute(&state.pool)
        .await?;

    let revenue = dashboard_service::revenue(
        &state,
        &manager,
        RevenueQuery {
            from: Some(day),
            to: Some(day),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(revenue.total, 360_000);
    assert_eq!(revenue.points.len(), 1);
    assert_eq!(revenue.points[0].day, day);
    assert_eq!((revenue.points[0].revenue, revenue.points[0].orders), (360_000, 2));

    let window = || TopQuery {
        limit: Some(10),
        from: Some(day),
        to: Some(day),
    };
    let products = dashboard_service::top_products(&state, &manager, window())
        .await?
        .data
        .unwrap();
    let ranked: Vec<_> = products
        .items
        .iter()
        .map(|p| (p.product_id, p.quantity_sold, p.revenue))
        .collect();
    assert_eq!(ranked, vec![(earring, 4, 160_000), (pendant, 2, 200_000)]);

    let customers = dashboard_service::top_customers(&state, &manager, window())
        .await?
        .data
        .unwrap();
    let ranked: Vec<_> = customers
        .items
        .iter()
        .map(|c| (c.user_id, c.orders, c.total_spent))
        .collect();
    assert_eq!(
        ranked,
        vec![
            (big_spender.user_id, 1, 240_000),
            (small_spender.user_id, 1, 120_000),
        ]
    );

    // The next day sees none of these sales.
    let next_day = day.checked_add_days(Days::new(1));
    let later = dashboard_service::top_products(
        &state,
        &manager,
        TopQuery {
            limit: Some(50),
            from: next_day,
            to: next_day,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(later.items.iter().all(|p| p.product_id != pendant && p.product_id != earring));
    Ok(())
}

#[tokio::test]
async fn dashboard_is_for_managers() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let employee = common::create_user(&state, Role::Employee).await?;

    assert!(matches!(
        dashboard_service::revenue(&state, &employee, RevenueQuery::default()).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        dashboard_service::top_products(&state, &employee, TopQuery::default()).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        dashboard_service::top_customers(&state, &employee, TopQuery::default()).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        dashboard_service::order_stats(&state, &employee).await,
        Err(AppError::Forbidden)
    ));
    Ok(())
}
