mod common;

use jewelry_store_api::{
    dto::{
        cart::{AddToCartRequest, ConfirmCartRequest, UpdateQuantityRequest},
        catalog::UpdateProductRequest,
    },
    error::AppError,
    models::{CartStatus, OrderStatus, ProductStatus, Role},
    routes::params::OrderListQuery,
    services::{cart_service, order_service, product_service},
};

fn shipping() -> ConfirmCartRequest {
    ConfirmCartRequest {
        shipping_address: "1 Main Street".into(),
        phone_number: "0123456789".into(),
    }
}

#[tokio::test]
async fn checkout_freezes_prices_and_decrements_stock() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let customer = common::create_user(&state, Role::Customer).await?;
    let category = common::create_category(&state).await?;
    let ring = common::create_product(&state, &manager, category, 1_000_000, 10).await?;
    let chain = common::create_product(&state, &manager, category, 500_000, 10).await?;

    for (product_id, quantity) in [(ring, 1), (chain, 1), (ring, 1)] {
        cart_service::add_product(
            &state,
            &customer,
            AddToCartRequest {
                product_id,
                quantity,
            },
        )
        .await?;
    }

    let cart = cart_service::get_my_cart(&state, &customer).await?.data.unwrap();
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total, 2_500_000);

    // The live price moves after the ring entered the cart.
    product_service::update_product(
        &state,
        &manager,
        ring,
        UpdateProductRequest {
            name: "Ring".into(),
            material: None,
            description: None,
            price: 1_300_000,
            quantity: 10,
            category_id: category,
            status: ProductStatus::Active,
        },
    )
    .await?;

    let confirmed = cart_service::confirm_cart(&state, &customer, shipping())
        .await?
        .data
        .unwrap();
    assert_eq!(confirmed.total_price, 2_500_000);

    let order = order_service::get_order(&state, &customer, confirmed.order_id)
        .await?
        .data
        .unwrap();
    assert_eq!(order.order.status, OrderStatus::Pending);
    assert_eq!(order.order.total_price, 2_500_000);
    let ring_line = order.details.iter().find(|d| d.product_id == ring).unwrap();
    assert_eq!((ring_line.quantity, ring_line.price), (2, 1_000_000));
    let sum: i64 = order
        .details
        .iter()
        .map(|d| d.price * d.quantity as i64)
        .sum();
    assert_eq!(sum, order.order.total_price);

    assert_eq!(common::stock_of(&state, ring).await?, 8);
    assert_eq!(common::stock_of(&state, chain).await?, 9);

    // The checked-out cart is retired and a fresh one starts empty.
    let fresh = cart_service::get_my_cart(&state, &customer).await?.data.unwrap();
    assert_ne!(fresh.id, cart.id);
    assert_eq!(fresh.status, CartStatus::Active);
    assert!(fresh.items.is_empty());

    let mine = order_service::list_my_orders(&state, &customer, OrderListQuery::default())
        .await?
        .data
        .unwrap();
    assert!(mine.items.iter().any(|o| o.id == confirmed.order_id));
    Ok(())
}

#[tokio::test]
async fn cart_rejects_quantities_beyond_stock() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let customer = common::create_user(&state, Role::Customer).await?;
    let category = common::create_category(&state).await?;
    let product_id = common::create_product(&state, &manager, category, 200_000, 3).await?;

    let too_many = cart_service::add_product(
        &state,
        &customer,
        AddToCartRequest {
            product_id,
            quantity: 4,
        },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::BadRequest(_))));

    cart_service::add_product(
        &state,
        &customer,
        AddToCartRequest {
            product_id,
            quantity: 2,
        },
    )
    .await?;
    let update = cart_service::update_quantity(
        &state,
        &customer,
        UpdateQuantityRequest {
            product_id,
            quantity: 0,
        },
    )
    .await;
    assert!(matches!(update, Err(AppError::BadRequest(_))));

    let removed = cart_service::remove_product(&state, &customer, product_id).await?;
    assert!(removed.data.unwrap().items.is_empty());
    assert!(matches!(
        cart_service::remove_product(&state, &customer, product_id).await,
        Err(AppError::NotFound)
    ));

    let empty = cart_service::confirm_cart(&state, &customer, shipping()).await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_checkouts_never_oversell() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let first = common::create_user(&state, Role::Customer).await?;
    let second = common::create_user(&state, Role::Customer).await?;
    let category = common::create_category(&state).await?;
    let product_id = common::create_product(&state, &manager, category, 750_000, 5).await?;

    for customer in [&first, &second] {
        cart_service::add_product(
            &state,
            customer,
            AddToCartRequest {
                product_id,
                quantity: 3,
            },
        )
        .await?;
    }

    let (a, b) = tokio::join!(
        cart_service::confirm_cart(&state, &first, shipping()),
        cart_service::confirm_cart(&state, &second, shipping()),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    for result in [a, b] {
        if let Err(err) = result {
            assert!(matches!(err, AppError::Conflict(_)), "unexpected {err:?}");
        }
    }
    assert_eq!(common::stock_of(&state, product_id).await?, 2);
    Ok(())
}

#[tokio::test]
async fn terminal_orders_refuse_transitions_and_rejection_restocks() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let employee = common::create_user(&state, Role::Employee).await?;
    let customer = common::create_user(&state, Role::Customer).await?;
    let stranger = common::create_user(&state, Role::Customer).await?;
    let category = common::create_category(&state).await?;
    let product_id = common::create_product(&state, &manager, category, 300_000, 6).await?;

    let mut orders = Vec::new();
    for _ in 0..2 {
        cart_service::add_product(
            &state,
            &customer,
            AddToCartRequest {
                product_id,
                quantity: 2,
            },
        )
        .await?;
        let confirmed = cart_service::confirm_cart(&state, &customer, shipping())
            .await?
            .data
            .unwrap();
        orders.push(confirmed.order_id);
    }
    assert_eq!(common::stock_of(&state, product_id).await?, 2);

    assert!(matches!(
        order_service::complete_order(&state, &customer, orders[0]).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        order_service::get_order(&state, &stranger, orders[0]).await,
        Err(AppError::NotFound)
    ));

    let completed = order_service::complete_order(&state, &employee, orders[0])
        .await?
        .data
        .unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
    assert_eq!(completed.staff_id, Some(employee.user_id));
    assert_eq!(common::stock_of(&state, product_id).await?, 2);

    for result in [
        order_service::complete_order(&state, &employee, orders[0]).await,
        order_service::reject_order(&state, &employee, orders[0]).await,
    ] {
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    let rejected = order_service::reject_order(&state, &manager, orders[1])
        .await?
        .data
        .unwrap();
    assert_eq!(rejected.status, OrderStatus::Rejected);
    assert_eq!(common::stock_of(&state, product_id).await?, 4);

    assert!(matches!(
        order_service::complete_order(&state, &manager, orders[1]).await,
        Err(AppError::Conflict(_))
    ));
    let after = order_service::get_order(&state, &customer, orders[1])
        .await?
        .data
        .unwrap();
    assert_eq!(after.order.status, OrderStatus::Rejected);
    assert_eq!(common::stock_of(&state, product_id).await?, 4);
    Ok(())
}

#[tokio::test]
async fn order_lines_keep_the_cart_order() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let customer = common::create_user(&state, Role::Customer).await?;
    let category = common::create_category(&state).await?;
    let mut added = Vec::new();
    for price in [30_000, 10_000, 20_000, 40_000] {
        added.push(common::create_product(&state, &manager, category, price, 5).await?);
    }

    for &product_id in &added {
        cart_service::add_product(
            &state,
            &customer,
            AddToCartRequest {
                product_id,
                quantity: 1,
            },
        )
        .await?;
    }
    let confirmed = cart_service::confirm_cart(&state, &customer, shipping())
        .await?
        .data
        .unwrap();

    let order = order_service::get_order(&state, &customer, confirmed.order_id)
        .await?
        .data
        .unwrap();
    let lines: Vec<_> = order.details.iter().map(|d| (d.line_no, d.product_id)).collect();
    let expected: Vec<_> = (1..).zip(added.iter().copied()).collect();
    assert_eq!(lines, expected);

    let details = order_service::get_order_details(&state, &customer, confirmed.order_id)
        .await?
        .data
        .unwrap();
    let lines: Vec<_> = details.items.iter().map(|d| (d.line_no, d.product_id)).collect();
    assert_eq!(lines, expected);
    Ok(())
}

#[tokio::test]
async fn oversized_totals_are_refused_without_changing_the_cart() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let customer = common::create_user(&state, Role::Customer).await?;
    let category = common::create_category(&state).await?;
    let tiara = common::create_product(&state, &manager, category, i64::MAX / 2, 5).await?;
    let charm = common::create_product(&state, &manager, category, 10, 5).await?;

    let add = |product_id, quantity| AddToCartRequest {
        product_id,
        quantity,
    };
    assert!(matches!(
        cart_service::add_product(&state, &customer, add(tiara, 3)).await,
        Err(AppError::BadRequest(_))
    ));
    let cart = cart_service::get_my_cart(&state, &customer).await?.data.unwrap();
    assert!(cart.items.is_empty());

    cart_service::add_product(&state, &customer, add(tiara, 2)).await?;
    assert!(matches!(
        cart_service::add_product(&state, &customer, add(charm, 1)).await,
        Err(AppError::BadRequest(_))
    ));
    let cart = cart_service::get_my_cart(&state, &customer).await?.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert_eq!(cart.total, (i64::MAX / 2) * 2);

    // Clearing takes the cart lock and leaves it usable.
    let cleared = cart_service::clear_cart(&state, &customer).await?.data.unwrap();
    assert!(cleared.items.is_empty());
    assert_eq!(cleared.id, cart.id);
    cart_service::add_product(&state, &customer, add(charm, 1)).await?;
    assert_eq!(common::stock_of(&state, tiara).await?, 5);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn removal_racing_checkout_has_one_winner() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let customer = common::create_user(&state, Role::Customer).await?;
    let category = common::create_category(&state).await?;
    let product_id = common::create_product(&state, &manager, category, 80_000, 4).await?;

    cart_service::add_product(
        &state,
        &customer,
        AddToCartRequest {
            product_id,
            quantity: 2,
        },
    )
    .await?;

    let (removed, confirmed) = tokio::join!(
        cart_service::remove_product(&state, &customer, product_id),
        cart_service::confirm_cart(&state, &customer, shipping()),
    );
    match (removed, confirmed) {
        (Ok(_), Err(AppError::BadRequest(_))) => {
            assert_eq!(common::stock_of(&state, product_id).await?, 4);
        }
        (Err(AppError::NotFound), Ok(order)) => {
            let order = order.data.unwrap();
            assert_eq!(order.total_price, 160_000);
            assert_eq!(common::stock_of(&state, product_id).await?, 2);
        }
        (removed, confirmed) => panic!("unexpected outcome: {removed:?} / {confirmed:?}"),
    }
    Ok(())
}
