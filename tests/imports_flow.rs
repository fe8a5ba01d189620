mod common;

use jewelry_store_api::{
    dto::{
        catalog::UpdateProductRequest,
        imports::{CreateImportRequest, ImportDetailInput},
        suppliers::SupplierRequest,
    },
    error::AppError,
    models::{ImportStatus, ProductStatus, Role},
    services::{import_service, product_service, supplier_service},
};

#[tokio::test]
async fn accepted_import_adds_stock_once() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let employee = common::create_user(&state, Role::Employee).await?;
    let category = common::create_category(&state).await?;
    let product_id = common::create_product(&state, &manager, category, 600_000, 3).await?;

    let supplier = supplier_service::create_supplier(
        &state,
        &manager,
        SupplierRequest {
            name: common::unique("supplier"),
            address: None,
            phone: None,
        },
    )
    .await?
    .data
    .unwrap();

    let created = import_service::create_import(
        &state,
        &employee,
        CreateImportRequest {
            supplier_id: supplier.id,
            details: vec![ImportDetailInput {
                product_id,
                quantity: 10,
                import_price: 400_000,
            }],
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(created.import.status, ImportStatus::Pending);
    assert_eq!(created.import.total_price, 4_000_000);
    assert_eq!(created.supplier_name, supplier.name);
    assert_eq!(common::stock_of(&state, product_id).await?, 3);

    assert!(matches!(
        import_service::accept_import(&state, &employee, created.import.id).await,
        Err(AppError::Forbidden)
    ));

    let accepted = import_service::accept_import(&state, &manager, created.import.id)
        .await?
        .data
        .unwrap();
    assert_eq!(accepted.status, ImportStatus::Accepted);
    assert_eq!(accepted.decided_by, Some(manager.user_id));
    assert_eq!(common::stock_of(&state, product_id).await?, 13);

    for result in [
        import_service::accept_import(&state, &manager, created.import.id).await,
        import_service::reject_import(&state, &manager, created.import.id).await,
    ] {
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
    assert_eq!(common::stock_of(&state, product_id).await?, 13);

    // Later sale-price changes do not touch recorded import prices.
    product_service::update_product(
        &state,
        &manager,
        product_id,
        UpdateProductRequest {
            name: "Restocked".into(),
            material: None,
            description: None,
            price: 900_000,
            quantity: 13,
            category_id: category,
            status: ProductStatus::Active,
        },
    )
    .await?;
    let details = import_service::get_import_details(&state, &employee, created.import.id)
        .await?
        .data
        .unwrap();
    assert_eq!(details.items[0].import_price, 400_000);

    assert!(matches!(
        supplier_service::delete_supplier(&state, &manager, supplier.id).await,
        Err(AppError::BadRequest(_))
    ));
    Ok(())
}

#[tokio::test]
async fn rejected_import_leaves_stock_alone() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let category = common::create_category(&state).await?;
    let product_id = common::create_product(&state, &manager, category, 100_000, 1).await?;
    let supplier = supplier_service::create_supplier(
        &state,
        &manager,
        SupplierRequest {
            name: common::unique("supplier"),
            address: Some("Warehouse 4".into()),
            phone: None,
        },
    )
    .await?
    .data
    .unwrap();

    let invalid = import_service::create_import(
        &state,
        &manager,
        CreateImportRequest {
            supplier_id: supplier.id,
            details: vec![],
        },
    )
    .await;
    assert!(matches!(invalid, Err(AppError::BadRequest(_))));

    let created = import_service::create_import(
        &state,
        &manager,
        CreateImportRequest {
            supplier_id: supplier.id,
            details: vec![ImportDetailInput {
                product_id,
                quantity: 5,
                import_price: 50_000,
            }],
        },
    )
    .await?
    .data
    .unwrap();

    let rejected = import_service::reject_import(&state, &manager, created.import.id)
        .await?
        .data
        .unwrap();
    assert_eq!(rejected.status, ImportStatus::Rejected);
    assert_eq!(common::stock_of(&state, product_id).await?, 1);
    assert!(matches!(
        import_service::accept_import(&state, &manager, created.import.id).await,
        Err(AppError::Conflict(_))
    ));
    assert_eq!(common::stock_of(&state, product_id).await?, 1);
    Ok(())
}

#[tokio::test]
async fn import_lines_read_back_in_submitted_order() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let employee = common::create_user(&state, Role::Employee).await?;
    let category = common::create_category(&state).await?;
    let mut products = Vec::new();
    for _ in 0..4 {
        products.push(common::create_product(&state, &manager, category, 90_000, 0).await?);
    }
    let supplier = supplier_service::create_supplier(
        &state,
        &manager,
        SupplierRequest {
            name: common::unique("supplier"),
            address: None,
            phone: None,
        },
    )
    .await?
    .data
    .unwrap();

    let details = products
        .iter()
        .rev()
        .zip(1..)
        .map(|(&product_id, quantity)| ImportDetailInput {
            product_id,
            quantity,
            import_price: 50_000,
        })
        .collect();
    let created = import_service::create_import(
        &state,
        &employee,
        CreateImportRequest {
            supplier_id: supplier.id,
            details,
        },
    )
    .await?
    .data
    .unwrap();

    let expected: Vec<_> = (1..).zip(products.iter().rev().copied()).collect();
    let lines: Vec<_> = created.details.iter().map(|d| (d.line_no, d.product_id)).collect();
    assert_eq!(lines, expected);

    let listed = import_service::get_import_details(&state, &employee, created.import.id)
        .await?
        .data
        .unwrap();
    let lines: Vec<_> = listed.items.iter().map(|d| (d.line_no, d.product_id)).collect();
    assert_eq!(lines, expected);
    let quantities: Vec<_> = listed.items.iter().map(|d| d.quantity).collect();
    assert_eq!(quantities, vec![1, 2, 3, 4]);
    Ok(())
}
