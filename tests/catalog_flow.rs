mod common;

use std::collections::HashSet;

use jewelry_store_api::{
    dto::catalog::{
        CategoryRequest, CreateGemstoneRequest, CreateProductRequest, GemstoneInput,
        InventoryAdjustRequest, ReplaceImagesRequest,
    },
    entity::{categories, product_images},
    error::AppError,
    models::{ProductStatus, Role},
    routes::params::PreviewQuery,
    services::{category_service, gemstone_service, image_service, product_service},
};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

#[tokio::test]
async fn created_product_reads_back_as_sent() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let customer = common::create_user(&state, Role::Customer).await?;
    let category = common::create_category(&state).await?;

    let payload = || CreateProductRequest {
        name: "Emerald Ring".into(),
        material: Some("Platinum".into()),
        description: Some("Cushion cut".into()),
        price: 18_000_000,
        quantity: Some(4),
        category_id: category,
        images: vec![
            "https://cdn.example.com/a.jpg".into(),
            "https://cdn.example.com/b.jpg".into(),
        ],
        gemstones: vec![GemstoneInput {
            name: "Emerald".into(),
            weight: 1.25,
            size: Some("7x5mm".into()),
            color: Some("green".into()),
        }],
    };

    assert!(matches!(
        product_service::create_product(&state, &customer, payload()).await,
        Err(AppError::Forbidden)
    ));

    let created = product_service::create_product(&state, &manager, payload())
        .await?
        .data
        .unwrap();
    assert_eq!(created.product.name, "Emerald Ring");
    assert_eq!(created.product.material.as_deref(), Some("Platinum"));
    assert_eq!(created.product.price, 18_000_000);
    assert_eq!(created.product.quantity, 4);
    assert_eq!(created.product.status, ProductStatus::Active);
    assert_eq!(created.category.id, category);
    let urls: Vec<_> = created.images.iter().map(|i| (i.image_order, i.url.as_str())).collect();
    assert_eq!(
        urls,
        vec![
            (1, "https://cdn.example.com/a.jpg"),
            (2, "https://cdn.example.com/b.jpg")
        ]
    );
    assert_eq!(created.gemstones.len(), 1);
    assert_eq!(created.gemstones[0].weight, 1.25);

    let fetched = product_service::get_product(&state, created.product.id)
        .await?
        .data
        .unwrap();
    assert_eq!(fetched.product.id, created.product.id);
    assert_eq!(fetched.product.price, created.product.price);
    assert_eq!(fetched.images, created.images);
    assert_eq!(fetched.gemstones, created.gemstones);
    Ok(())
}

#[tokio::test]
async fn invalid_gemstone_weight_changes_nothing() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let category = common::create_category(&state).await?;
    let product_id = common::create_product(&state, &manager, category, 1_000, 1).await?;

    for weight in [0.0, -0.5] {
        let result = gemstone_service::create_gemstone(
            &state,
            &manager,
            CreateGemstoneRequest {
                product_id,
                gemstone: GemstoneInput {
                    name: "Opal".into(),
                    weight,
                    size: None,
                    color: None,
                },
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    let listed = gemstone_service::list_gemstones(&state, product_id)
        .await?
        .data
        .unwrap();
    assert!(listed.items.is_empty());

    let good = gemstone_service::create_gemstone(
        &state,
        &manager,
        CreateGemstoneRequest {
            product_id,
            gemstone: GemstoneInput {
                name: "Opal".into(),
                weight: 2.0,
                size: None,
                color: None,
            },
        },
    )
    .await?
    .data
    .unwrap();

    let bad_update = gemstone_service::update_gemstone(
        &state,
        &manager,
        good.id,
        GemstoneInput {
            name: "Opal".into(),
            weight: -1.0,
            size: None,
            color: None,
        },
    )
    .await;
    assert!(matches!(bad_update, Err(AppError::BadRequest(_))));

    let listed = gemstone_service::list_gemstones(&state, product_id)
        .await?
        .data
        .unwrap();
    assert_eq!(listed.items, vec![good]);
    Ok(())
}

#[tokio::test]
async fn preview_windows_have_no_gaps_or_overlap() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let category = common::create_category(&state).await?;
    for price in 1..=5 {
        common::create_product(&state, &manager, category, price * 1_000, 1).await?;
    }

    let window = |skip, take| PreviewQuery {
        skip: Some(skip),
        take: Some(take),
        category_id: Some(category),
    };

    let all = product_service::list_product_previews(&state, window(0, 5))
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(all.len(), 5);

    let mut paged = Vec::new();
    for skip in [0, 2, 4] {
        let resp = product_service::list_product_previews(&state, window(skip, 2)).await?;
        assert_eq!(resp.meta.as_ref().and_then(|m| m.total), Some(5));
        paged.extend(resp.data.unwrap().items);
    }

    let ids: Vec<_> = paged.iter().map(|p| p.id).collect();
    let expected: Vec<_> = all.iter().map(|p| p.id).collect();
    assert_eq!(ids, expected);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 5);
    Ok(())
}

#[tokio::test]
async fn images_and_inventory_are_managed_in_place() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let category = common::create_category(&state).await?;
    let product_id = common::create_product(&state, &manager, category, 5_000, 2).await?;

    let replaced = image_service::replace_images(
        &state,
        &manager,
        product_id,
        ReplaceImagesRequest {
            urls: vec!["front.jpg".into(), "side.jpg".into(), "back.jpg".into()],
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(replaced.items.len(), 3);

    image_service::delete_image(&state, &manager, product_id, 2).await?;
    let remaining: Vec<_> = image_service::list_images(&state, product_id)
        .await?
        .data
        .unwrap()
        .items
        .into_iter()
        .map(|i| i.url)
        .collect();
    assert_eq!(remaining, vec!["front.jpg".to_string(), "back.jpg".to_string()]);

    let lowered = product_service::adjust_inventory(
        &state,
        &manager,
        product_id,
        InventoryAdjustRequest { delta: -3 },
    )
    .await;
    assert!(matches!(lowered, Err(AppError::BadRequest(_))));
    assert_eq!(common::stock_of(&state, product_id).await?, 2);

    product_service::adjust_inventory(
        &state,
        &manager,
        product_id,
        InventoryAdjustRequest { delta: 5 },
    )
    .await?;
    assert_eq!(common::stock_of(&state, product_id).await?, 7);
    Ok(())
}

#[tokio::test]
async fn failed_image_replace_keeps_the_old_set() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let category = common::create_category(&state).await?;
    let product_id = common::create_product(&state, &manager, category, 2_000, 1).await?;

    let replace = |urls: &[&str]| ReplaceImagesRequest {
        urls: urls.iter().map(|u| u.to_string()).collect(),
    };
    let original = image_service::replace_images(
        &state,
        &manager,
        product_id,
        replace(&["https://cdn.example.com/1.jpg", "https://cdn.example.com/2.jpg"]),
    )
    .await?
    .data
    .unwrap();

    let blank = image_service::replace_images(
        &state,
        &manager,
        product_id,
        replace(&["https://cdn.example.com/3.jpg", "   "]),
    )
    .await;
    assert!(matches!(blank, Err(AppError::BadRequest(_))));

    // The second insert is refused by the database after the old rows were deleted.
    let refused = image_service::replace_images(
        &state,
        &manager,
        product_id,
        replace(&["https://cdn.example.com/4.jpg", "https://cdn.example.com/\0.jpg"]),
    )
    .await;
    assert!(refused.is_err());

    let listed = image_service::list_images(&state, product_id)
        .await?
        .data
        .unwrap();
    assert_eq!(listed.items, original.items);
    Ok(())
}

#[tokio::test]
async fn referenced_category_cannot_be_deleted() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let employee = common::create_user(&state, Role::Employee).await?;
    let used = common::create_category(&state).await?;
    common::create_product(&state, &manager, used, 5_000, 1).await?;

    assert!(matches!(
        category_service::delete_category(&state, &employee, used).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        category_service::delete_category(&state, &manager, used).await,
        Err(AppError::BadRequest(_))
    ));

    let spare = category_service::create_category(
        &state,
        &manager,
        CategoryRequest {
            name: common::unique("spare"),
        },
    )
    .await?
    .data
    .unwrap();
    category_service::delete_category(&state, &manager, spare.id).await?;
    assert!(matches!(
        category_service::delete_category(&state, &manager, spare.id).await,
        Err(AppError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn constraint_violations_map_to_client_errors() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let name = common::unique("twin");

    // Writes that slip past the service checks, as a concurrent request would.
    categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.clone()),
    }
    .insert(&state.orm)
    .await?;
    let twin = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
    }
    .insert(&state.orm)
    .await
    .map_err(AppError::from);
    assert!(matches!(twin, Err(AppError::Conflict(_))), "got {twin:?}");

    let orphan = product_images::ActiveModel {
        product_id: Set(Uuid::new_v4()),
        image_order: Set(1),
        url: Set("https://cdn.example.com/orphan.jpg".into()),
    }
    .insert(&state.orm)
    .await
    .map_err(AppError::from);
    assert!(matches!(orphan, Err(AppError::BadRequest(_))), "got {orphan:?}");
    Ok(())
}
