mod common;

use jewelry_store_api::{
    dto::users::{CreateUserRequest, ResetUserPasswordRequest, UpdateUserRequest},
    error::AppError,
    middleware::auth::authenticate,
    models::Role,
    routes::params::UserListQuery,
    services::user_service,
};

fn profile(role: Option<Role>, is_active: Option<bool>) -> UpdateUserRequest {
    UpdateUserRequest {
        full_name: "Renamed Person".into(),
        phone: Some("0900000000".into()),
        address: None,
        birthday: None,
        role,
        is_active,
    }
}

#[tokio::test]
async fn deactivated_accounts_lose_access_immediately() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let employee = common::create_user(&state, Role::Employee).await?;
    let token = common::access_token(&state, &employee)?;

    let current = authenticate(&state, &token).await?;
    assert_eq!(current.role, Role::Employee);

    // Demotion shows up on the next request with the same token.
    user_service::update_user(
        &state,
        &manager,
        employee.user_id,
        profile(Some(Role::Customer), None),
    )
    .await?;
    assert_eq!(authenticate(&state, &token).await?.role, Role::Customer);

    user_service::update_user(&state, &manager, employee.user_id, profile(None, Some(false)))
        .await?;
    assert!(matches!(
        authenticate(&state, &token).await,
        Err(AppError::Forbidden)
    ));

    user_service::update_user(&state, &manager, employee.user_id, profile(None, Some(true)))
        .await?;
    authenticate(&state, &token).await?;
    Ok(())
}

#[tokio::test]
async fn manager_password_reset_revokes_sessions() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let customer = common::create_user(&state, Role::Customer).await?;
    let token = common::access_token(&state, &customer)?;
    authenticate(&state, &token).await?;

    let request = || ResetUserPasswordRequest {
        new_password: "handed-out".into(),
    };
    assert!(matches!(
        user_service::reset_user_password(&state, &customer, customer.user_id, request()).await,
        Err(AppError::Forbidden)
    ));
    user_service::reset_user_password(&state, &manager, customer.user_id, request()).await?;

    assert!(matches!(
        authenticate(&state, &token).await,
        Err(AppError::Unauthorized(_))
    ));
    Ok(())
}

#[tokio::test]
async fn only_managers_change_role_or_status() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let customer = common::create_user(&state, Role::Customer).await?;
    let other = common::create_user(&state, Role::Customer).await?;

    for payload in [
        profile(Some(Role::Manager), None),
        profile(None, Some(false)),
    ] {
        assert!(matches!(
            user_service::update_user(&state, &customer, customer.user_id, payload).await,
            Err(AppError::Forbidden)
        ));
    }
    assert!(matches!(
        user_service::update_user(&state, &customer, other.user_id, profile(None, None)).await,
        Err(AppError::Forbidden)
    ));

    let own = user_service::update_user(&state, &customer, customer.user_id, profile(None, None))
        .await?
        .data
        .unwrap();
    assert_eq!(own.full_name, "Renamed Person");
    assert_eq!(own.role, Role::Customer);
    assert!(own.is_active);

    let promoted = user_service::update_user(
        &state,
        &manager,
        customer.user_id,
        profile(Some(Role::Employee), None),
    )
    .await?
    .data
    .unwrap();
    assert_eq!(promoted.role, Role::Employee);
    Ok(())
}

#[tokio::test]
async fn created_users_are_searchable_and_unique() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let manager = common::create_user(&state, Role::Manager).await?;
    let employee = common::create_user(&state, Role::Employee).await?;
    let marker = common::unique("staff");

    let request = || CreateUserRequest {
        full_name: format!("{marker} Counter"),
        email: format!("{marker}@example.com"),
        password: "counter-pass".into(),
        phone: None,
        address: None,
        birthday: None,
        role: Role::Employee,
    };
    assert!(matches!(
        user_service::create_user(&state, &employee, request()).await,
        Err(AppError::Forbidden)
    ));
    let created = user_service::create_user(&state, &manager, request())
        .await?
        .data
        .unwrap();
    assert_eq!(created.role, Role::Employee);
    assert!(created.is_active);
    assert!(user_service::create_user(&state, &manager, request()).await.is_err());

    let found = user_service::list_users(
        &state,
        &manager,
        UserListQuery {
            q: Some(marker.clone()),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(found.items.len(), 1);
    assert_eq!(found.items[0].id, created.id);

    // A bare wildcard is matched literally.
    let wildcard = user_service::list_users(
        &state,
        &manager,
        UserListQuery {
            q: Some(format!("{marker}%")),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert!(wildcard.items.is_empty());
    Ok(())
}
