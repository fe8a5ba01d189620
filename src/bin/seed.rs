use jewelry_store_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    models::Role,
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let manager_id = ensure_user(
        &pool,
        "Store Manager",
        "manager@example.com",
        "manager123",
        Role::Manager,
    )
    .await?;
    let employee_id = ensure_user(
        &pool,
        "Shop Assistant",
        "staff@example.com",
        "staff123",
        Role::Employee,
    )
    .await?;
    let customer_id = ensure_user(
        &pool,
        "Sample Customer",
        "customer@example.com",
        "customer123",
        Role::Customer,
    )
    .await?;
    seed_catalog(&pool).await?;
    seed_supplier(&pool).await?;

    println!(
        "Seed completed. Manager ID: {manager_id}, Employee ID: {employee_id}, Customer ID: {customer_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    full_name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, full_name, email, password_hash, role, is_active)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role, is_active = TRUE
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_category(pool: &sqlx::PgPool, name: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let rings = ensure_category(pool, "Rings").await?;
    let necklaces = ensure_category(pool, "Necklaces").await?;
    let earrings = ensure_category(pool, "Earrings").await?;

    let products = vec![
        ("Solitaire Diamond Ring", "18K white gold", 25_000_000_i64, 5, rings, Some(("Diamond", 0.5))),
        ("Ruby Halo Ring", "18K rose gold", 12_500_000, 8, rings, Some(("Ruby", 0.8))),
        ("Pearl Strand Necklace", "Akoya pearl, silver clasp", 8_000_000, 12, necklaces, None),
        ("Sapphire Pendant", "14K yellow gold", 9_500_000, 10, necklaces, Some(("Sapphire", 1.2))),
        ("Gold Hoop Earrings", "24K gold", 4_200_000, 20, earrings, None),
    ];

    for (name, material, price, quantity, category_id, gemstone) in products {
        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (id, name, material, price, quantity, category_id)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $2)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(material)
        .bind(price)
        .bind(quantity)
        .bind(category_id)
        .fetch_optional(pool)
        .await?;

        let (Some((product_id,)), Some((stone, weight))) = (inserted, gemstone) else {
            continue;
        };
        sqlx::query(
            "INSERT INTO gemstones (id, product_id, name, weight) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(product_id)
        .bind(stone)
        .bind(weight)
        .execute(pool)
        .await?;
    }

    println!("Seeded catalog");
    Ok(())
}

async fn seed_supplier(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO suppliers (id, name, address, phone)
        SELECT $1, $2, $3, $4
        WHERE NOT EXISTS (SELECT 1 FROM suppliers WHERE name = $2)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind("Golden Gems Wholesale")
    .bind("12 Jewelers Row")
    .bind("0900000000")
    .execute(pool)
    .await?;

    println!("Seeded supplier");
    Ok(())
}
