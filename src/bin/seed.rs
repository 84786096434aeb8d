use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_subscription_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_account(&pool, "admin@example.com", "admin123", "admin").await?;
    let alice_id = ensure_account(&pool, "alice@example.com", "alice123", "internal_staff").await?;
    let bob_id = ensure_account(&pool, "bob@example.com", "bob123", "internal_staff").await?;
    let customer_id = ensure_account(&pool, "customer@example.com", "customer123", "user").await?;

    seed_products(&pool, alice_id, bob_id).await?;

    println!(
        "Seed completed. Admin: {admin_id}, Staff: {alice_id}/{bob_id}, Customer: {customer_id}"
    );
    Ok(())
}

async fn ensure_account(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured account {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool, alice_id: Uuid, bob_id: Uuid) -> anyhow::Result<()> {
    let products = vec![
        (
            "Managed Backups",
            "Nightly offsite backups with restore drills",
            450000,
            120000,
            Some(alice_id),
        ),
        (
            "Monitoring Suite",
            "Uptime checks and alerting for your fleet",
            250000,
            60000,
            Some(alice_id),
        ),
        (
            "Priority Support",
            "Same-day response from the support desk",
            900000,
            300000,
            Some(bob_id),
        ),
        (
            "Starter Hosting",
            "Shared hosting for small workloads",
            120000,
            40000,
            None,
        ),
    ];

    for (name, desc, price, cost, owner) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, cost, product_type, active, owning_staff_id)
            VALUES ($1, $2, $3, $4, $5, 'service', TRUE, $6)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(cost)
        .bind(owner)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
