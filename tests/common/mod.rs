#![allow(dead_code)]

use axum_subscription_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    entity::{products::ActiveModel as ProductActive, users::ActiveModel as UserActive},
    lifecycle::Role,
    middleware::auth::AuthUser,
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

/// Returns None when no database is configured, letting the caller skip.
pub fn test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE payments, invoices, subscription_lines, subscriptions, cart_lines, audit_logs, products, users, invoice_counters RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        jwt_secret: "test-secret".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
    };

    Ok(AppState { pool, orm, config })
}

pub async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        assigned_staff_id: NotSet,
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

pub async fn create_product(
    state: &AppState,
    name: &str,
    price: i64,
    owner: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(None),
        price: Set(price),
        cost: Set(price / 4),
        product_type: Set("service".into()),
        active: Set(true),
        owning_staff_id: Set(owner),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}

pub fn as_user(user_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::User,
    }
}

pub fn as_staff(user_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::InternalStaff,
    }
}

pub fn as_admin(user_id: Uuid) -> AuthUser {
    AuthUser {
        user_id,
        role: Role::Admin,
    }
}
