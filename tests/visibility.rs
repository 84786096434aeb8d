mod common;

use axum_subscription_api::{
    dto::{
        cart::AddToCartRequest,
        subscriptions::{CreateSubscriptionRequest, SubscriptionLineInput, UpdateSubscriptionRequest},
    },
    entity::subscription_lines,
    error::AppError,
    routes::params::{Pagination, SubscriptionListQuery},
    services::{cart_service, order_service, product_service, subscription_service},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use common::{as_admin, as_staff, as_user, create_product, create_user, setup_state, test_database_url};

fn line(product_id: Uuid, quantity: i32) -> SubscriptionLineInput {
    SubscriptionLineInput {
        product_id: Some(product_id),
        product_name: None,
        quantity,
        unit_price: None,
    }
}

fn all_of(status: Option<String>) -> SubscriptionListQuery {
    SubscriptionListQuery {
        pagination: Pagination {
            page: None,
            per_page: None,
        },
        status,
        sort_order: None,
    }
}

// Staff see subscriptions for their assigned customers, customers see their
// own, admins see everything.
#[tokio::test]
async fn subscription_listing_is_partitioned_by_assignment() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let admin_id = create_user(&state, "admin", "admin@example.com").await?;
    let alice_id = create_user(&state, "internal_staff", "alice@example.com").await?;
    let bob_id = create_user(&state, "internal_staff", "bob@example.com").await?;
    let customer_a = create_user(&state, "user", "a@example.com").await?;
    let customer_b = create_user(&state, "user", "b@example.com").await?;

    sqlx::query("UPDATE users SET assigned_staff_id = $1 WHERE id = $2")
        .bind(alice_id)
        .bind(customer_a)
        .execute(&state.pool)
        .await?;
    sqlx::query("UPDATE users SET assigned_staff_id = $1 WHERE id = $2")
        .bind(bob_id)
        .bind(customer_b)
        .execute(&state.pool)
        .await?;

    let product = create_product(&state, "Monitoring Suite", 800, None).await?;
    let admin = as_admin(admin_id);

    let sub_a = subscription_service::create(
        &state,
        &admin,
        CreateSubscriptionRequest {
            customer_id: customer_a,
            plan: "monthly".into(),
            payment_term: None,
            sales_person: None,
            lines: vec![line(product, 1)],
        },
    )
    .await?
    .data
    .unwrap()
    .id;
    let sub_b = subscription_service::create(
        &state,
        &admin,
        CreateSubscriptionRequest {
            customer_id: customer_b,
            plan: "monthly".into(),
            payment_term: None,
            sales_person: None,
            lines: vec![line(product, 2)],
        },
    )
    .await?
    .data
    .unwrap()
    .id;

    let alice_view = subscription_service::list(&state, &as_staff(alice_id), all_of(None)).await?;
    let items = alice_view.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, sub_a);

    let bob_view = subscription_service::list(&state, &as_staff(bob_id), all_of(None)).await?;
    let items = bob_view.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, sub_b);

    let admin_view = subscription_service::list(&state, &admin, all_of(None)).await?;
    assert_eq!(admin_view.data.unwrap().items.len(), 2);

    let customer_view =
        subscription_service::list(&state, &as_user(customer_a), all_of(None)).await?;
    let items = customer_view.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, sub_a);

    // Existing but out-of-scope records are rejected after the existence
    // check, so the caller learns the id exists but nothing else.
    let err = subscription_service::get_with_detail(&state, &as_user(customer_b), sub_a)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));

    let err = subscription_service::get_with_detail(&state, &as_user(customer_b), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

// An existing assignment survives later purchases of other staff's products.
#[tokio::test]
async fn checkout_assignment_is_set_once() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let alice_id = create_user(&state, "internal_staff", "alice@example.com").await?;
    let bob_id = create_user(&state, "internal_staff", "bob@example.com").await?;
    let customer_id = create_user(&state, "user", "customer@example.com").await?;

    sqlx::query("UPDATE users SET assigned_staff_id = $1 WHERE id = $2")
        .bind(alice_id)
        .bind(customer_id)
        .execute(&state.pool)
        .await?;

    let bobs_product = create_product(&state, "Priority Support", 900, Some(bob_id)).await?;
    let customer = as_user(customer_id);

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: bobs_product,
            quantity: 1,
        },
    )
    .await?;
    order_service::place_order(&state, &customer).await?;

    let assigned: Option<Uuid> =
        sqlx::query_scalar("SELECT assigned_staff_id FROM users WHERE id = $1")
            .bind(customer_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(assigned, Some(alice_id));

    Ok(())
}

// Updating a subscription replaces its lines wholesale and recomputes the
// recurring amount from what was submitted.
#[tokio::test]
async fn subscription_update_replaces_lines() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let alice_id = create_user(&state, "internal_staff", "alice@example.com").await?;
    let customer_id = create_user(&state, "user", "customer@example.com").await?;
    let staff = as_staff(alice_id);

    let backups = create_product(&state, "Managed Backups", 1000, Some(alice_id)).await?;
    let hosting = create_product(&state, "Starter Hosting", 500, None).await?;

    let sub_id = subscription_service::create(
        &state,
        &staff,
        CreateSubscriptionRequest {
            customer_id,
            plan: "monthly".into(),
            payment_term: None,
            sales_person: None,
            lines: vec![line(backups, 1), line(hosting, 2)],
        },
    )
    .await?
    .data
    .unwrap()
    .id;

    let updated = subscription_service::update(
        &state,
        &staff,
        sub_id,
        UpdateSubscriptionRequest {
            plan: "yearly".into(),
            payment_term: None,
            sales_person: None,
            lines: vec![line(hosting, 3)],
        },
    )
    .await?;
    let updated = updated.data.unwrap();
    assert_eq!(updated.plan, "yearly");
    assert_eq!(updated.recurring_amount, 3 * 500);

    let lines = subscription_lines::Entity::find()
        .filter(subscription_lines::Column::SubscriptionId.eq(sub_id))
        .all(&state.orm)
        .await?;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, hosting);
    assert_eq!(lines[0].quantity, 3);

    Ok(())
}

// An inactive product is hidden from id lookups the same way the listing
// hides it: 404 for anonymous callers and customers, visible to staff.
#[tokio::test]
async fn inactive_products_are_hidden_below_staff() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let alice_id = create_user(&state, "internal_staff", "alice@example.com").await?;
    let customer_id = create_user(&state, "user", "customer@example.com").await?;
    let product = create_product(&state, "Legacy Hosting", 400, Some(alice_id)).await?;

    sqlx::query("UPDATE products SET active = FALSE WHERE id = $1")
        .bind(product)
        .execute(&state.pool)
        .await?;

    let err = product_service::get_product(&state, None, product)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = product_service::get_product(&state, Some(&as_user(customer_id)), product)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let seen = product_service::get_product(&state, Some(&as_staff(alice_id)), product).await?;
    assert_eq!(seen.data.unwrap().id, product);

    Ok(())
}

// Plain users cannot create subscriptions directly.
#[tokio::test]
async fn subscription_create_requires_staff() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let customer_id = create_user(&state, "user", "customer@example.com").await?;
    let product = create_product(&state, "Starter Hosting", 500, None).await?;

    let err = subscription_service::create(
        &state,
        &as_user(customer_id),
        CreateSubscriptionRequest {
            customer_id,
            plan: "monthly".into(),
            payment_term: None,
            sales_person: None,
            lines: vec![line(product, 1)],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}
