mod common;

use axum_subscription_api::{
    dto::{
        cart::{AddToCartRequest, UpdateQuantityRequest},
        invoices::{CreateInvoiceRequest, UpdateInvoiceStatusRequest},
    },
    entity::invoices,
    error::AppError,
    lifecycle::InvoiceStatus,
    routes::params::Pagination,
    services::{cart_service, invoice_service, order_service},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use common::{as_staff, as_user, create_product, create_user, setup_state, test_database_url};

// Full flow: fill a cart, place the order, pay the resulting invoice.
#[tokio::test]
async fn cart_to_paid_invoice_flow() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let alice_id = create_user(&state, "internal_staff", "alice@example.com").await?;
    let customer_id = create_user(&state, "user", "customer@example.com").await?;

    let backups = create_product(&state, "Managed Backups", 1000, Some(alice_id)).await?;
    let hosting = create_product(&state, "Starter Hosting", 500, None).await?;

    let customer = as_user(customer_id);

    // Adding the same product twice accumulates into one line.
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: backups,
            quantity: 2,
        },
    )
    .await?;
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: backups,
            quantity: 1,
        },
    )
    .await?;
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: hosting,
            quantity: 2,
        },
    )
    .await?;

    let cart = cart_service::list_cart(
        &state,
        &customer,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    let items = cart.data.unwrap().items;
    assert_eq!(items.len(), 2);
    let backups_line = items.iter().find(|l| l.product.id == backups).unwrap();
    assert_eq!(backups_line.quantity, 3);

    let placed = order_service::place_order(&state, &customer).await?;
    let placed = placed.data.unwrap();
    assert!(placed.invoice_number.starts_with("INV-"));

    // Subscription header reflects the cart totals at checkout.
    let sub = axum_subscription_api::entity::subscriptions::Entity::find_by_id(
        placed.subscription_id,
    )
    .one(&state.orm)
    .await?
    .unwrap();
    assert_eq!(sub.recurring_amount, 3 * 1000 + 2 * 500);
    assert_eq!(sub.status, "quotation");
    assert_eq!(sub.origin, "checkout");
    assert_eq!(sub.customer_id, customer_id);

    // First cart line with an owning staff drives the customer assignment.
    let assigned: Option<Uuid> =
        sqlx::query_scalar("SELECT assigned_staff_id FROM users WHERE id = $1")
            .bind(customer_id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(assigned, Some(alice_id));

    // Cart is emptied in the same transaction.
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE user_id = $1")
        .bind(customer_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(remaining, 0);

    let invoice = invoices::Entity::find()
        .filter(invoices::Column::SubscriptionId.eq(placed.subscription_id))
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(invoice.invoice_number, placed.invoice_number);
    assert_eq!(invoice.amount, 4000);
    assert_eq!(invoice.status, "draft");

    // The customer pays their own invoice.
    let payment = invoice_service::pay_invoice(&state, &customer, invoice.id).await?;
    let payment = payment.data.unwrap();
    assert_eq!(payment.amount, 4000);

    let paid = invoices::Entity::find_by_id(invoice.id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(paid.status, "paid");

    let payment_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE invoice_id = $1")
            .bind(invoice.id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(payment_count, 1);

    // Paying twice is rejected and records nothing.
    let err = invoice_service::pay_invoice(&state, &customer, invoice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyPaid));

    let payment_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE invoice_id = $1")
            .bind(invoice.id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(payment_count, 1);

    Ok(())
}

#[tokio::test]
async fn invoice_numbers_increment_within_a_year() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let customer_id = create_user(&state, "user", "customer@example.com").await?;
    let product = create_product(&state, "Monitoring Suite", 700, None).await?;
    let customer = as_user(customer_id);

    let mut numbers = Vec::new();
    for _ in 0..2 {
        cart_service::add_to_cart(
            &state,
            &customer,
            AddToCartRequest {
                product_id: product,
                quantity: 1,
            },
        )
        .await?;
        let placed = order_service::place_order(&state, &customer).await?;
        numbers.push(placed.data.unwrap().invoice_number);
    }

    let year = chrono::Utc::now().format("%Y");
    assert_eq!(numbers[0], format!("INV-{year}-0001"));
    assert_eq!(numbers[1], format!("INV-{year}-0002"));

    Ok(())
}

#[tokio::test]
async fn placing_an_order_with_an_empty_cart_fails() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let customer_id = create_user(&state, "user", "customer@example.com").await?;
    let customer = as_user(customer_id);

    let err = order_service::place_order(&state, &customer)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));

    Ok(())
}

// A failure partway through the pipeline rolls back every write: the cart
// survives untouched and no subscription, line, or invoice row is persisted.
#[tokio::test]
async fn a_failed_order_leaves_the_cart_and_persists_nothing() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let customer_id = create_user(&state, "user", "customer@example.com").await?;
    let backups = create_product(&state, "Managed Backups", 1000, None).await?;
    let hosting = create_product(&state, "Starter Hosting", 500, None).await?;
    let customer = as_user(customer_id);

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: backups,
            quantity: 1,
        },
    )
    .await?;
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: hosting,
            quantity: 2,
        },
    )
    .await?;

    // Occupy the number the pipeline will allocate next, so its invoice
    // insert trips the unique constraint after the subscription and its
    // lines are already written inside the transaction.
    let year = chrono::Utc::now().format("%Y");
    sqlx::query(
        r#"
        INSERT INTO invoices (id, invoice_number, customer_id, amount, due_date)
        VALUES ($1, $2, $3, 100, now())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(format!("INV-{year}-0001"))
    .bind(customer_id)
    .execute(&state.pool)
    .await?;

    assert!(order_service::place_order(&state, &customer).await.is_err());

    let cart_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE user_id = $1")
        .bind(customer_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(cart_count, 2);

    let sub_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions")
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(sub_count, 0);

    let line_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscription_lines")
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(line_count, 0);

    // Only the staged invoice remains.
    let invoice_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(invoice_count, 1);

    Ok(())
}

#[tokio::test]
async fn removing_a_missing_cart_line_is_a_no_op() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let customer_id = create_user(&state, "user", "customer@example.com").await?;
    let customer = as_user(customer_id);

    cart_service::remove_line(&state, &customer, Uuid::new_v4()).await?;

    Ok(())
}

// Quantity edits leave an audit row like adds and removals do.
#[tokio::test]
async fn updating_a_cart_line_quantity_is_audited() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let customer_id = create_user(&state, "user", "customer@example.com").await?;
    let product = create_product(&state, "Starter Hosting", 500, None).await?;
    let customer = as_user(customer_id);

    let added = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product,
            quantity: 1,
        },
    )
    .await?;
    let line_id = added.data.unwrap().id;

    let updated = cart_service::update_quantity(
        &state,
        &customer,
        line_id,
        UpdateQuantityRequest { quantity: 5 },
    )
    .await?;
    assert_eq!(updated.data.unwrap().quantity, 5);

    let audits: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_logs WHERE action = 'cart_update' AND user_id = $1",
    )
    .bind(customer_id)
    .fetch_one(&state.pool)
    .await?;
    assert_eq!(audits, 1);

    Ok(())
}

// Manually walking an invoice to paid does not fabricate a payment record.
#[tokio::test]
async fn manual_paid_status_records_no_payment() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run DB tests.");
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let alice_id = create_user(&state, "internal_staff", "alice@example.com").await?;
    let customer_id = create_user(&state, "user", "customer@example.com").await?;
    let staff = as_staff(alice_id);

    let created = invoice_service::create_invoice(
        &state,
        &staff,
        CreateInvoiceRequest {
            customer_id,
            amount: 2500,
            subscription_id: None,
            due_date: None,
        },
    )
    .await?;
    let invoice = created.data.unwrap();
    assert_eq!(invoice.status, "draft");

    invoice_service::set_status(
        &state,
        &staff,
        invoice.id,
        UpdateInvoiceStatusRequest {
            status: InvoiceStatus::Confirmed,
        },
    )
    .await?;
    let updated = invoice_service::set_status(
        &state,
        &staff,
        invoice.id,
        UpdateInvoiceStatusRequest {
            status: InvoiceStatus::Paid,
        },
    )
    .await?;
    assert_eq!(updated.data.unwrap().status, "paid");

    let payment_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE invoice_id = $1")
            .bind(invoice.id)
            .fetch_one(&state.pool)
            .await?;
    assert_eq!(payment_count, 0);

    // Paid is terminal for the manual path too.
    let err = invoice_service::set_status(
        &state,
        &staff,
        invoice.id,
        UpdateInvoiceStatusRequest {
            status: InvoiceStatus::Draft,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    Ok(())
}
