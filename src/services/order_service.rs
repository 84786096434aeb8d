//! Order pipeline: converts a customer's cart into a subscription, its lines,
//! and a draft invoice in a single transaction. The cart is read under row
//! locks and cleared before commit, so two concurrent orders cannot bill the
//! same cart twice.

use chrono::{Datelike, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult,
    QueryFilter, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::PlaceOrderResponse,
    entity::{
        cart_lines::{Column as CartCol, Entity as CartLines},
        invoices::ActiveModel as InvoiceActive,
        subscription_lines::ActiveModel as LineActive,
        subscriptions::ActiveModel as SubscriptionActive,
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::{AppError, AppResult},
    lifecycle::{InvoiceStatus, SubscriptionStatus},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn format_invoice_number(year: i32, seq: i64) -> String {
    format!("INV-{year}-{seq:04}")
}

/// Allocate the next invoice number for the current year from the per-year
/// counter. Monotonic and collision-free, unlike a random suffix.
pub async fn next_invoice_number<C: ConnectionTrait>(conn: &C) -> AppResult<String> {
    let year = Utc::now().year();
    let stmt = Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        INSERT INTO invoice_counters (year, last_seq)
        VALUES ($1, 1)
        ON CONFLICT (year) DO UPDATE SET last_seq = invoice_counters.last_seq + 1
        RETURNING last_seq
        "#,
        [year.into()],
    );
    let row = conn
        .query_one(stmt)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("invoice counter returned no row")))?;
    let seq: i64 = row.try_get("", "last_seq")?;
    Ok(format_invoice_number(year, seq))
}

#[derive(Debug, FromQueryResult)]
struct CartProductRow {
    product_id: Uuid,
    quantity: i32,
    price: i64,
    owning_staff_id: Option<Uuid>,
}

pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PlaceOrderResponse>> {
    let txn = state.orm.begin().await?;

    // Lock the cart rows for the duration of the transaction; a racing
    // place_order for the same customer blocks here and then sees an empty
    // cart once this one commits.
    let rows = CartProductRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        r#"
        SELECT cl.product_id, cl.quantity, p.price, p.owning_staff_id
        FROM cart_lines cl
        JOIN products p ON p.id = cl.product_id
        WHERE cl.user_id = $1
        ORDER BY cl.created_at ASC
        FOR UPDATE OF cl
        "#,
        [user.user_id.into()],
    ))
    .all(&txn)
    .await?;

    if rows.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let mut recurring_amount: i64 = 0;
    for row in &rows {
        if row.quantity <= 0 {
            return Err(AppError::InvalidInput("cart has invalid quantity".into()));
        }
        recurring_amount += row.price * (row.quantity as i64);
    }

    let now = Utc::now();
    let subscription_id = Uuid::new_v4();

    let subscription = SubscriptionActive {
        id: Set(subscription_id),
        customer_id: Set(user.user_id),
        plan: Set("Monthly".into()),
        status: Set(SubscriptionStatus::Quotation.as_str().into()),
        recurring_amount: Set(recurring_amount),
        payment_term: Set("Immediate Payment".into()),
        sales_person: Set("online".into()),
        origin: Set("checkout".into()),
        start_date: Set(now.into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for row in &rows {
        LineActive {
            id: Set(Uuid::new_v4()),
            subscription_id: Set(subscription.id),
            product_id: Set(row.product_id),
            quantity: Set(row.quantity),
            unit_price: Set(row.price),
            subtotal: Set(row.price * (row.quantity as i64)),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    let invoice_number = next_invoice_number(&txn).await?;

    InvoiceActive {
        id: Set(Uuid::new_v4()),
        invoice_number: Set(invoice_number.clone()),
        subscription_id: Set(Some(subscription.id)),
        customer_id: Set(user.user_id),
        amount: Set(recurring_amount),
        issue_date: Set(now.into()),
        due_date: Set(now.into()),
        status: Set(InvoiceStatus::Draft.as_str().into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    // First purchase of a staff-owned product pins the customer to that staff
    // member; the first cart line (insertion order) wins, later orders never
    // overwrite.
    let customer = Users::find_by_id(user.user_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if customer.assigned_staff_id.is_none()
        && let Some(staff_id) = rows.iter().find_map(|r| r.owning_staff_id)
    {
        let mut active: UserActive = customer.into();
        active.assigned_staff_id = Set(Some(staff_id));
        active.update(&txn).await?;
    }

    CartLines::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_placed",
        Some("subscriptions"),
        Some(serde_json::json!({
            "subscription_id": subscription.id,
            "invoice_number": invoice_number,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed",
        PlaceOrderResponse {
            subscription_id: subscription.id,
            invoice_number,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::format_invoice_number;

    #[test]
    fn invoice_numbers_are_year_scoped_and_zero_padded() {
        assert_eq!(format_invoice_number(2026, 1), "INV-2026-0001");
        assert_eq!(format_invoice_number(2026, 42), "INV-2026-0042");
        assert_eq!(format_invoice_number(2027, 12345), "INV-2027-12345");
    }
}
