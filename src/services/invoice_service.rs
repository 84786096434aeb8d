//! Invoice ledger and payment recording.
//!
//! `set_status` is the caller-driven transition path and validates against
//! the typed transition table. `pay_invoice` is the payment edge: it takes
//! any non-paid invoice to `paid` and inserts the payment row in the same
//! transaction, so a payment row never exists without the paid status.

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::invoices::{
        CreateInvoiceRequest, InvoiceList, PaymentDto, PaymentList, UpdateInvoiceStatusRequest,
    },
    entity::{
        invoices::{ActiveModel as InvoiceActive, Column as InvoiceCol, Entity as Invoices},
        payments::ActiveModel as PaymentActive,
        subscriptions::Entity as Subscriptions,
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    lifecycle::{InvoiceStatus, Role},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Invoice, Payment},
    response::{ApiResponse, Meta},
    routes::params::{InvoiceListQuery, Pagination, SortOrder},
    services::visibility::{RecordScope, customer_condition, record_scope, scoped_customer_ids},
    state::AppState,
};

pub async fn list_invoices(
    state: &AppState,
    user: &AuthUser,
    query: InvoiceListQuery,
) -> AppResult<ApiResponse<InvoiceList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let ids = scoped_customer_ids(&state.orm, record_scope(user)).await?;
    let mut condition = customer_condition(InvoiceCol::CustomerId, &ids);
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(InvoiceCol::Status.eq(status.clone()));
    }

    let mut finder = Invoices::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(InvoiceCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(InvoiceCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Invoice::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Invoices",
        InvoiceList { items },
        Some(meta),
    ))
}

pub async fn get_invoice(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Invoice>> {
    let invoice = Invoices::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    authorize_invoice_read(state, user, invoice.customer_id).await?;

    Ok(ApiResponse::success(
        "Invoice",
        Invoice::from(invoice),
        Some(Meta::empty()),
    ))
}

/// Existence is checked before authorization, so a missing invoice is 404 for
/// everyone and 401 never leaks which ids exist.
async fn authorize_invoice_read(
    state: &AppState,
    user: &AuthUser,
    customer_id: Uuid,
) -> AppResult<()> {
    match record_scope(user) {
        RecordScope::All => Ok(()),
        RecordScope::Own(uid) if uid == customer_id => Ok(()),
        RecordScope::Own(_) => Err(AppError::Unauthorized),
        RecordScope::AssignedTo(staff_id) => {
            let customer = Users::find_by_id(customer_id)
                .one(&state.orm)
                .await?
                .ok_or(AppError::NotFound)?;
            if customer.assigned_staff_id == Some(staff_id) {
                Ok(())
            } else {
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// Manual invoice, not tied to the order pipeline.
pub async fn create_invoice(
    state: &AppState,
    user: &AuthUser,
    payload: CreateInvoiceRequest,
) -> AppResult<ApiResponse<Invoice>> {
    ensure_staff(user)?;
    if payload.amount <= 0 {
        return Err(AppError::InvalidInput("amount must be positive".into()));
    }

    let txn = state.orm.begin().await?;

    Users::find_by_id(payload.customer_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(subscription_id) = payload.subscription_id {
        Subscriptions::find_by_id(subscription_id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
    }

    let now = Utc::now();
    let invoice_number = crate::services::order_service::next_invoice_number(&txn).await?;

    let invoice = InvoiceActive {
        id: Set(Uuid::new_v4()),
        invoice_number: Set(invoice_number),
        subscription_id: Set(payload.subscription_id),
        customer_id: Set(payload.customer_id),
        amount: Set(payload.amount),
        issue_date: Set(now.into()),
        due_date: Set(payload.due_date.unwrap_or(now).into()),
        status: Set(InvoiceStatus::Draft.as_str().into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "invoice_create",
        Some("invoices"),
        Some(serde_json::json!({ "invoice_id": invoice.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Invoice created",
        Invoice::from(invoice),
        Some(Meta::empty()),
    ))
}

/// Caller-driven status change, validated against the transition table.
/// Setting `paid` here does not record a payment row; that exception is what
/// `pay_invoice` exists to avoid.
pub async fn set_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateInvoiceStatusRequest,
) -> AppResult<ApiResponse<Invoice>> {
    ensure_staff(user)?;

    let invoice = Invoices::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let current: InvoiceStatus = invoice.status.parse()?;
    let next = current.transition(payload.status)?;

    let mut active: InvoiceActive = invoice.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let invoice = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "invoice_status_update",
        Some("invoices"),
        Some(serde_json::json!({ "invoice_id": invoice.id, "status": invoice.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Invoice updated",
        Invoice::from(invoice),
        Some(Meta::empty()),
    ))
}

pub async fn pay_invoice(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let txn = state.orm.begin().await?;

    let invoice = Invoices::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    // 404 before 401; only the invoice's customer or an admin may pay.
    if user.role != Role::Admin && invoice.customer_id != user.user_id {
        return Err(AppError::Unauthorized);
    }

    let current: InvoiceStatus = invoice.status.parse()?;
    if current.is_terminal() {
        return Err(AppError::AlreadyPaid);
    }

    let now = Utc::now();
    let amount = invoice.amount;

    let mut active: InvoiceActive = invoice.into();
    active.status = Set(InvoiceStatus::Paid.as_str().into());
    active.updated_at = Set(now.into());
    let invoice = active.update(&txn).await?;

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        invoice_id: Set(invoice.id),
        amount: Set(amount),
        paid_at: Set(now.into()),
        method: Set("internal".into()),
        reference: Set(format!("PAY-{}", Uuid::new_v4().simple())),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "invoice_paid",
        Some("invoices"),
        Some(serde_json::json!({ "invoice_id": invoice.id, "payment_id": payment.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment recorded",
        Payment::from(payment),
        Some(Meta::empty()),
    ))
}

#[derive(FromRow)]
struct PaymentJoinRow {
    id: Uuid,
    invoice_id: Uuid,
    amount: i64,
    paid_at: chrono::DateTime<Utc>,
    method: String,
    reference: String,
    created_at: chrono::DateTime<Utc>,
    invoice_number: String,
    customer_email: String,
}

pub async fn list_payments(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<PaymentList>> {
    let (page, limit, offset) = pagination.normalize();
    let ids = scoped_customer_ids(&state.orm, record_scope(user)).await?;

    let rows = sqlx::query_as::<_, PaymentJoinRow>(
        r#"
        SELECT p.id, p.invoice_id, p.amount, p.paid_at, p.method, p.reference, p.created_at,
               i.invoice_number, u.email AS customer_email
        FROM payments p
        JOIN invoices i ON i.id = p.invoice_id
        JOIN users u ON u.id = i.customer_id
        WHERE ($1::uuid[] IS NULL OR i.customer_id = ANY($1))
        ORDER BY p.paid_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(ids.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM payments p
        JOIN invoices i ON i.id = p.invoice_id
        WHERE ($1::uuid[] IS NULL OR i.customer_id = ANY($1))
        "#,
    )
    .bind(ids.as_deref())
    .fetch_one(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| PaymentDto {
            payment: Payment {
                id: row.id,
                invoice_id: row.invoice_id,
                amount: row.amount,
                paid_at: row.paid_at,
                method: row.method,
                reference: row.reference,
                created_at: row.created_at,
            },
            invoice_number: row.invoice_number,
            customer_email: row.customer_email,
        })
        .collect();

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Payments",
        PaymentList { items },
        Some(meta),
    ))
}
