//! Subscription lifecycle: create/update/delete, typed status transitions,
//! renewal, and detail listing.
//!
//! `recurring_amount` is always recomputed from the lines inside the same
//! transaction that writes them; it is never accepted from the caller.

use chrono::Utc;
use std::collections::HashMap;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::subscriptions::{
        CreateSubscriptionRequest, CreatedSubscription, SubscriptionDetailList,
        SubscriptionLineInput, SubscriptionList, SubscriptionWithDetail,
        UpdateSubscriptionRequest, UpdateSubscriptionStatusRequest,
    },
    entity::{
        invoices::{Column as InvoiceCol, Entity as Invoices},
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        subscription_lines::{
            ActiveModel as LineActive, Column as LineCol, Entity as SubscriptionLines,
        },
        subscriptions::{
            ActiveModel as SubscriptionActive, Column as SubCol, Entity as Subscriptions,
        },
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    lifecycle::{Role, SubscriptionStatus},
    middleware::auth::{AuthUser, ensure_staff},
    models::{Invoice, Subscription, SubscriptionLine},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, SortOrder, SubscriptionListQuery},
    services::visibility::{RecordScope, customer_condition, record_scope, scoped_customer_ids},
    state::AppState,
};

/// Resolve a line's product by id, or by name, creating a minimal product
/// record when the name matches nothing. Returns whether a product was
/// created so callers (and tests) can observe the branch taken.
pub async fn resolve_or_create_product<C: ConnectionTrait>(
    conn: &C,
    input: &SubscriptionLineInput,
    creator_staff: Option<Uuid>,
) -> AppResult<(crate::entity::products::Model, bool)> {
    if let Some(product_id) = input.product_id {
        let product = Products::find_by_id(product_id)
            .one(conn)
            .await?
            .ok_or(AppError::NotFound)?;
        return Ok((product, false));
    }

    let name = match input.product_name.as_ref().filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => {
            return Err(AppError::InvalidInput(
                "line requires product_id or product_name".into(),
            ));
        }
    };

    if let Some(product) = Products::find()
        .filter(ProdCol::Name.eq(name.clone()))
        .one(conn)
        .await?
    {
        return Ok((product, false));
    }

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.clone()),
        description: Set(None),
        price: Set(input.unit_price.unwrap_or(0)),
        cost: Set(0),
        product_type: Set("service".into()),
        active: Set(true),
        owning_staff_id: Set(creator_staff),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    Ok((product, true))
}

struct PreparedLine {
    product_id: Uuid,
    quantity: i32,
    unit_price: i64,
    subtotal: i64,
}

async fn prepare_lines<C: ConnectionTrait>(
    conn: &C,
    lines: &[SubscriptionLineInput],
    creator_staff: Option<Uuid>,
) -> AppResult<(Vec<PreparedLine>, i64)> {
    if lines.is_empty() {
        return Err(AppError::InvalidInput(
            "subscription requires at least one line".into(),
        ));
    }

    let mut prepared = Vec::with_capacity(lines.len());
    let mut recurring_amount: i64 = 0;

    for input in lines {
        if input.quantity <= 0 {
            return Err(AppError::InvalidInput(
                "quantity must be greater than 0".into(),
            ));
        }
        let (product, _created) = resolve_or_create_product(conn, input, creator_staff).await?;
        let unit_price = input.unit_price.unwrap_or(product.price);
        let subtotal = unit_price * (input.quantity as i64);
        recurring_amount += subtotal;
        prepared.push(PreparedLine {
            product_id: product.id,
            quantity: input.quantity,
            unit_price,
            subtotal,
        });
    }

    Ok((prepared, recurring_amount))
}

async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    subscription_id: Uuid,
    prepared: &[PreparedLine],
) -> AppResult<()> {
    for line in prepared {
        LineActive {
            id: Set(Uuid::new_v4()),
            subscription_id: Set(subscription_id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            subtotal: Set(line.subtotal),
            created_at: NotSet,
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

fn creator_staff(user: &AuthUser) -> Option<Uuid> {
    (user.role == Role::InternalStaff).then_some(user.user_id)
}

pub async fn create(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSubscriptionRequest,
) -> AppResult<ApiResponse<CreatedSubscription>> {
    ensure_staff(user)?;

    let txn = state.orm.begin().await?;

    Users::find_by_id(payload.customer_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let (prepared, recurring_amount) =
        prepare_lines(&txn, &payload.lines, creator_staff(user)).await?;

    let now = Utc::now();
    let subscription = SubscriptionActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(payload.customer_id),
        plan: Set(payload.plan),
        status: Set(SubscriptionStatus::Quotation.as_str().into()),
        recurring_amount: Set(recurring_amount),
        payment_term: Set(payload
            .payment_term
            .unwrap_or_else(|| "Immediate Payment".into())),
        sales_person: Set(payload.sales_person.unwrap_or_default()),
        origin: Set("manual".into()),
        start_date: Set(now.into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    insert_lines(&txn, subscription.id, &prepared).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "subscription_create",
        Some("subscriptions"),
        Some(serde_json::json!({ "subscription_id": subscription.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Subscription created",
        CreatedSubscription {
            id: subscription.id,
        },
        Some(Meta::empty()),
    ))
}

/// Header fields are replaced and every existing line is deleted before the
/// submitted lines are inserted. A line not resubmitted is gone; this is the
/// contract, not an accident.
pub async fn update(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSubscriptionRequest,
) -> AppResult<ApiResponse<Subscription>> {
    ensure_staff(user)?;

    let txn = state.orm.begin().await?;

    let existing = Subscriptions::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let (prepared, recurring_amount) =
        prepare_lines(&txn, &payload.lines, creator_staff(user)).await?;

    SubscriptionLines::delete_many()
        .filter(LineCol::SubscriptionId.eq(id))
        .exec(&txn)
        .await?;
    insert_lines(&txn, id, &prepared).await?;

    let mut active: SubscriptionActive = existing.into();
    active.plan = Set(payload.plan);
    if let Some(payment_term) = payload.payment_term {
        active.payment_term = Set(payment_term);
    }
    if let Some(sales_person) = payload.sales_person {
        active.sales_person = Set(sales_person);
    }
    active.recurring_amount = Set(recurring_amount);
    active.updated_at = Set(Utc::now().into());
    let subscription = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "subscription_update",
        Some("subscriptions"),
        Some(serde_json::json!({ "subscription_id": subscription.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Subscription updated",
        Subscription::from(subscription),
        Some(Meta::empty()),
    ))
}

/// Hard delete; lines go with it via the cascade on the foreign key.
pub async fn delete(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;

    let result = Subscriptions::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "subscription_delete",
        Some("subscriptions"),
        Some(serde_json::json!({ "subscription_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn set_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSubscriptionStatusRequest,
) -> AppResult<ApiResponse<Subscription>> {
    ensure_staff(user)?;

    let existing = Subscriptions::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let current: SubscriptionStatus = existing.status.parse()?;
    let next = current.transition(payload.status)?;

    let mut active: SubscriptionActive = existing.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let subscription = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "subscription_status_update",
        Some("subscriptions"),
        Some(serde_json::json!({ "subscription_id": subscription.id, "status": subscription.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Subscription updated",
        Subscription::from(subscription),
        Some(Meta::empty()),
    ))
}

/// Renewal and upsell do not mutate the running subscription; they spawn a
/// fresh quotation carrying the same lines.
pub async fn renew(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<CreatedSubscription>> {
    ensure_staff(user)?;

    let txn = state.orm.begin().await?;

    let source = Subscriptions::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let status: SubscriptionStatus = source.status.parse()?;
    if !status.is_active() {
        return Err(AppError::InvalidTransition {
            from: status.as_str().to_string(),
            to: SubscriptionStatus::Quotation.as_str().to_string(),
        });
    }

    let lines = SubscriptionLines::find()
        .filter(LineCol::SubscriptionId.eq(id))
        .all(&txn)
        .await?;

    let now = Utc::now();
    let renewal = SubscriptionActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(source.customer_id),
        plan: Set(source.plan.clone()),
        status: Set(SubscriptionStatus::Quotation.as_str().into()),
        recurring_amount: Set(source.recurring_amount),
        payment_term: Set(source.payment_term.clone()),
        sales_person: Set(source.sales_person.clone()),
        origin: Set("manual".into()),
        start_date: Set(now.into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for line in &lines {
        LineActive {
            id: Set(Uuid::new_v4()),
            subscription_id: Set(renewal.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            subtotal: Set(line.subtotal),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "subscription_renew",
        Some("subscriptions"),
        Some(serde_json::json!({ "source_id": id, "subscription_id": renewal.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Renewal quotation created",
        CreatedSubscription { id: renewal.id },
        Some(Meta::empty()),
    ))
}

pub async fn list(
    state: &AppState,
    user: &AuthUser,
    query: SubscriptionListQuery,
) -> AppResult<ApiResponse<SubscriptionList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let ids = scoped_customer_ids(&state.orm, record_scope(user)).await?;
    let mut condition = customer_condition(SubCol::CustomerId, &ids);
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(SubCol::Status.eq(status.clone()));
    }

    let mut finder = Subscriptions::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(SubCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(SubCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Subscription::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Subscriptions",
        SubscriptionList { items },
        Some(meta),
    ))
}

/// Lines and invoice history for a page of subscriptions, fetched with two
/// IN-list queries rather than one pair of queries per subscription.
pub async fn list_with_detail(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<SubscriptionDetailList>> {
    let (page, limit, offset) = pagination.normalize();

    let ids = scoped_customer_ids(&state.orm, record_scope(user)).await?;
    let condition = customer_condition(SubCol::CustomerId, &ids);

    let finder = Subscriptions::find()
        .filter(condition)
        .order_by_desc(SubCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let subscriptions = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let sub_ids: Vec<Uuid> = subscriptions.iter().map(|s| s.id).collect();

    let mut lines_by_sub: HashMap<Uuid, Vec<SubscriptionLine>> = HashMap::new();
    let mut invoices_by_sub: HashMap<Uuid, Vec<Invoice>> = HashMap::new();

    if !sub_ids.is_empty() {
        for line in SubscriptionLines::find()
            .filter(LineCol::SubscriptionId.is_in(sub_ids.clone()))
            .order_by_asc(LineCol::CreatedAt)
            .all(&state.orm)
            .await?
        {
            lines_by_sub
                .entry(line.subscription_id)
                .or_default()
                .push(SubscriptionLine::from(line));
        }

        for invoice in Invoices::find()
            .filter(InvoiceCol::SubscriptionId.is_in(sub_ids))
            .order_by_asc(InvoiceCol::CreatedAt)
            .all(&state.orm)
            .await?
        {
            if let Some(subscription_id) = invoice.subscription_id {
                invoices_by_sub
                    .entry(subscription_id)
                    .or_default()
                    .push(Invoice::from(invoice));
            }
        }
    }

    let items = subscriptions
        .into_iter()
        .map(|sub| {
            let lines = lines_by_sub.remove(&sub.id).unwrap_or_default();
            let invoices = invoices_by_sub.remove(&sub.id).unwrap_or_default();
            SubscriptionWithDetail {
                subscription: Subscription::from(sub),
                lines,
                invoices,
            }
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Subscriptions",
        SubscriptionDetailList { items },
        Some(meta),
    ))
}

pub async fn get_with_detail(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<SubscriptionWithDetail>> {
    let subscription = Subscriptions::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    authorize_subscription_read(state, user, subscription.customer_id).await?;

    let lines = SubscriptionLines::find()
        .filter(LineCol::SubscriptionId.eq(id))
        .order_by_asc(LineCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(SubscriptionLine::from)
        .collect();

    let invoices = Invoices::find()
        .filter(InvoiceCol::SubscriptionId.eq(id))
        .order_by_asc(InvoiceCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Invoice::from)
        .collect();

    Ok(ApiResponse::success(
        "Subscription",
        SubscriptionWithDetail {
            subscription: Subscription::from(subscription),
            lines,
            invoices,
        },
        Some(Meta::empty()),
    ))
}

async fn authorize_subscription_read(
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
