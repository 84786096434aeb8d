//! On-demand rollups, no caching. Every figure is filtered by the caller's
//! visibility scope before aggregation.

use crate::{
    dto::dashboard::DashboardStats,
    error::AppResult,
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    services::visibility::{record_scope, scoped_customer_ids},
    state::AppState,
};

pub async fn stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardStats>> {
    let ids = scoped_customer_ids(&state.orm, record_scope(user)).await?;

    let active_subscriptions: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM subscriptions
        WHERE status IN ('confirmed', 'in_progress')
          AND ($1::uuid[] IS NULL OR customer_id = ANY($1))
        "#,
    )
    .bind(ids.as_deref())
    .fetch_one(&state.pool)
    .await?;

    let pending_invoices: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM invoices
        WHERE status IN ('draft', 'sent')
          AND ($1::uuid[] IS NULL OR customer_id = ANY($1))
        "#,
    )
    .bind(ids.as_deref())
    .fetch_one(&state.pool)
    .await?;

    // Calendar-date match in server-local time.
    let todays_collections: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(p.amount), 0)
        FROM payments p
        JOIN invoices i ON i.id = p.invoice_id
        WHERE p.paid_at::date = CURRENT_DATE
          AND ($1::uuid[] IS NULL OR i.customer_id = ANY($1))
        "#,
    )
    .bind(ids.as_deref())
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Dashboard",
        DashboardStats {
            active_subscriptions,
            pending_invoices,
            todays_collections,
        },
        Some(Meta::empty()),
    ))
}
