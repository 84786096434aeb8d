use chrono::DateTime;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddToCartRequest, CartLineDto, CartList, UpdateQuantityRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartLine, Product},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

#[derive(FromRow)]
struct CartWithProductRow {
    line_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    name: String,
    description: Option<String>,
    price: i64,
    cost: i64,
    product_type: String,
    active: bool,
    owning_staff_id: Option<Uuid>,
    created_at: DateTime<chrono::Utc>,
}

/// Cart lines joined with the live product rows; the price shown is always
/// the current catalog price, not the price at add time.
pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    let (page, limit, offset) = pagination.normalize();
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT cl.id AS line_id, cl.quantity,
               p.id AS product_id, p.name, p.description, p.price, p.cost,
               p.product_type, p.active, p.owning_staff_id, p.created_at
        FROM cart_lines cl
        JOIN products p ON p.id = cl.product_id
        WHERE cl.user_id = $1
        ORDER BY cl.created_at ASC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_lines WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    let items = rows
        .into_iter()
        .map(|row| CartLineDto {
            id: row.line_id,
            product: Product {
                id: row.product_id,
                name: row.name,
                description: row.description,
                price: row.price,
                cost: row.cost,
                product_type: row.product_type,
                active: row.active,
                owning_staff_id: row.owning_staff_id,
                created_at: row.created_at,
            },
            quantity: row.quantity,
        })
        .collect();

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

/// Adding an already-carted product increments the existing line instead of
/// duplicating it.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartLine>> {
    if payload.quantity <= 0 {
        return Err(AppError::InvalidInput(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product_exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(&state.pool)
        .await?;
    if product_exist.is_none() {
        return Err(AppError::NotFound);
    }

    let cart_line = sqlx::query_as::<_, CartLine>(
        r#"
        INSERT INTO cart_lines (id, user_id, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.quantity)
    .fetch_one(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        Some("cart_lines"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", cart_line, None))
}

pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    line_id: Uuid,
    payload: UpdateQuantityRequest,
) -> AppResult<ApiResponse<CartLine>> {
    if payload.quantity <= 0 {
        return Err(AppError::InvalidInput(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, CartLine>(
        r#"
        UPDATE cart_lines
        SET quantity = $3
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(line_id)
    .bind(user.user_id)
    .bind(payload.quantity)
    .fetch_optional(&state.pool)
    .await?;

    let cart_line = match updated {
        Some(line) => line,
        None => return Err(AppError::NotFound),
    };

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_update",
        Some("cart_lines"),
        Some(serde_json::json!({ "line_id": line_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", cart_line, None))
}

/// Removal is idempotent: deleting an absent line succeeds and changes nothing.
pub async fn remove_line(
    state: &AppState,
    user: &AuthUser,
    line_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    sqlx::query("DELETE FROM cart_lines WHERE id = $1 AND user_id = $2")
        .bind(line_id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        Some("cart_lines"),
        Some(serde_json::json!({ "line_id": line_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
