use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    lifecycle::Role,
    middleware::auth::{AuthUser, ensure_admin},
    models::User,
    response::{ApiResponse, Meta},
    routes::admin::{AssignStaffRequest, CustomerList},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_customers(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CustomerList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find()
        .filter(UserCol::Role.eq(Role::User.as_str()))
        .order_by_desc(UserCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Customers",
        CustomerList { items },
        Some(meta),
    ))
}

/// Explicit admin reassignment. Unlike the order pipeline's set-once rule,
/// an admin may overwrite an existing assignment.
pub async fn assign_staff(
    state: &AppState,
    user: &AuthUser,
    customer_id: Uuid,
    payload: AssignStaffRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;

    let customer = Users::find_by_id(customer_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let staff = Users::find_by_id(payload.staff_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if staff.role != Role::InternalStaff.as_str() {
        return Err(AppError::InvalidInput(
            "assigned user is not internal staff".into(),
        ));
    }

    let mut active: UserActive = customer.into();
    active.assigned_staff_id = Set(Some(staff.id));
    let customer = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "customer_assign_staff",
        Some("users"),
        Some(serde_json::json!({ "customer_id": customer.id, "staff_id": staff.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Customer assigned",
        User::from(customer),
        Some(Meta::empty()),
    ))
}
