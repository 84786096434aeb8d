use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    routes::params::Pagination,
    services::admin_service,
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignStaffRequest {
    pub staff_id: Uuid,
}

#[derive(Serialize, ToSchema)]
pub struct CustomerList {
    pub items: Vec<User>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers))
        .route("/customers/{id}/assign", patch(assign_staff))
}

#[utoipa::path(
    get,
    path = "/api/admin/customers",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "List customer accounts", body = ApiResponse<CustomerList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<CustomerList>>> {
    let resp = admin_service::list_customers(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/customers/{id}/assign",
    params(
        ("id" = Uuid, Path, description = "Customer ID")
    ),
    request_body = AssignStaffRequest,
    responses(
        (status = 200, description = "Assign a staff member to a customer", body = ApiResponse<User>),
        (status = 400, description = "Target is not internal staff"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Customer not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn assign_staff(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignStaffRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::assign_staff(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
