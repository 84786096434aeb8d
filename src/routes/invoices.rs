use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::invoices::{CreateInvoiceRequest, InvoiceList, UpdateInvoiceStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Invoice, Payment},
    response::ApiResponse,
    routes::params::InvoiceListQuery,
    services::invoice_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route("/{id}", get(get_invoice))
        .route("/{id}/status", patch(update_status))
        .route("/{id}/pay", post(pay_invoice))
}

#[utoipa::path(
    get,
    path = "/api/invoices",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
    ),
    responses(
        (status = 200, description = "List invoices visible to the caller", body = ApiResponse<InvoiceList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<InvoiceListQuery>,
) -> AppResult<Json<ApiResponse<InvoiceList>>> {
    let resp = invoice_service::list_invoices(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    params(
        ("id" = Uuid, Path, description = "Invoice ID")
    ),
    responses(
        (status = 200, description = "Get an invoice", body = ApiResponse<Invoice>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not visible or not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Invoice>>> {
    let resp = invoice_service::get_invoice(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Create a draft invoice", body = ApiResponse<Invoice>),
        (status = 400, description = "Invalid amount"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Customer or subscription not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateInvoiceRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Invoice>>)> {
    let resp = invoice_service::create_invoice(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/invoices/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Invoice ID")
    ),
    request_body = UpdateInvoiceStatusRequest,
    responses(
        (status = 200, description = "Move an invoice through its lifecycle", body = ApiResponse<Invoice>),
        (status = 400, description = "Invalid transition"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceStatusRequest>,
) -> AppResult<Json<ApiResponse<Invoice>>> {
    let resp = invoice_service::set_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/invoices/{id}/pay",
    params(
        ("id" = Uuid, Path, description = "Invoice ID")
    ),
    responses(
        (status = 200, description = "Record a payment and mark the invoice paid", body = ApiResponse<Payment>),
        (status = 400, description = "Invoice already paid"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not visible or not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn pay_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = invoice_service::pay_invoice(&state, &user, id).await?;
    Ok(Json(resp))
}
