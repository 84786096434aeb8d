use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::subscriptions::{
        CreateSubscriptionRequest, CreatedSubscription, SubscriptionDetailList, SubscriptionList,
        SubscriptionWithDetail, UpdateSubscriptionRequest, UpdateSubscriptionStatusRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Subscription,
    response::ApiResponse,
    routes::params::{Pagination, SubscriptionListQuery},
    services::subscription_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscriptions).post(create_subscription))
        .route("/detail", get(list_with_detail))
        .route(
            "/{id}",
            get(get_subscription)
                .put(update_subscription)
                .delete(delete_subscription),
        )
        .route("/{id}/status", patch(update_status))
        .route("/{id}/renew", post(renew_subscription))
}

#[utoipa::path(
    get,
    path = "/api/subscriptions",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
    ),
    responses(
        (status = 200, description = "List subscriptions visible to the caller", body = ApiResponse<SubscriptionList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SubscriptionListQuery>,
) -> AppResult<Json<ApiResponse<SubscriptionList>>> {
    let resp = subscription_service::list(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/subscriptions/detail",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "List subscriptions with lines and customer email", body = ApiResponse<SubscriptionDetailList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn list_with_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<SubscriptionDetailList>>> {
    let resp = subscription_service::list_with_detail(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/subscriptions/{id}",
    params(
        ("id" = Uuid, Path, description = "Subscription ID")
    ),
    responses(
        (status = 200, description = "Get a subscription with its lines", body = ApiResponse<SubscriptionWithDetail>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not visible or not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn get_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SubscriptionWithDetail>>> {
    let resp = subscription_service::get_with_detail(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/subscriptions",
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 201, description = "Create a subscription with lines and a draft invoice", body = ApiResponse<CreatedSubscription>),
        (status = 400, description = "No lines or invalid quantity"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn create_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedSubscription>>)> {
    let resp = subscription_service::create(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/subscriptions/{id}",
    params(
        ("id" = Uuid, Path, description = "Subscription ID")
    ),
    request_body = UpdateSubscriptionRequest,
    responses(
        (status = 200, description = "Replace subscription fields and lines", body = ApiResponse<Subscription>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn update_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> AppResult<Json<ApiResponse<Subscription>>> {
    let resp = subscription_service::update(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/subscriptions/{id}",
    params(
        ("id" = Uuid, Path, description = "Subscription ID")
    ),
    responses(
        (status = 200, description = "Delete a subscription and its lines"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn delete_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = subscription_service::delete(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/subscriptions/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Subscription ID")
    ),
    request_body = UpdateSubscriptionStatusRequest,
    responses(
        (status = 200, description = "Move a subscription through its lifecycle", body = ApiResponse<Subscription>),
        (status = 400, description = "Invalid transition"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriptionStatusRequest>,
) -> AppResult<Json<ApiResponse<Subscription>>> {
    let resp = subscription_service::set_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/subscriptions/{id}/renew",
    params(
        ("id" = Uuid, Path, description = "Subscription ID")
    ),
    responses(
        (status = 201, description = "Clone an active subscription into a fresh quotation", body = ApiResponse<CreatedSubscription>),
        (status = 400, description = "Subscription is not active"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn renew_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedSubscription>>)> {
    let resp = subscription_service::renew(&state, &user, id).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
