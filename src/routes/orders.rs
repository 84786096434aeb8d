use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::orders::PlaceOrderResponse,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(place_order))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    responses(
        (status = 201, description = "Convert the cart into a subscription with a draft invoice", body = ApiResponse<PlaceOrderResponse>),
        (status = 400, description = "Cart is empty"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<(StatusCode, Json<ApiResponse<PlaceOrderResponse>>)> {
    let resp = order_service::place_order(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
