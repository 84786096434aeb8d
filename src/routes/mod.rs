use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod doc;
pub mod health;
pub mod invoices;
pub mod orders;
pub mod params;
pub mod payments;
pub mod products;
pub mod subscriptions;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/auth", auth::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/subscriptions", subscriptions::router())
        .nest("/invoices", invoices::router())
        .nest("/payments", payments::router())
        .nest("/dashboard", dashboard::router())
        .nest("/admin", admin::router())
}
