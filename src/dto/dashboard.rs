use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub active_subscriptions: i64,
    pub pending_invoices: i64,
    pub todays_collections: i64,
}
