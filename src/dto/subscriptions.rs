use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    lifecycle::SubscriptionStatus,
    models::{Invoice, Subscription, SubscriptionLine},
};

/// A line resolves its product by id, or by name when no id is given
/// (creating a minimal product record if the name matches nothing).
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscriptionLineInput {
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub quantity: i32,
    /// Defaults to the resolved product's list price.
    pub unit_price: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubscriptionRequest {
    pub customer_id: Uuid,
    pub plan: String,
    pub payment_term: Option<String>,
    pub sales_person: Option<String>,
    pub lines: Vec<SubscriptionLineInput>,
}

/// Same shape as create: header fields are replaced and the submitted lines
/// replace every existing line wholesale. A line not resubmitted is gone.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSubscriptionRequest {
    pub plan: String,
    pub payment_term: Option<String>,
    pub sales_person: Option<String>,
    pub lines: Vec<SubscriptionLineInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSubscriptionStatusRequest {
    pub status: SubscriptionStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedSubscription {
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionList {
    pub items: Vec<Subscription>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionWithDetail {
    pub subscription: Subscription,
    pub lines: Vec<SubscriptionLine>,
    pub invoices: Vec<Invoice>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionDetailList {
    pub items: Vec<SubscriptionWithDetail>,
}
