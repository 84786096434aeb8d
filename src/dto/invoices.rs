use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    lifecycle::InvoiceStatus,
    models::{Invoice, Payment},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvoiceRequest {
    pub customer_id: Uuid,
    pub amount: i64,
    pub subscription_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInvoiceStatusRequest {
    pub status: InvoiceStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceList {
    pub items: Vec<Invoice>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentList {
    pub items: Vec<PaymentDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentDto {
    #[serde(flatten)]
    pub payment: Payment,
    pub invoice_number: String,
    pub customer_email: String,
}
