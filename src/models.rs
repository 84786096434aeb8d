use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity;

#[derive(Debug, Serialize, Deserialize, ToSchema, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub assigned_staff_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub cost: i64,
    pub product_type: String,
    pub active: bool,
    pub owning_staff_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, FromRow)]
pub struct CartLine {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Subscription {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub plan: String,
    pub status: String,
    pub recurring_amount: i64,
    pub payment_term: String,
    pub sales_person: String,
    pub origin: String,
    pub start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionLine {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub subtotal: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub subscription_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub amount: i64,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: i64,
    pub paid_at: DateTime<Utc>,
    pub method: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl From<entity::users::Model> for User {
    fn from(model: entity::users::Model) -> Self {
        User {
            id: model.id,
            email: model.email,
            role: model.role,
            assigned_staff_id: model.assigned_staff_id,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::products::Model> for Product {
    fn from(model: entity::products::Model) -> Self {
        Product {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            cost: model.cost,
            product_type: model.product_type,
            active: model.active,
            owning_staff_id: model.owning_staff_id,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::cart_lines::Model> for CartLine {
    fn from(model: entity::cart_lines::Model) -> Self {
        CartLine {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            quantity: model.quantity,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::subscriptions::Model> for Subscription {
    fn from(model: entity::subscriptions::Model) -> Self {
        Subscription {
            id: model.id,
            customer_id: model.customer_id,
            plan: model.plan,
            status: model.status,
            recurring_amount: model.recurring_amount,
            payment_term: model.payment_term,
            sales_person: model.sales_person,
            origin: model.origin,
            start_date: model.start_date.with_timezone(&Utc),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::subscription_lines::Model> for SubscriptionLine {
    fn from(model: entity::subscription_lines::Model) -> Self {
        SubscriptionLine {
            id: model.id,
            subscription_id: model.subscription_id,
            product_id: model.product_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            subtotal: model.subtotal,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::invoices::Model> for Invoice {
    fn from(model: entity::invoices::Model) -> Self {
        Invoice {
            id: model.id,
            invoice_number: model.invoice_number,
            subscription_id: model.subscription_id,
            customer_id: model.customer_id,
            amount: model.amount,
            issue_date: model.issue_date.with_timezone(&Utc),
            due_date: model.due_date.with_timezone(&Utc),
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<entity::payments::Model> for Payment {
    fn from(model: entity::payments::Model) -> Self {
        Payment {
            id: model.id,
            invoice_id: model.invoice_id,
            amount: model.amount,
            paid_at: model.paid_at.with_timezone(&Utc),
            method: model.method,
            reference: model.reference,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
