//! Typed status machines for subscriptions and invoices, plus the caller role.
//!
//! Statuses are stored as lowercase snake_case strings; every write path goes
//! through [`InvoiceStatus::transition`] / [`SubscriptionStatus::transition`]
//! so an illegal `(current, requested)` pair fails instead of being persisted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    InternalStaff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::InternalStaff => "internal_staff",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "internal_staff" => Ok(Role::InternalStaff),
            other => Err(AppError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Confirmed,
    Cancelled,
    Sent,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Confirmed => "confirmed",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid)
    }

    pub fn can_transition(&self, to: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        match (self, to) {
            (Draft, Confirmed) | (Draft, Cancelled) | (Draft, Sent) | (Draft, Paid) => true,
            (Cancelled, Draft) => true,
            (Confirmed, Cancelled) | (Confirmed, Paid) => true,
            (Sent, Paid) => true,
            _ => false,
        }
    }

    /// Validate `(self, to)` against the transition table.
    pub fn transition(&self, to: InvoiceStatus) -> Result<InvoiceStatus, AppError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(AppError::InvalidTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "confirmed" => Ok(InvoiceStatus::Confirmed),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            "sent" => Ok(InvoiceStatus::Sent),
            "paid" => Ok(InvoiceStatus::Paid),
            other => Err(AppError::InvalidInput(format!(
                "unknown invoice status: {other}"
            ))),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Quotation,
    QuotationSent,
    Confirmed,
    InProgress,
    Churned,
    Closed,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Quotation => "quotation",
            SubscriptionStatus::QuotationSent => "quotation_sent",
            SubscriptionStatus::Confirmed => "confirmed",
            SubscriptionStatus::InProgress => "in_progress",
            SubscriptionStatus::Churned => "churned",
            SubscriptionStatus::Closed => "closed",
        }
    }

    /// Active for dashboard purposes.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Confirmed | SubscriptionStatus::InProgress
        )
    }

    pub fn can_transition(&self, to: SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;
        match (self, to) {
            (Quotation, QuotationSent) | (Quotation, Confirmed) => true,
            (QuotationSent, Confirmed) => true,
            (Confirmed, InProgress) | (Confirmed, Churned) | (Confirmed, Closed) => true,
            (InProgress, Churned) | (InProgress, Closed) => true,
            _ => false,
        }
    }

    pub fn transition(&self, to: SubscriptionStatus) -> Result<SubscriptionStatus, AppError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(AppError::InvalidTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quotation" => Ok(SubscriptionStatus::Quotation),
            "quotation_sent" => Ok(SubscriptionStatus::QuotationSent),
            "confirmed" => Ok(SubscriptionStatus::Confirmed),
            "in_progress" => Ok(SubscriptionStatus::InProgress),
            "churned" => Ok(SubscriptionStatus::Churned),
            "closed" => Ok(SubscriptionStatus::Closed),
            other => Err(AppError::InvalidInput(format!(
                "unknown subscription status: {other}"
            ))),
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_is_terminal() {
        for to in [
            InvoiceStatus::Draft,
            InvoiceStatus::Confirmed,
            InvoiceStatus::Cancelled,
            InvoiceStatus::Sent,
            InvoiceStatus::Paid,
        ] {
            assert!(!InvoiceStatus::Paid.can_transition(to));
        }
        assert!(InvoiceStatus::Paid.is_terminal());
    }

    #[test]
    fn draft_can_reach_every_non_draft_state() {
        assert!(InvoiceStatus::Draft.can_transition(InvoiceStatus::Confirmed));
        assert!(InvoiceStatus::Draft.can_transition(InvoiceStatus::Cancelled));
        assert!(InvoiceStatus::Draft.can_transition(InvoiceStatus::Sent));
        assert!(InvoiceStatus::Draft.can_transition(InvoiceStatus::Paid));
    }

    #[test]
    fn cancelled_invoice_is_resettable() {
        assert!(InvoiceStatus::Cancelled.can_transition(InvoiceStatus::Draft));
        assert!(!InvoiceStatus::Cancelled.can_transition(InvoiceStatus::Sent));
    }

    #[test]
    fn invoice_transition_reports_pair() {
        let err = InvoiceStatus::Paid
            .transition(InvoiceStatus::Draft)
            .unwrap_err();
        match err {
            AppError::InvalidTransition { from, to } => {
                assert_eq!(from, "paid");
                assert_eq!(to, "draft");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn quotation_flow() {
        assert!(SubscriptionStatus::Quotation.can_transition(SubscriptionStatus::QuotationSent));
        assert!(SubscriptionStatus::Quotation.can_transition(SubscriptionStatus::Confirmed));
        assert!(SubscriptionStatus::QuotationSent.can_transition(SubscriptionStatus::Confirmed));
        assert!(!SubscriptionStatus::QuotationSent.can_transition(SubscriptionStatus::Quotation));
    }

    #[test]
    fn churned_and_closed_are_terminal() {
        for from in [SubscriptionStatus::Churned, SubscriptionStatus::Closed] {
            for to in [
                SubscriptionStatus::Quotation,
                SubscriptionStatus::QuotationSent,
                SubscriptionStatus::Confirmed,
                SubscriptionStatus::InProgress,
                SubscriptionStatus::Churned,
                SubscriptionStatus::Closed,
            ] {
                assert!(!from.can_transition(to), "{from} -> {to} should be illegal");
            }
        }
    }

    #[test]
    fn active_statuses_match_dashboard_definition() {
        assert!(SubscriptionStatus::Confirmed.is_active());
        assert!(SubscriptionStatus::InProgress.is_active());
        assert!(!SubscriptionStatus::Quotation.is_active());
        assert!(!SubscriptionStatus::Churned.is_active());
    }

    #[test]
    fn status_strings_round_trip() {
        for s in ["draft", "confirmed", "cancelled", "sent", "paid"] {
            assert_eq!(s.parse::<InvoiceStatus>().unwrap().as_str(), s);
        }
        for s in [
            "quotation",
            "quotation_sent",
            "confirmed",
            "in_progress",
            "churned",
            "closed",
        ] {
            assert_eq!(s.parse::<SubscriptionStatus>().unwrap().as_str(), s);
        }
        for s in ["user", "admin", "internal_staff"] {
            assert_eq!(s.parse::<Role>().unwrap().as_str(), s);
        }
        assert!("shipped".parse::<InvoiceStatus>().is_err());
    }
}
