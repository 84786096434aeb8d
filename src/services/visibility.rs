//! Role-aware query shaping.
//!
//! Admins see everything, internal staff see the customers assigned to them,
//! customers see their own records, and anonymous callers see only the active
//! catalog. Every read path goes through these helpers.

use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    db::OrmConn,
    entity::{products, users},
    error::AppResult,
    lifecycle::Role,
    middleware::auth::AuthUser,
};

/// How subscription/invoice/payment reads are scoped for a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope {
    All,
    AssignedTo(Uuid),
    Own(Uuid),
}

pub fn record_scope(user: &AuthUser) -> RecordScope {
    match user.role {
        Role::Admin => RecordScope::All,
        Role::InternalStaff => RecordScope::AssignedTo(user.user_id),
        Role::User => RecordScope::Own(user.user_id),
    }
}

/// Customer ids visible under `scope`; `None` means unrestricted.
pub async fn scoped_customer_ids(
    orm: &OrmConn,
    scope: RecordScope,
) -> AppResult<Option<Vec<Uuid>>> {
    match scope {
        RecordScope::All => Ok(None),
        RecordScope::Own(id) => Ok(Some(vec![id])),
        RecordScope::AssignedTo(staff_id) => {
            let ids = users::Entity::find()
                .filter(users::Column::AssignedStaffId.eq(staff_id))
                .all(orm)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect();
            Ok(Some(ids))
        }
    }
}

/// Catalog rule: staff and admin see every product, everyone else (anonymous
/// included) sees active products only, regardless of owner.
pub fn product_visibility(caller: Option<&AuthUser>) -> Condition {
    match caller.map(|u| u.role) {
        Some(Role::Admin) | Some(Role::InternalStaff) => Condition::all(),
        _ => Condition::all().add(products::Column::Active.eq(true)),
    }
}

/// Restrict a customer-id column to the visible ids, if any restriction applies.
pub fn customer_condition<C: ColumnTrait>(col: C, ids: &Option<Vec<Uuid>>) -> Condition {
    match ids {
        None => Condition::all(),
        Some(ids) => Condition::all().add(col.is_in(ids.iter().copied())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn scope_follows_role() {
        let admin = auth(Role::Admin);
        assert_eq!(record_scope(&admin), RecordScope::All);

        let staff = auth(Role::InternalStaff);
        assert_eq!(record_scope(&staff), RecordScope::AssignedTo(staff.user_id));

        let customer = auth(Role::User);
        assert_eq!(record_scope(&customer), RecordScope::Own(customer.user_id));
    }

    #[test]
    fn catalog_is_active_only_below_staff() {
        let anon = product_visibility(None);
        assert!(format!("{anon:?}").contains("Active"));

        let customer = auth(Role::User);
        assert!(format!("{:?}", product_visibility(Some(&customer))).contains("Active"));

        let staff = auth(Role::InternalStaff);
        assert!(!format!("{:?}", product_visibility(Some(&staff))).contains("Active"));

        let admin = auth(Role::Admin);
        assert!(!format!("{:?}", product_visibility(Some(&admin))).contains("Active"));
    }

    #[test]
    fn customer_condition_is_open_when_unrestricted() {
        use crate::entity::invoices;

        let open = customer_condition(invoices::Column::CustomerId, &None);
        assert!(!format!("{open:?}").contains("CustomerId"));

        let narrowed =
            customer_condition(invoices::Column::CustomerId, &Some(vec![Uuid::new_v4()]));
        assert!(format!("{narrowed:?}").contains("CustomerId"));
    }
}
