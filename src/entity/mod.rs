pub mod audit_logs;
pub mod cart_lines;
pub mod invoices;
pub mod payments;
pub mod products;
pub mod subscription_lines;
pub mod subscriptions;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_lines::Entity as CartLines;
pub use invoices::Entity as Invoices;
pub use payments::Entity as Payments;
pub use products::Entity as Products;
pub use subscription_lines::Entity as SubscriptionLines;
pub use subscriptions::Entity as Subscriptions;
pub use users::Entity as Users;
