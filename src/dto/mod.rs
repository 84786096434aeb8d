pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod invoices;
pub mod orders;
pub mod products;
pub mod subscriptions;
