use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::LoginResponse,
        cart::CartList,
        dashboard::DashboardStats,
        invoices::{InvoiceList, PaymentDto, PaymentList},
        orders::PlaceOrderResponse,
        products,
        subscriptions::{
            CreatedSubscription, SubscriptionDetailList, SubscriptionList, SubscriptionWithDetail,
        },
    },
    models::{CartLine, Invoice, Payment, Product, Subscription, SubscriptionLine, User},
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, cart, dashboard, health, invoices, orders, params, payments,
        products as product_routes, subscriptions,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        cart::list_cart,
        cart::add_to_cart,
        cart::update_quantity,
        cart::remove_line,
        product_routes::list_products,
        product_routes::create_product,
        product_routes::get_product,
        product_routes::update_product,
        product_routes::delete_product,
        orders::place_order,
        subscriptions::list_subscriptions,
        subscriptions::list_with_detail,
        subscriptions::get_subscription,
        subscriptions::create_subscription,
        subscriptions::update_subscription,
        subscriptions::delete_subscription,
        subscriptions::update_status,
        subscriptions::renew_subscription,
        invoices::list_invoices,
        invoices::get_invoice,
        invoices::create_invoice,
        invoices::update_status,
        invoices::pay_invoice,
        payments::list_payments,
        dashboard::stats,
        admin::list_customers,
        admin::assign_staff
    ),
    components(
        schemas(
            User,
            Product,
            CartLine,
            Subscription,
            SubscriptionLine,
            Invoice,
            Payment,
            LoginResponse,
            CartList,
            PlaceOrderResponse,
            SubscriptionList,
            SubscriptionDetailList,
            SubscriptionWithDetail,
            CreatedSubscription,
            InvoiceList,
            PaymentList,
            PaymentDto,
            DashboardStats,
            admin::AssignStaffRequest,
            admin::CustomerList,
            params::Pagination,
            params::ProductQuery,
            params::SubscriptionListQuery,
            params::InvoiceListQuery,
            products::ProductList,
            Meta,
            ApiResponse<Product>,
            ApiResponse<products::ProductList>,
            ApiResponse<SubscriptionWithDetail>,
            ApiResponse<InvoiceList>,
            ApiResponse<DashboardStats>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout endpoint"),
        (name = "Subscriptions", description = "Subscription endpoints"),
        (name = "Invoices", description = "Invoice endpoints"),
        (name = "Payments", description = "Payment endpoints"),
        (name = "Dashboard", description = "Dashboard endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
