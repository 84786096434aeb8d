use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    /// Added to any existing line for the same product.
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartList {
    pub items: Vec<CartLineDto>,
}

/// Cart line joined with the live product record; prices are whatever the
/// catalog says at read time, not what they were when the line was added.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineDto {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
}
