//! Shopify Admin API response types.
//!
//! Every field here is untrusted external data. Optional/absent fields get
//! `#[serde(default)]` so a sparse store (no `product_type`, no tracked
//! inventory) still deserializes; normalization into catalog-snapshot types
//! happens in `snapshot.rs`.

use serde::Deserialize;

/// Top-level response from `GET /admin/api/{version}/products.json`.
#[derive(Debug, Deserialize)]
pub struct ShopifyProductsResponse {
    pub products: Vec<ShopifyProduct>,
}

/// A single product from the merchant's store.
#[derive(Debug, Deserialize)]
pub struct ShopifyProduct {
    /// Shopify numeric product ID (e.g., `6789012345678`).
    pub id: i64,

    /// Display name of the product.
    pub title: String,

    /// Merchant-assigned category string. May be absent or empty (`""`);
    /// both normalize to the `Uncategorized` sentinel.
    #[serde(default)]
    pub product_type: Option<String>,

    /// All purchasable variants for this product. Defaults to empty so a
    /// variant-less draft product does not fail the whole snapshot.
    #[serde(default)]
    pub variants: Vec<ShopifyVariant>,
}

/// A single purchasable variant of a [`ShopifyProduct`].
#[derive(Debug, Deserialize)]
pub struct ShopifyVariant {
    /// Shopify numeric variant ID.
    pub id: i64,

    /// Display title of the variant; `"Default Title"` for single-variant
    /// products.
    pub title: String,

    /// Current price as a decimal string (e.g., `"30.00"`).
    pub price: String,

    /// On-hand inventory. Absent when the store does not track inventory;
    /// treated as zero.
    #[serde(default)]
    pub inventory_quantity: i64,
}

/// Top-level response from `GET /admin/api/{version}/custom_collections.json`.
#[derive(Debug, Deserialize)]
pub struct CustomCollectionsResponse {
    pub custom_collections: Vec<CustomCollection>,
}

/// A merchant-curated collection.
#[derive(Debug, Deserialize)]
pub struct CustomCollection {
    pub id: i64,
    pub title: String,
}
