//! Authenticated client for the Shopify Admin API.
//!
//! Fetches a merchant's live catalog — products with variants, custom
//! collections, and a collection's products — using a per-merchant access
//! token and API version. Every call fetches fresh data: the catalog is
//! externally authoritative and no caching layer sits in between.

mod client;
mod error;
mod snapshot;
mod types;

pub use client::{ShopCredential, ShopifyAdminClient};
pub use error::ShopifyError;
pub use snapshot::snapshot_from_products;
pub use types::{
    CustomCollection, CustomCollectionsResponse, ShopifyProduct, ShopifyProductsResponse,
    ShopifyVariant,
};
