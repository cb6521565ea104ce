//! Normalization of Admin API wire types into catalog-snapshot types.

use haggle_core::{CatalogProduct, CatalogSnapshot, CatalogVariant, UNCATEGORIZED};

use crate::types::ShopifyProduct;

/// Builds a normalized snapshot from a raw product list.
///
/// Numeric ids are stringified (JSON consumers would otherwise lose
/// precision on large ids), and an absent or empty `product_type` becomes
/// the [`UNCATEGORIZED`] sentinel so category selection always has a tag to
/// match against. Product and variant order is preserved as returned by the
/// platform.
#[must_use]
pub fn snapshot_from_products(products: Vec<ShopifyProduct>) -> CatalogSnapshot {
    let products = products
        .into_iter()
        .map(|product| {
            let category = match product.product_type {
                Some(ref t) if !t.trim().is_empty() => t.clone(),
                _ => UNCATEGORIZED.to_string(),
            };
            CatalogProduct {
                product_id: product.id.to_string(),
                title: product.title,
                category,
                variants: product
                    .variants
                    .into_iter()
                    .map(|variant| CatalogVariant {
                        variant_id: variant.id.to_string(),
                        title: variant.title,
                        price: variant.price,
                        inventory_quantity: variant.inventory_quantity,
                    })
                    .collect(),
            }
        })
        .collect();

    CatalogSnapshot { products }
}
