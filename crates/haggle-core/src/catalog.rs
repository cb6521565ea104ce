use serde::{Deserialize, Serialize};

/// Category assigned to products whose upstream `product_type` is absent or
/// empty. Category matching is case-sensitive, so the sentinel itself is a
/// selectable category name.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A point-in-time read of a merchant's external catalog.
///
/// Never persisted locally — the external platform stays authoritative and
/// every reconciliation fetches a fresh snapshot. Consumers must tolerate
/// the snapshot going stale between fetch and write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub products: Vec<CatalogProduct>,
}

/// A product from the external catalog, normalized for resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// External numeric product ID, stored as a string to avoid precision loss.
    pub product_id: String,
    pub title: String,
    /// Category tag; [`UNCATEGORIZED`] when absent upstream.
    pub category: String,
    pub variants: Vec<CatalogVariant>,
}

/// A single purchasable variant of a [`CatalogProduct`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogVariant {
    /// External numeric variant ID, stored as a string to avoid precision loss.
    pub variant_id: String,
    /// Display title; `"Default Title"` for single-variant products.
    pub title: String,
    /// Price as a decimal string, exactly as the platform returns it.
    pub price: String,
    pub inventory_quantity: i64,
}

impl CatalogSnapshot {
    /// Returns `true` when the merchant has no products at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Total variant count across every product.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.products.iter().map(|p| p.variants.len()).sum()
    }

    /// Iterates `(product, variant)` pairs in upstream order: products as
    /// returned by the platform, variants in each product's listed order.
    pub fn all_variants(&self) -> impl Iterator<Item = (&CatalogProduct, &CatalogVariant)> {
        self.products
            .iter()
            .flat_map(|p| p.variants.iter().map(move |v| (p, v)))
    }
}

impl CatalogVariant {
    /// Whether the variant is considered in stock.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.inventory_quantity > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: &str, qty: i64) -> CatalogVariant {
        CatalogVariant {
            variant_id: id.to_string(),
            title: "Large".to_string(),
            price: "30.00".to_string(),
            inventory_quantity: qty,
        }
    }

    fn product(id: &str, category: &str, variants: Vec<CatalogVariant>) -> CatalogProduct {
        CatalogProduct {
            product_id: id.to_string(),
            title: format!("Product {id}"),
            category: category.to_string(),
            variants,
        }
    }

    #[test]
    fn variant_count_sums_across_products() {
        let snapshot = CatalogSnapshot {
            products: vec![
                product("1", "Shoes", vec![variant("11", 3), variant("12", 0)]),
                product("2", "Hats", vec![variant("21", 1)]),
            ],
        };
        assert_eq!(snapshot.variant_count(), 3);
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn all_variants_preserves_upstream_order() {
        let snapshot = CatalogSnapshot {
            products: vec![
                product("1", "Shoes", vec![variant("11", 3), variant("12", 0)]),
                product("2", "Hats", vec![variant("21", 1)]),
            ],
        };
        let ids: Vec<&str> = snapshot
            .all_variants()
            .map(|(_, v)| v.variant_id.as_str())
            .collect();
        assert_eq!(ids, vec!["11", "12", "21"]);
    }

    #[test]
    fn in_stock_requires_positive_inventory() {
        assert!(variant("1", 5).in_stock());
        assert!(!variant("2", 0).in_stock());
        assert!(!variant("3", -1).in_stock());
    }
}
