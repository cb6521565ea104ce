//! Resolution of logical mutation targets against a catalog snapshot.

use thiserror::Error;

use crate::catalog::CatalogSnapshot;

/// A logical target for a configuration mutation: one variant, a named
/// category, or the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Single(String),
    Category(String),
    All,
}

/// A concrete variant picked out of a snapshot, carrying the display fields
/// the planner needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantTarget {
    pub variant_id: String,
    pub product_title: String,
    pub variant_title: String,
    pub price: String,
    pub inventory_quantity: i64,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("category not found: {0}")]
    CategoryNotFound(String),

    #[error("product variant not found: {0}")]
    VariantNotFound(String),

    #[error("no products found in the store")]
    EmptyCatalog,
}

impl Selector {
    /// Resolves the selector to the concrete variant set relevant right now.
    ///
    /// Ordering follows the snapshot: products in upstream order, variants in
    /// each product's listed order. No re-sorting is performed, so the result
    /// is deterministic exactly to the extent the snapshot is.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::CategoryNotFound`] — `Category(name)` matched zero
    ///   products (case-sensitive comparison).
    /// - [`ResolveError::VariantNotFound`] — `Single(id)` is not in the snapshot.
    /// - [`ResolveError::EmptyCatalog`] — `All` against a merchant with no products.
    pub fn resolve(&self, snapshot: &CatalogSnapshot) -> Result<Vec<VariantTarget>, ResolveError> {
        match self {
            Selector::Single(variant_id) => snapshot
                .all_variants()
                .find(|(_, v)| v.variant_id == *variant_id)
                .map(|(p, v)| vec![target(p, v)])
                .ok_or_else(|| ResolveError::VariantNotFound(variant_id.clone())),
            Selector::Category(name) => {
                let targets: Vec<VariantTarget> = snapshot
                    .products
                    .iter()
                    .filter(|p| p.category == *name)
                    .flat_map(|p| p.variants.iter().map(move |v| target(p, v)))
                    .collect();
                if targets.is_empty() {
                    return Err(ResolveError::CategoryNotFound(name.clone()));
                }
                Ok(targets)
            }
            Selector::All => {
                if snapshot.is_empty() {
                    return Err(ResolveError::EmptyCatalog);
                }
                Ok(snapshot
                    .all_variants()
                    .map(|(p, v)| target(p, v))
                    .collect())
            }
        }
    }
}

fn target(product: &crate::catalog::CatalogProduct, variant: &crate::catalog::CatalogVariant) -> VariantTarget {
    VariantTarget {
        variant_id: variant.variant_id.clone(),
        product_title: product.title.clone(),
        variant_title: variant.title.clone(),
        price: variant.price.clone(),
        inventory_quantity: variant.inventory_quantity,
    }
}
