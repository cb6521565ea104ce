//! Write planning for bargaining configuration.
//!
//! The local store and the external catalog mutate independently with no
//! shared transaction boundary, so bulk intent ("apply to category X",
//! "apply to everything") is reconciled here into concrete per-variant write
//! operations keyed on `(user_id, product_id)`. The decision logic is a pure
//! function over plain values: resolved targets in, tagged write operations
//! out. Replaying the same mutation over the same targets produces the same
//! operations, which the store applies idempotently via upsert.

use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::behavior::BargainBehavior;
use crate::selector::VariantTarget;

/// A bulk mutation to reconcile across a resolved variant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkMutation {
    /// Set the minimum price, and optionally the behavior tag, for each
    /// target. Provisions a new record when none exists.
    SetBargaining {
        behavior: Option<BargainBehavior>,
        min_price: Decimal,
    },
    /// Logically delete each target's record. Never provisions: a missing
    /// record is left missing.
    Deactivate { reason: Option<String> },
}

/// Store-agnostic view of an existing configuration record, as much of it
/// as the decision function needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingConfig {
    pub min_price: Decimal,
    pub behavior: Option<BargainBehavior>,
    pub is_active: bool,
}

/// Field values for a record that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigInsert {
    pub product_id: String,
    pub min_price: Decimal,
    pub behavior: Option<BargainBehavior>,
    pub is_active: bool,
    pub is_available: bool,
}

/// Field values for an in-place update of an existing record.
///
/// `behavior = None` means "leave the stored tag untouched", not "clear it".
/// When `deactivate` is set the update always carries `min_price = 0` —
/// deactivation and price-zeroing travel together, never separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub product_id: String,
    pub min_price: Decimal,
    pub behavior: Option<BargainBehavior>,
    pub deactivate: bool,
    pub deactivation_reason: Option<String>,
}

/// The reconciler's decision for one target variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Insert(ConfigInsert),
    UpdateInPlace(ConfigUpdate),
    NoOp,
}

impl WriteOp {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self, WriteOp::NoOp)
    }
}

#[derive(Debug, Error)]
#[error("minimum price must be a non-negative number")]
pub struct InvalidMinPrice;

/// Rejects negative minimum prices before any store or catalog access.
///
/// # Errors
///
/// Returns [`InvalidMinPrice`] when `min_price` is below zero.
pub fn validate_min_price(min_price: Decimal) -> Result<(), InvalidMinPrice> {
    if min_price < Decimal::ZERO {
        return Err(InvalidMinPrice);
    }
    Ok(())
}

/// Decides the write operation for a single target variant.
///
/// - `SetBargaining` updates `min_price`/`behavior` in place when a record
///   exists, leaving every other field untouched; otherwise it provisions a
///   new active record whose availability reflects current inventory.
/// - `Deactivate` flips `is_active` off and zeroes `min_price` on an
///   existing record; a missing record yields [`WriteOp::NoOp`] — a record
///   is never fabricated purely to deactivate it.
#[must_use]
pub fn decide(
    existing: Option<&ExistingConfig>,
    mutation: &BulkMutation,
    target: &VariantTarget,
) -> WriteOp {
    match (mutation, existing) {
        (
            BulkMutation::SetBargaining {
                behavior,
                min_price,
            },
            Some(_),
        ) => WriteOp::UpdateInPlace(ConfigUpdate {
            product_id: target.variant_id.clone(),
            min_price: *min_price,
            behavior: *behavior,
            deactivate: false,
            deactivation_reason: None,
        }),
        (
            BulkMutation::SetBargaining {
                behavior,
                min_price,
            },
            None,
        ) => WriteOp::Insert(ConfigInsert {
            product_id: target.variant_id.clone(),
            min_price: *min_price,
            behavior: *behavior,
            is_active: true,
            is_available: target.inventory_quantity > 0,
        }),
        (BulkMutation::Deactivate { reason }, Some(_)) => WriteOp::UpdateInPlace(ConfigUpdate {
            product_id: target.variant_id.clone(),
            min_price: Decimal::ZERO,
            behavior: None,
            deactivate: true,
            deactivation_reason: reason.clone(),
        }),
        (BulkMutation::Deactivate { .. }, None) => WriteOp::NoOp,
    }
}

/// Maps [`decide`] over a resolved target set, in target order.
///
/// `existing` is keyed by external variant id (`product_id` in store terms)
/// for the one merchant whose records are being reconciled.
#[must_use]
pub fn plan(
    targets: &[VariantTarget],
    existing: &HashMap<String, ExistingConfig>,
    mutation: &BulkMutation,
) -> Vec<WriteOp> {
    targets
        .iter()
        .map(|t| decide(existing.get(&t.variant_id), mutation, t))
        .collect()
}
