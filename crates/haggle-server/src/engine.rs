//! The bargaining-configuration reconciliation engine.
//!
//! Maps bulk merchant intent (a selector plus a desired mutation) onto
//! concrete per-variant records in the local store, against a fresh snapshot
//! of the externally-owned catalog. The catalog and the store mutate
//! independently with no shared transaction boundary: a snapshot fetched at
//! the start of a reconciliation may no longer be accurate by the time
//! writes land. That window is accepted by design — each invocation
//! re-fetches and reconverges, and upserts keyed on `(user_id, product_id)`
//! make replays idempotent.
//!
//! No operation retries internally. Catalog fetches are bounded by the
//! client's request timeout; store writes are bounded by
//! `store_write_timeout`. On timeout the caller gets a typed failure, never
//! a hang, and decides whether to resubmit the whole operation.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use haggle_core::{
    plan, validate_min_price, BargainBehavior, BulkMutation, CatalogSnapshot, ExistingConfig,
    ResolveError, Selector, VariantTarget, WriteOp,
};
use haggle_db::{BargainingConfigRow, ConfigUpsert, DbError, MinPriceUpdate};
use haggle_shopify::{
    snapshot_from_products, ShopCredential, ShopifyAdminClient, ShopifyError, ShopifyProduct,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("category not found: {0}")]
    CategoryNotFound(String),

    #[error("product variant not found: {0}")]
    VariantNotFound(String),

    #[error("no products found in the store")]
    EmptyCatalog,

    #[error("commerce access is not provisioned for this merchant")]
    CredentialMissing,

    #[error("external catalog unavailable: {0}")]
    Upstream(#[source] ShopifyError),

    #[error("store write failed: {0}")]
    BulkWrite(String),

    #[error("store error: {0}")]
    Store(#[from] DbError),
}

impl EngineError {
    /// Stable error kind surfaced to API clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidArgument(_) => "invalid_argument",
            EngineError::NotFound(_)
            | EngineError::CategoryNotFound(_)
            | EngineError::VariantNotFound(_)
            | EngineError::EmptyCatalog => "not_found",
            EngineError::CredentialMissing => "credential_missing",
            EngineError::Upstream(_) => "upstream_unavailable",
            EngineError::BulkWrite(_) => "bulk_write_failed",
            EngineError::Store(_) => "internal_error",
        }
    }
}

impl From<ResolveError> for EngineError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::CategoryNotFound(name) => EngineError::CategoryNotFound(name),
            ResolveError::VariantNotFound(id) => EngineError::VariantNotFound(id),
            ResolveError::EmptyCatalog => EngineError::EmptyCatalog,
        }
    }
}

/// Aggregate result of a reconciliation run.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MutationOutcome {
    /// Rows the store reported written or modified.
    pub affected: u64,
    /// Targets the planner decided to provision.
    pub created: u64,
    /// Targets the planner decided to update in place.
    pub updated: u64,
}

/// Reads the merchant's credential; absence is a merchant-actionable
/// failure, not an internal error.
async fn load_credential(pool: &PgPool, merchant: &str) -> Result<ShopCredential, EngineError> {
    let row = haggle_db::get_credential(pool, merchant)
        .await?
        .ok_or(EngineError::CredentialMissing)?;
    Ok(ShopCredential {
        shop_domain: row.shop_domain,
        access_token: row.access_token,
        api_version: row.api_version,
    })
}

/// Fetches a fresh catalog snapshot for the merchant. Never cached.
pub async fn fetch_snapshot(
    pool: &PgPool,
    client: &ShopifyAdminClient,
    merchant: &str,
) -> Result<CatalogSnapshot, EngineError> {
    let credential = load_credential(pool, merchant).await?;
    let products = client
        .fetch_products(&credential)
        .await
        .map_err(EngineError::Upstream)?;
    Ok(snapshot_from_products(products))
}

/// Bounds a store write; an elapsed timeout or a store failure both surface
/// as a bulk-write failure rather than hanging the request task.
async fn write_bounded<T, F>(timeout: Duration, fut: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, DbError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(EngineError::BulkWrite(e.to_string())),
        Err(_) => Err(EngineError::BulkWrite("store write timed out".to_string())),
    }
}

fn existing_by_product_id(rows: Vec<BargainingConfigRow>) -> HashMap<String, ExistingConfig> {
    rows.into_iter()
        .map(|row| {
            (
                row.product_id.clone(),
                ExistingConfig {
                    min_price: row.min_price,
                    behavior: row.behavior.as_deref().and_then(BargainBehavior::parse),
                    is_active: row.is_active,
                },
            )
        })
        .collect()
}

/// Reconciles a set-bargaining mutation across the variants a selector
/// resolves to.
///
/// Fetches a fresh snapshot, resolves the selector against it, plans one
/// write per target (provisioning records that don't exist, updating the
/// ones that do), and applies the whole plan as a single batched upsert.
/// Replaying the same call converges on the same store state.
pub async fn set_bargaining(
    pool: &PgPool,
    client: &ShopifyAdminClient,
    store_write_timeout: Duration,
    merchant: &str,
    selector: &Selector,
    behavior: Option<BargainBehavior>,
    min_price: Decimal,
) -> Result<MutationOutcome, EngineError> {
    validate_min_price(min_price).map_err(|e| EngineError::InvalidArgument(e.to_string()))?;

    let snapshot = fetch_snapshot(pool, client, merchant).await?;
    let targets = selector.resolve(&snapshot)?;

    let outcome = apply_mutation(
        pool,
        store_write_timeout,
        merchant,
        &targets,
        &BulkMutation::SetBargaining {
            behavior,
            min_price,
        },
    )
    .await?;

    tracing::info!(
        merchant,
        affected = outcome.affected,
        created = outcome.created,
        updated = outcome.updated,
        "reconciled bargaining configuration"
    );
    Ok(outcome)
}

/// Plans and executes one bulk mutation over already-resolved targets.
async fn apply_mutation(
    pool: &PgPool,
    store_write_timeout: Duration,
    merchant: &str,
    targets: &[VariantTarget],
    mutation: &BulkMutation,
) -> Result<MutationOutcome, EngineError> {
    let target_ids: Vec<String> = targets.iter().map(|t| t.variant_id.clone()).collect();
    let existing_rows = haggle_db::get_configs_for_products(pool, merchant, &target_ids).await?;
    let existing = existing_by_product_id(existing_rows);

    let ops = plan(targets, &existing, mutation);

    let mut upserts: Vec<ConfigUpsert> = Vec::new();
    let mut deactivation_ids: Vec<String> = Vec::new();
    let mut deactivation_reason: Option<String> = None;
    let mut created: u64 = 0;
    let mut updated: u64 = 0;

    for op in ops {
        match op {
            WriteOp::Insert(insert) => {
                created += 1;
                upserts.push(ConfigUpsert {
                    product_id: insert.product_id,
                    min_price: insert.min_price,
                    behavior: insert.behavior.map(|b| b.as_str().to_owned()),
                    is_available: insert.is_available,
                });
            }
            WriteOp::UpdateInPlace(update) => {
                updated += 1;
                if update.deactivate {
                    deactivation_reason = update.deactivation_reason.clone();
                    deactivation_ids.push(update.product_id);
                } else {
                    // is_available is only written on the insert arm; the
                    // value here never reaches an existing row.
                    upserts.push(ConfigUpsert {
                        product_id: update.product_id,
                        min_price: update.min_price,
                        behavior: update.behavior.map(|b| b.as_str().to_owned()),
                        is_available: true,
                    });
                }
            }
            WriteOp::NoOp => {}
        }
    }

    let mut affected: u64 = 0;
    if !upserts.is_empty() {
        affected += write_bounded(
            store_write_timeout,
            haggle_db::bulk_upsert_configs(pool, merchant, &upserts),
        )
        .await?;
    }
    if !deactivation_ids.is_empty() {
        let reason = deactivation_reason.unwrap_or_default();
        affected += write_bounded(
            store_write_timeout,
            haggle_db::deactivate_configs_by_products(pool, merchant, &deactivation_ids, &reason),
        )
        .await?;
    }

    Ok(MutationOutcome {
        affected,
        created,
        updated,
    })
}

/// Updates one configured product's minimum price in place.
///
/// Deliberately asymmetric with the bulk paths: this targets an existing
/// configured product and fails with a not-found error when none exists,
/// while category/all flows provision new records on demand.
pub async fn set_min_price(
    pool: &PgPool,
    store_write_timeout: Duration,
    merchant: &str,
    product_id: &str,
    min_price: Decimal,
) -> Result<BargainingConfigRow, EngineError> {
    validate_min_price(min_price).map_err(|e| EngineError::InvalidArgument(e.to_string()))?;

    write_bounded(
        store_write_timeout,
        haggle_db::set_min_price(pool, merchant, product_id, min_price),
    )
    .await?
    .ok_or_else(|| {
        EngineError::NotFound(format!(
            "no bargaining configuration found for product {product_id}"
        ))
    })
}

/// Logically deletes one product's configuration.
///
/// A missing record is a success no-op: nothing is fabricated purely to be
/// deactivated, and `Ok(None)` is returned instead of a not-found error.
pub async fn deactivate_product(
    pool: &PgPool,
    store_write_timeout: Duration,
    merchant: &str,
    product_id: &str,
    reason: Option<&str>,
) -> Result<Option<BargainingConfigRow>, EngineError> {
    write_bounded(
        store_write_timeout,
        haggle_db::deactivate_config(pool, merchant, product_id, reason),
    )
    .await
}

/// Deactivates every configuration the merchant holds for one collection.
///
/// Catalog-resolved through the collections endpoints: the collection must
/// exist by exact title and must contain at least one variant, otherwise the
/// category is reported not found. Variants with no local record are
/// planned as no-ops — matching the category without having configs yet is
/// not an error, just zero modifications.
pub async fn deactivate_by_category(
    pool: &PgPool,
    client: &ShopifyAdminClient,
    store_write_timeout: Duration,
    merchant: &str,
    category: &str,
    reason: &str,
) -> Result<MutationOutcome, EngineError> {
    let credential = load_credential(pool, merchant).await?;

    let collections = client
        .fetch_custom_collections(&credential)
        .await
        .map_err(EngineError::Upstream)?;
    let collection = collections
        .into_iter()
        .find(|c| c.title == category)
        .ok_or_else(|| EngineError::CategoryNotFound(category.to_owned()))?;

    let products = client
        .fetch_collection_products(&credential, collection.id)
        .await
        .map_err(EngineError::Upstream)?;
    let targets = collection_targets(&products);
    if targets.is_empty() {
        return Err(EngineError::CategoryNotFound(category.to_owned()));
    }

    let outcome = apply_mutation(
        pool,
        store_write_timeout,
        merchant,
        &targets,
        &BulkMutation::Deactivate {
            reason: Some(reason.to_owned()),
        },
    )
    .await?;

    tracing::info!(
        merchant,
        category,
        affected = outcome.affected,
        "deactivated bargaining for category"
    );
    Ok(outcome)
}

/// GLOBAL deactivation of every configuration record in the store,
/// regardless of owning merchant — the operator-level kill switch. Unlike
/// every other operation here it is deliberately not merchant-scoped and it
/// bypasses catalog resolution entirely.
pub async fn deactivate_all(
    pool: &PgPool,
    store_write_timeout: Duration,
    reason: &str,
) -> Result<u64, EngineError> {
    let affected = write_bounded(
        store_write_timeout,
        haggle_db::deactivate_all_configs(pool, reason),
    )
    .await?;

    tracing::warn!(affected, "deactivated ALL bargaining configurations (global)");
    Ok(affected)
}

/// Applies a caller-supplied batch of minimum-price updates as one upsert,
/// re-activating each touched record.
pub async fn bulk_min_price(
    pool: &PgPool,
    store_write_timeout: Duration,
    merchant: &str,
    updates: &[MinPriceUpdate],
) -> Result<u64, EngineError> {
    for update in updates {
        if update.product_id.is_empty() {
            return Err(EngineError::InvalidArgument(
                "every update needs a product id".to_string(),
            ));
        }
        validate_min_price(update.min_price)
            .map_err(|e| EngineError::InvalidArgument(e.to_string()))?;
    }

    write_bounded(
        store_write_timeout,
        haggle_db::bulk_set_min_price(pool, merchant, updates),
    )
    .await
}

fn collection_targets(products: &[ShopifyProduct]) -> Vec<VariantTarget> {
    products
        .iter()
        .flat_map(|p| {
            p.variants.iter().map(|v| VariantTarget {
                variant_id: v.id.to_string(),
                product_title: p.title.clone(),
                variant_title: v.title.clone(),
                price: v.price.clone(),
                inventory_quantity: v.inventory_quantity,
            })
        })
        .collect()
}
