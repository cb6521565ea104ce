//! Store operations for `bargaining_configs`.
//!
//! All writes match on the `(user_id, product_id)` natural key. Deactivation
//! is logical only: `is_active = FALSE` together with `min_price = 0`, never
//! a row deletion, so configuration history survives.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

const CONFIG_COLUMNS: &str = "id, user_id, product_id, min_price, behavior, is_active, \
     is_available, deactivation_reason, deactivated_at, created_at, updated_at";

/// A row from the `bargaining_configs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BargainingConfigRow {
    pub id: i64,
    pub user_id: String,
    /// External variant identifier; text to avoid i64/JSON precision loss.
    pub product_id: String,
    pub min_price: Decimal,
    /// Closed-set behavior tag; `NULL` when never configured.
    pub behavior: Option<String>,
    pub is_active: bool,
    pub is_available: bool,
    pub deactivation_reason: Option<String>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One element of a reconciler batch: desired field values for a single
/// variant, applied insert-or-update on the natural key.
#[derive(Debug, Clone)]
pub struct ConfigUpsert {
    pub product_id: String,
    pub min_price: Decimal,
    pub behavior: Option<String>,
    pub is_available: bool,
}

/// One element of a direct bulk min-price update.
#[derive(Debug, Clone)]
pub struct MinPriceUpdate {
    pub product_id: String,
    pub min_price: Decimal,
}

/// Point lookup by the `(user_id, product_id)` natural key.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_config(
    pool: &PgPool,
    user_id: &str,
    product_id: &str,
) -> Result<Option<BargainingConfigRow>, DbError> {
    let row = sqlx::query_as::<_, BargainingConfigRow>(&format!(
        "SELECT {CONFIG_COLUMNS} FROM bargaining_configs \
         WHERE user_id = $1 AND product_id = $2"
    ))
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Shopper-side lookup by external variant id alone.
///
/// The shopper does not know the owning merchant, so this is a weak,
/// unscoped reference; with multiple merchants configuring the same external
/// id the first row wins.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_config_by_product(
    pool: &PgPool,
    product_id: &str,
) -> Result<Option<BargainingConfigRow>, DbError> {
    let row = sqlx::query_as::<_, BargainingConfigRow>(&format!(
        "SELECT {CONFIG_COLUMNS} FROM bargaining_configs \
         WHERE product_id = $1 ORDER BY id LIMIT 1"
    ))
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Batch read of one merchant's records for the given variant ids.
///
/// Feeds the reconciliation planner; ids with no record are simply absent
/// from the result.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_configs_for_products(
    pool: &PgPool,
    user_id: &str,
    product_ids: &[String],
) -> Result<Vec<BargainingConfigRow>, DbError> {
    let rows = sqlx::query_as::<_, BargainingConfigRow>(&format!(
        "SELECT {CONFIG_COLUMNS} FROM bargaining_configs \
         WHERE user_id = $1 AND product_id = ANY($2)"
    ))
    .bind(user_id)
    .bind(product_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Every configuration record owned by one merchant, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_configs(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<BargainingConfigRow>, DbError> {
    let rows = sqlx::query_as::<_, BargainingConfigRow>(&format!(
        "SELECT {CONFIG_COLUMNS} FROM bargaining_configs \
         WHERE user_id = $1 ORDER BY id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Applies a reconciler batch as ONE statement: insert each missing record,
/// update `min_price`/`behavior` in place on each existing one.
///
/// On the update arm `is_active` and `is_available` are left untouched and a
/// `NULL` behavior keeps the stored tag (`COALESCE`), so repeated replays of
/// the same batch converge on the same final state instead of duplicating
/// rows. Returns the number of rows written (inserted + updated).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the batch fails. The statement is atomic:
/// either every element applies or none does.
pub async fn bulk_upsert_configs(
    pool: &PgPool,
    user_id: &str,
    entries: &[ConfigUpsert],
) -> Result<u64, DbError> {
    if entries.is_empty() {
        return Ok(0);
    }

    let mut product_ids: Vec<String> = Vec::with_capacity(entries.len());
    let mut min_prices: Vec<Decimal> = Vec::with_capacity(entries.len());
    let mut behaviors: Vec<Option<String>> = Vec::with_capacity(entries.len());
    let mut availabilities: Vec<bool> = Vec::with_capacity(entries.len());
    for entry in entries {
        product_ids.push(entry.product_id.clone());
        min_prices.push(entry.min_price);
        behaviors.push(entry.behavior.clone());
        availabilities.push(entry.is_available);
    }

    let affected = sqlx::query(
        "INSERT INTO bargaining_configs \
             (user_id, product_id, min_price, behavior, is_active, is_available) \
         SELECT $1, t.product_id, t.min_price, t.behavior, TRUE, t.is_available \
         FROM UNNEST($2::text[], $3::numeric(10,2)[], $4::text[], $5::boolean[]) \
              AS t(product_id, min_price, behavior, is_available) \
         ON CONFLICT (user_id, product_id) DO UPDATE SET \
             min_price  = EXCLUDED.min_price, \
             behavior   = COALESCE(EXCLUDED.behavior, bargaining_configs.behavior), \
             updated_at = NOW()",
    )
    .bind(user_id)
    .bind(&product_ids)
    .bind(&min_prices)
    .bind(&behaviors)
    .bind(&availabilities)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(affected)
}

/// Direct bulk min-price surface: upsert each entry with the new floor and
/// `is_active = TRUE` (re-activating deactivated records, matching the
/// single-record path).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the batch fails.
pub async fn bulk_set_min_price(
    pool: &PgPool,
    user_id: &str,
    updates: &[MinPriceUpdate],
) -> Result<u64, DbError> {
    if updates.is_empty() {
        return Ok(0);
    }

    let mut product_ids: Vec<String> = Vec::with_capacity(updates.len());
    let mut min_prices: Vec<Decimal> = Vec::with_capacity(updates.len());
    for update in updates {
        product_ids.push(update.product_id.clone());
        min_prices.push(update.min_price);
    }

    let affected = sqlx::query(
        "INSERT INTO bargaining_configs (user_id, product_id, min_price, is_active) \
         SELECT $1, t.product_id, t.min_price, TRUE \
         FROM UNNEST($2::text[], $3::numeric(10,2)[]) AS t(product_id, min_price) \
         ON CONFLICT (user_id, product_id) DO UPDATE SET \
             min_price  = EXCLUDED.min_price, \
             is_active  = TRUE, \
             updated_at = NOW()",
    )
    .bind(user_id)
    .bind(&product_ids)
    .bind(&min_prices)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(affected)
}

/// Update-in-place of one record's minimum price, setting `is_active = TRUE`
/// alongside. Returns `None` when no record exists for the key — this path
/// deliberately does NOT provision new records.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_min_price(
    pool: &PgPool,
    user_id: &str,
    product_id: &str,
    min_price: Decimal,
) -> Result<Option<BargainingConfigRow>, DbError> {
    let row = sqlx::query_as::<_, BargainingConfigRow>(&format!(
        "UPDATE bargaining_configs SET \
             min_price  = $3, \
             is_active  = TRUE, \
             updated_at = NOW() \
         WHERE user_id = $1 AND product_id = $2 \
         RETURNING {CONFIG_COLUMNS}"
    ))
    .bind(user_id)
    .bind(product_id)
    .bind(min_price)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Logically deletes one record: `is_active = FALSE`, `min_price = 0`,
/// reason and timestamp recorded. Returns `None` when no record exists
/// (callers treat that as a no-op, not an error).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_config(
    pool: &PgPool,
    user_id: &str,
    product_id: &str,
    reason: Option<&str>,
) -> Result<Option<BargainingConfigRow>, DbError> {
    let row = sqlx::query_as::<_, BargainingConfigRow>(&format!(
        "UPDATE bargaining_configs SET \
             is_active           = FALSE, \
             min_price           = 0, \
             deactivation_reason = $3, \
             deactivated_at      = NOW(), \
             updated_at          = NOW() \
         WHERE user_id = $1 AND product_id = $2 \
         RETURNING {CONFIG_COLUMNS}"
    ))
    .bind(user_id)
    .bind(product_id)
    .bind(reason)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Merchant-scoped update-many: logically deletes every record of `user_id`
/// whose variant id is in `product_ids`. Returns the modified count; zero is
/// a legitimate outcome when the category has no local configs yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_configs_by_products(
    pool: &PgPool,
    user_id: &str,
    product_ids: &[String],
    reason: &str,
) -> Result<u64, DbError> {
    let affected = sqlx::query(
        "UPDATE bargaining_configs SET \
             is_active           = FALSE, \
             min_price           = 0, \
             deactivation_reason = $3, \
             deactivated_at      = NOW(), \
             updated_at          = NOW() \
         WHERE user_id = $1 AND product_id = ANY($2)",
    )
    .bind(user_id)
    .bind(product_ids)
    .bind(reason)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(affected)
}

/// GLOBAL deactivation of every bargaining configuration in the store,
/// regardless of owning merchant. This is the operator-level kill switch:
/// there is intentionally no `user_id` filter. Returns the modified count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_all_configs(pool: &PgPool, reason: &str) -> Result<u64, DbError> {
    let affected = sqlx::query(
        "UPDATE bargaining_configs SET \
             is_active           = FALSE, \
             min_price           = 0, \
             deactivation_reason = $1, \
             deactivated_at      = NOW(), \
             updated_at          = NOW()",
    )
    .bind(reason)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(affected)
}
