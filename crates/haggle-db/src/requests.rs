//! Store operations for `bargain_requests`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `bargain_requests` table.
///
/// Immutable after insert except for the one-way `mark_as_read` flip.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BargainRequestRow {
    pub id: i64,
    /// Display name shown to the operator; already normalized (variant title
    /// or product-title fallback) by the intake layer.
    pub product_name: String,
    pub product_id: String,
    pub product_price: Decimal,
    pub customer_email: String,
    pub shop_name: String,
    pub mark_as_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Inserts a shopper bargain request and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_request(
    pool: &PgPool,
    product_name: &str,
    product_id: &str,
    product_price: Decimal,
    customer_email: &str,
    shop_name: &str,
) -> Result<BargainRequestRow, DbError> {
    let row = sqlx::query_as::<_, BargainRequestRow>(
        "INSERT INTO bargain_requests \
             (product_name, product_id, product_price, customer_email, shop_name) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, product_name, product_id, product_price, customer_email, \
                   shop_name, mark_as_read, created_at",
    )
    .bind(product_name)
    .bind(product_id)
    .bind(product_price)
    .bind(customer_email)
    .bind(shop_name)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// All unread requests for a shop, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unread_requests(
    pool: &PgPool,
    shop_name: &str,
) -> Result<Vec<BargainRequestRow>, DbError> {
    let rows = sqlx::query_as::<_, BargainRequestRow>(
        "SELECT id, product_name, product_id, product_price, customer_email, \
                shop_name, mark_as_read, created_at \
         FROM bargain_requests \
         WHERE shop_name = $1 AND mark_as_read = FALSE \
         ORDER BY created_at DESC, id DESC",
    )
    .bind(shop_name)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Flips exactly one request's `mark_as_read` flag to true.
///
/// Returns `None` when the id does not exist; callers surface that as a
/// not-found error rather than a silent success.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_request_read(
    pool: &PgPool,
    id: i64,
) -> Result<Option<BargainRequestRow>, DbError> {
    let row = sqlx::query_as::<_, BargainRequestRow>(
        "UPDATE bargain_requests SET mark_as_read = TRUE \
         WHERE id = $1 \
         RETURNING id, product_name, product_id, product_price, customer_email, \
                   shop_name, mark_as_read, created_at",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
