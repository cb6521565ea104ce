//! Store operations for `shopify_credentials`.
//!
//! The reconciliation engine only ever reads credentials; writes happen at
//! provisioning time (the OAuth handshake lives outside this system).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `shopify_credentials` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialRow {
    pub id: i64,
    pub user_id: String,
    /// Bare shop name (`"my-store"`), full domain, or full origin URL.
    pub shop_domain: String,
    pub access_token: String,
    pub api_version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The merchant's commerce credential, if one has been provisioned.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_credential(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<CredentialRow>, DbError> {
    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT id, user_id, shop_domain, access_token, api_version, created_at, updated_at \
         FROM shopify_credentials WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates or replaces a merchant's credential, matched on `user_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_credential(
    pool: &PgPool,
    user_id: &str,
    shop_domain: &str,
    access_token: &str,
    api_version: &str,
) -> Result<CredentialRow, DbError> {
    let row = sqlx::query_as::<_, CredentialRow>(
        "INSERT INTO shopify_credentials (user_id, shop_domain, access_token, api_version) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (user_id) DO UPDATE SET \
             shop_domain  = EXCLUDED.shop_domain, \
             access_token = EXCLUDED.access_token, \
             api_version  = EXCLUDED.api_version, \
             updated_at   = NOW() \
         RETURNING id, user_id, shop_domain, access_token, api_version, created_at, updated_at",
    )
    .bind(user_id)
    .bind(shop_domain)
    .bind(access_token)
    .bind(api_version)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
