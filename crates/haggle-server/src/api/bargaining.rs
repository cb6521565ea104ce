//! Bargaining-configuration handlers: the HTTP surface over the
//! reconciliation engine.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use haggle_core::{BargainBehavior, Selector};
use haggle_db::{BargainingConfigRow, MinPriceUpdate};

use crate::engine;
use crate::middleware::{MerchantId, RequestId};

use super::{map_db_error, map_engine_error, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(in crate::api) struct SetByCategoryRequest {
    pub category: String,
    pub behavior: BargainBehavior,
    pub min_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct SetAllProductsRequest {
    pub behavior: BargainBehavior,
    pub min_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct SetByProductRequest {
    pub product_id: String,
    pub min_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct SetMinPriceRequest {
    pub product_id: String,
    pub min_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct BulkMinPriceRequest {
    pub updates: Vec<BulkMinPriceEntry>,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct BulkMinPriceEntry {
    pub product_id: String,
    pub min_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct DeactivateAllRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct DeactivateCategoryRequest {
    pub category: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct DeactivateProductQuery {
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Client view of one configuration record.
#[derive(Debug, Serialize)]
pub(in crate::api) struct ConfigItem {
    pub product_id: String,
    pub min_price: Decimal,
    pub behavior: Option<String>,
    pub is_active: bool,
    pub is_available: bool,
}

impl From<BargainingConfigRow> for ConfigItem {
    fn from(row: BargainingConfigRow) -> Self {
        Self {
            product_id: row.product_id,
            min_price: row.min_price,
            behavior: row.behavior,
            is_active: row.is_active,
            is_available: row.is_available,
        }
    }
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct SingleDeactivation {
    pub affected: u64,
    pub config: Option<ConfigItem>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct ModifiedCount {
    pub modified_count: u64,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct BulkAffected {
    pub affected: u64,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn require_non_empty(req_id: &str, field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::new(
            req_id,
            "invalid_argument",
            format!("please provide {field}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers — set paths
// ---------------------------------------------------------------------------

/// POST /api/v1/bargaining/set-by-category — reconcile behavior + min price
/// across every variant whose product category matches.
pub(in crate::api) async fn set_by_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(merchant): Extension<MerchantId>,
    Json(body): Json<SetByCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<engine::MutationOutcome>>), ApiError> {
    let rid = &req_id.0;
    require_non_empty(rid, "category", &body.category)?;

    let outcome = engine::set_bargaining(
        &state.pool,
        &state.shopify,
        state.store_write_timeout,
        &merchant.0,
        &Selector::Category(body.category),
        Some(body.behavior),
        body.min_price,
    )
    .await
    .map_err(|e| map_engine_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: outcome,
            message: "bargaining details updated for category".to_string(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/v1/bargaining/set-all-products — reconcile behavior + min price
/// across the merchant's entire catalog.
pub(in crate::api) async fn set_all_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(merchant): Extension<MerchantId>,
    Json(body): Json<SetAllProductsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<engine::MutationOutcome>>), ApiError> {
    let outcome = engine::set_bargaining(
        &state.pool,
        &state.shopify,
        state.store_write_timeout,
        &merchant.0,
        &Selector::All,
        Some(body.behavior),
        body.min_price,
    )
    .await
    .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: outcome,
            message: "bargaining details set for all products".to_string(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/v1/bargaining/set-by-product — set the min price for one
/// variant, verified against the live catalog. Provisions the record when
/// none exists (unlike set-min-price) and never carries a behavior tag.
pub(in crate::api) async fn set_by_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(merchant): Extension<MerchantId>,
    Json(body): Json<SetByProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<engine::MutationOutcome>>), ApiError> {
    let rid = &req_id.0;
    require_non_empty(rid, "product_id", &body.product_id)?;

    let outcome = engine::set_bargaining(
        &state.pool,
        &state.shopify,
        state.store_write_timeout,
        &merchant.0,
        &Selector::Single(body.product_id),
        None,
        body.min_price,
    )
    .await
    .map_err(|e| map_engine_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: outcome,
            message: "bargaining details successfully set".to_string(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/v1/bargaining/set-min-price — update an already-configured
/// product's floor. No catalog fetch, no provisioning: an unconfigured
/// product is a not-found error.
pub(in crate::api) async fn set_min_price(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(merchant): Extension<MerchantId>,
    Json(body): Json<SetMinPriceRequest>,
) -> Result<Json<ApiResponse<ConfigItem>>, ApiError> {
    let rid = &req_id.0;
    require_non_empty(rid, "product_id", &body.product_id)?;

    let row = engine::set_min_price(
        &state.pool,
        state.store_write_timeout,
        &merchant.0,
        &body.product_id,
        body.min_price,
    )
    .await
    .map_err(|e| map_engine_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ConfigItem::from(row),
        message: "minimum price updated successfully".to_string(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/bargaining/bulk-min-price — apply a caller-supplied batch of
/// min-price updates as one upsert.
pub(in crate::api) async fn bulk_min_price(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(merchant): Extension<MerchantId>,
    Json(body): Json<BulkMinPriceRequest>,
) -> Result<Json<ApiResponse<BulkAffected>>, ApiError> {
    let updates: Vec<MinPriceUpdate> = body
        .updates
        .into_iter()
        .map(|u| MinPriceUpdate {
            product_id: u.product_id,
            min_price: u.min_price,
        })
        .collect();

    let affected = engine::bulk_min_price(
        &state.pool,
        state.store_write_timeout,
        &merchant.0,
        &updates,
    )
    .await
    .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: BulkAffected { affected },
        message: format!("updated {affected} products successfully"),
        meta: ResponseMeta::new(req_id.0),
    }))
}

// ---------------------------------------------------------------------------
// Handlers — deactivation paths
// ---------------------------------------------------------------------------

/// DELETE /api/v1/bargaining/products/{product_id} — logical delete of one
/// record. Deactivating an unconfigured product is a success no-op.
pub(in crate::api) async fn deactivate_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(merchant): Extension<MerchantId>,
    Path(product_id): Path<String>,
    Query(query): Query<DeactivateProductQuery>,
) -> Result<Json<ApiResponse<SingleDeactivation>>, ApiError> {
    let row = engine::deactivate_product(
        &state.pool,
        state.store_write_timeout,
        &merchant.0,
        &product_id,
        query.reason.as_deref(),
    )
    .await
    .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    let (affected, message) = match &row {
        Some(_) => (1, "bargaining deactivated and minimum price reset"),
        None => (0, "no bargaining configuration existed for this product"),
    };

    Ok(Json(ApiResponse {
        data: SingleDeactivation {
            affected,
            config: row.map(ConfigItem::from),
        },
        message: message.to_string(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/bargaining/deactivate-all — GLOBAL deactivation of every
/// record in the store, across all merchants. Operator kill switch; the
/// caller's merchant identity deliberately does not scope it.
pub(in crate::api) async fn deactivate_all(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<DeactivateAllRequest>,
) -> Result<Json<ApiResponse<ModifiedCount>>, ApiError> {
    let rid = &req_id.0;
    require_non_empty(rid, "reason", &body.reason)?;

    let modified = engine::deactivate_all(&state.pool, state.store_write_timeout, &body.reason)
        .await
        .map_err(|e| map_engine_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ModifiedCount {
            modified_count: modified,
        },
        message: "all products deactivated successfully".to_string(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/bargaining/deactivate-category — merchant-scoped, catalog-
/// resolved deactivation of one collection's variants.
pub(in crate::api) async fn deactivate_by_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(merchant): Extension<MerchantId>,
    Json(body): Json<DeactivateCategoryRequest>,
) -> Result<Json<ApiResponse<ModifiedCount>>, ApiError> {
    let rid = &req_id.0;
    require_non_empty(rid, "category", &body.category)?;
    require_non_empty(rid, "reason", &body.reason)?;

    let outcome = engine::deactivate_by_category(
        &state.pool,
        &state.shopify,
        state.store_write_timeout,
        &merchant.0,
        &body.category,
        &body.reason,
    )
    .await
    .map_err(|e| map_engine_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ModifiedCount {
            modified_count: outcome.affected,
        },
        message: "category products deactivated successfully".to_string(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

// ---------------------------------------------------------------------------
// Handlers — reads
// ---------------------------------------------------------------------------

/// GET /api/v1/bargaining/details — the calling merchant's configuration
/// records.
pub(in crate::api) async fn list_details(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(merchant): Extension<MerchantId>,
) -> Result<Json<ApiResponse<Vec<ConfigItem>>>, ApiError> {
    let rows = haggle_db::list_configs(&state.pool, &merchant.0)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ConfigItem::from).collect(),
        message: "bargaining details".to_string(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/bargaining/products/{product_id} — shopper-side lookup of a
/// variant's bargaining configuration. Unscoped weak reference: the shopper
/// only knows the external variant id.
pub(in crate::api) async fn bargain_info(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(product_id): Path<String>,
) -> Result<Json<ApiResponse<Option<ConfigItem>>>, ApiError> {
    let row = haggle_db::get_config_by_product(&state.pool, &product_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.map(ConfigItem::from),
        message: "product bargaining availability".to_string(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
