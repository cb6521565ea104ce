//! Bargain-request intake: shopper submission, unread listing, mark-read.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use haggle_db::BargainRequestRow;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Variant titles starting with this prefix are Shopify's generic default
/// for single-variant products and carry no display value.
const DEFAULT_VARIANT_TITLE: &str = "Default Title";

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(in crate::api) struct SubmitBargainRequest {
    pub product_title: String,
    pub variant_title: String,
    pub variant_price: Decimal,
    pub customer_email: String,
    pub shop_name: String,
    pub variant_id: String,
}

#[derive(Debug, Deserialize)]
pub(in crate::api) struct UnreadQuery {
    pub shop_name: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct RequestItem {
    pub id: i64,
    pub product_name: String,
    pub product_id: String,
    pub product_price: Decimal,
    pub customer_email: String,
    pub shop_name: String,
    pub mark_as_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<BargainRequestRow> for RequestItem {
    fn from(row: BargainRequestRow) -> Self {
        Self {
            id: row.id,
            product_name: row.product_name,
            product_id: row.product_id,
            product_price: row.product_price,
            customer_email: row.customer_email,
            shop_name: row.shop_name,
            mark_as_read: row.mark_as_read,
            created_at: row.created_at,
        }
    }
}

/// Picks the display name for a request: the variant title, unless it is the
/// generic default ("Default Title", "Default Title / S", ...), in which
/// case the product title wins.
fn display_product_name<'a>(product_title: &'a str, variant_title: &'a str) -> &'a str {
    if variant_title.starts_with(DEFAULT_VARIANT_TITLE) {
        product_title
    } else {
        variant_title
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/bargain-requests — shopper submission from the storefront
/// widget. Public: no merchant identity is attached.
pub(in crate::api) async fn submit_request(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SubmitBargainRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RequestItem>>), ApiError> {
    let rid = &req_id.0;
    for (field, value) in [
        ("product_title", &body.product_title),
        ("variant_title", &body.variant_title),
        ("customer_email", &body.customer_email),
        ("shop_name", &body.shop_name),
        ("variant_id", &body.variant_id),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::new(
                rid,
                "invalid_argument",
                format!("please provide {field}"),
            ));
        }
    }

    let product_name = display_product_name(&body.product_title, &body.variant_title);

    let row = haggle_db::insert_request(
        &state.pool,
        product_name,
        &body.variant_id,
        body.variant_price,
        &body.customer_email,
        &body.shop_name,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: RequestItem::from(row),
            message: "bargain request submitted successfully".to_string(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/bargain-requests?shop_name= — unread requests for a shop,
/// newest first.
pub(in crate::api) async fn list_unread_requests(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<UnreadQuery>,
) -> Result<Json<ApiResponse<Vec<RequestItem>>>, ApiError> {
    let rid = &req_id.0;
    if query.shop_name.trim().is_empty() {
        return Err(ApiError::new(
            rid,
            "invalid_argument",
            "please provide shop_name",
        ));
    }

    let rows = haggle_db::list_unread_requests(&state.pool, &query.shop_name)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(RequestItem::from).collect(),
        message: "unread bargain requests".to_string(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/bargain-requests/{id}/read — one-way flip of the unread
/// flag; unknown ids are a not-found error.
pub(in crate::api) async fn mark_request_read(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RequestItem>>, ApiError> {
    let rid = &req_id.0;
    let row = haggle_db::mark_request_read(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", "bargain request not found"))?;

    Ok(Json(ApiResponse {
        data: RequestItem::from(row),
        message: "bargain request marked as read".to_string(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
