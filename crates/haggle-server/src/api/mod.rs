mod bargaining;
mod requests;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use haggle_shopify::ShopifyAdminClient;

use crate::engine::EngineError;
use crate::middleware::{
    enforce_rate_limit, request_id, require_merchant_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub shopify: Arc<ShopifyAdminClient>,
    pub store_write_timeout: Duration,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" | "credential_missing" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" | "invalid_argument" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_unavailable" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &haggle_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

pub(super) fn map_engine_error(request_id: String, error: &EngineError) -> ApiError {
    match error {
        EngineError::Store(e) => {
            tracing::error!(error = %e, "store access failed");
            ApiError::new(request_id, "internal_error", "store access failed")
        }
        EngineError::Upstream(e) => {
            tracing::error!(error = %e, "external catalog fetch failed");
            ApiError::new(request_id, error.code(), error.to_string())
        }
        EngineError::BulkWrite(e) => {
            tracing::error!(error = %e, "bulk store write failed");
            ApiError::new(request_id, error.code(), error.to_string())
        }
        _ => ApiError::new(request_id, error.code(), error.to_string()),
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/bargaining/set-by-category",
            post(bargaining::set_by_category),
        )
        .route(
            "/api/v1/bargaining/set-all-products",
            post(bargaining::set_all_products),
        )
        .route(
            "/api/v1/bargaining/set-by-product",
            post(bargaining::set_by_product),
        )
        .route(
            "/api/v1/bargaining/set-min-price",
            post(bargaining::set_min_price),
        )
        .route(
            "/api/v1/bargaining/bulk-min-price",
            post(bargaining::bulk_min_price),
        )
        .route(
            "/api/v1/bargaining/products/{product_id}",
            delete(bargaining::deactivate_product),
        )
        .route("/api/v1/bargaining/details", get(bargaining::list_details))
        .route(
            "/api/v1/bargaining/deactivate-all",
            post(bargaining::deactivate_all),
        )
        .route(
            "/api/v1/bargaining/deactivate-category",
            post(bargaining::deactivate_by_category),
        )
        .route(
            "/api/v1/bargain-requests/unread",
            get(requests::list_unread_requests),
        )
        .route(
            "/api/v1/bargain-requests/{id}/read",
            post(requests::mark_request_read),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_merchant_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    // Shopper-facing routes carry no merchant identity: submission comes from
    // the storefront widget, and the bargain-info lookup is a weak reference
    // by external variant id alone.
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route(
            "/api/v1/bargain-requests",
            post(requests::submit_request),
        )
        .route(
            "/api/v1/bargaining/info/{product_id}",
            get(bargaining::bargain_info),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match haggle_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                message: "service healthy".to_string(),
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    message: "service degraded".to_string(),
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::bargaining::ConfigItem;
    use super::*;
    use crate::middleware::DEV_MERCHANT_ID;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rust_decimal::Decimal;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_state(pool: sqlx::PgPool) -> AppState {
        AppState {
            pool,
            shopify: Arc::new(
                ShopifyAdminClient::new(5, "haggle-test/0.1").expect("test client"),
            ),
            store_write_timeout: Duration::from_secs(5),
        }
    }

    fn test_app(pool: sqlx::PgPool) -> Router {
        let auth = AuthState::from_env(true).expect("auth");
        build_app(test_state(pool), auth, default_rate_limit_state())
    }

    async fn send_json(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                builder
                    .body(Body::from(value.to_string()))
                    .expect("request")
            }
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        // Extractor rejections (e.g. unknown enum tags) produce plain-text
        // bodies; surface those as a JSON string for assertions.
        let json = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
        });
        (status, json)
    }

    /// Seed one bargaining config directly, bypassing the engine.
    async fn seed_config(pool: &sqlx::PgPool, user_id: &str, product_id: &str, min_price: i64) {
        sqlx::query(
            "INSERT INTO bargaining_configs (user_id, product_id, min_price, behavior) \
             VALUES ($1, $2, $3, 'moderate')",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(Decimal::new(min_price, 0))
        .execute(pool)
        .await
        .expect("seed config");
    }

    async fn seed_credential(pool: &sqlx::PgPool, user_id: &str, origin: &str) {
        haggle_db::upsert_credential(pool, user_id, origin, "shpat_test", "2024-04")
            .await
            .expect("seed credential");
    }

    fn two_category_products() -> serde_json::Value {
        json!({
            "products": [
                {
                    "id": 1,
                    "title": "Runner",
                    "product_type": "Shoes",
                    "variants": [
                        { "id": 11, "title": "US 9", "price": "80.00", "inventory_quantity": 4 },
                        { "id": 12, "title": "US 10", "price": "80.00", "inventory_quantity": 0 }
                    ]
                },
                {
                    "id": 2,
                    "title": "Fedora",
                    "product_type": "Hats",
                    "variants": [
                        { "id": 21, "title": "Default Title", "price": "25.00", "inventory_quantity": 2 }
                    ]
                }
            ]
        })
    }

    // -------------------------------------------------------------------------
    // Envelope and status mapping — no DB
    // -------------------------------------------------------------------------

    #[test]
    fn config_item_is_serializable() {
        let item = ConfigItem {
            product_id: "11".to_string(),
            min_price: Decimal::new(50, 0),
            behavior: Some("moderate".to_string()),
            is_active: true,
            is_available: true,
        };
        let json = serde_json::to_string(&item).expect("serialize");
        assert!(json.contains("\"product_id\":\"11\""));
    }

    #[test]
    fn api_error_invalid_argument_maps_to_bad_request() {
        let response = ApiError::new("req-1", "invalid_argument", "bad input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_credential_missing_maps_to_not_found() {
        let response = ApiError::new("req-1", "credential_missing", "no access").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn api_error_upstream_maps_to_bad_gateway() {
        let response =
            ApiError::new("req-1", "upstream_unavailable", "catalog down").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn api_error_bulk_write_maps_to_internal_error() {
        let response = ApiError::new("req-1", "bulk_write_failed", "batch died").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    // -------------------------------------------------------------------------
    // Bargain requests — unread lifecycle
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn request_lifecycle_submit_list_mark_read(pool: sqlx::PgPool) {
        let app = test_app(pool);

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargain-requests",
            Some(json!({
                "product_title": "Red Shirt",
                "variant_title": "Large",
                "variant_price": 40.00,
                "customer_email": "shopper@example.com",
                "shop_name": "haggle-demo",
                "variant_id": "44000001"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "submit failed: {body}");
        let id = body["data"]["id"].as_i64().expect("request id");

        let (status, body) = send_json(
            &app,
            "GET",
            "/api/v1/bargain-requests/unread?shop_name=haggle-demo",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let unread = body["data"].as_array().expect("data array");
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0]["id"].as_i64(), Some(id));
        assert_eq!(unread[0]["product_name"].as_str(), Some("Large"));

        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/v1/bargain-requests/{id}/read"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send_json(
            &app,
            "GET",
            "/api/v1/bargain-requests/unread?shop_name=haggle-demo",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            body["data"].as_array().expect("data array").is_empty(),
            "read requests must drop out of the unread list"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn mark_read_unknown_id_returns_404(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let (status, body) =
            send_json(&app, "POST", "/api/v1/bargain-requests/404/read", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"].as_str(), Some("not_found"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn submit_falls_back_to_product_title_for_default_variant(pool: sqlx::PgPool) {
        let app = test_app(pool);

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargain-requests",
            Some(json!({
                "product_title": "Red Shirt",
                "variant_title": "Default Title / S",
                "variant_price": 40.00,
                "customer_email": "shopper@example.com",
                "shop_name": "haggle-demo",
                "variant_id": "44000001"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["product_name"].as_str(), Some("Red Shirt"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn submit_rejects_missing_fields(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/bargain-requests",
            Some(json!({
                "product_title": "Red Shirt",
                "variant_title": "",
                "variant_price": 40.00,
                "customer_email": "shopper@example.com",
                "shop_name": "haggle-demo",
                "variant_id": "44000001"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // -------------------------------------------------------------------------
    // Single-record mutation paths
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn set_min_price_rejects_unconfigured_product(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-min-price",
            Some(json!({ "product_id": "unknown", "min_price": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"].as_str(), Some("not_found"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn set_min_price_updates_configured_product(pool: sqlx::PgPool) {
        seed_config(&pool, DEV_MERCHANT_ID, "v1", 20).await;
        let app = test_app(pool);

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-min-price",
            Some(json!({ "product_id": "v1", "min_price": 35 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "set-min-price failed: {body}");
        assert_eq!(body["data"]["is_active"].as_bool(), Some(true));
        assert_eq!(body["data"]["min_price"].as_str(), Some("35.00"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn set_min_price_rejects_negative_value(pool: sqlx::PgPool) {
        seed_config(&pool, DEV_MERCHANT_ID, "v1", 20).await;
        let app = test_app(pool);

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-min-price",
            Some(json!({ "product_id": "v1", "min_price": -5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"].as_str(), Some("invalid_argument"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivate_product_zeroes_price(pool: sqlx::PgPool) {
        seed_config(&pool, DEV_MERCHANT_ID, "v1", 20).await;
        let app = test_app(pool.clone());

        let (status, body) = send_json(
            &app,
            "DELETE",
            "/api/v1/bargaining/products/v1?reason=out%20of%20stock",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["affected"].as_u64(), Some(1));
        assert_eq!(body["data"]["config"]["is_active"].as_bool(), Some(false));
        assert_eq!(body["data"]["config"]["min_price"].as_str(), Some("0.00"));

        let row = haggle_db::get_config(&pool, DEV_MERCHANT_ID, "v1")
            .await
            .expect("get")
            .expect("row");
        assert_eq!(row.deactivation_reason.as_deref(), Some("out of stock"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivate_unknown_product_is_a_success_noop(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let (status, body) =
            send_json(&app, "DELETE", "/api/v1/bargaining/products/ghost", None).await;
        assert_eq!(status, StatusCode::OK, "no-op deactivation must succeed");
        assert_eq!(body["data"]["affected"].as_u64(), Some(0));
        assert!(body["data"]["config"].is_null());
    }

    // -------------------------------------------------------------------------
    // Global vs merchant-scoped deactivation
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivate_all_crosses_merchant_boundaries(pool: sqlx::PgPool) {
        seed_config(&pool, DEV_MERCHANT_ID, "v1", 20).await;
        seed_config(&pool, "other-merchant", "v2", 30).await;
        let app = test_app(pool.clone());

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/deactivate-all",
            Some(json!({ "reason": "kill switch" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["modified_count"].as_u64(), Some(2));

        // The other merchant's record is affected too: the operation is
        // global by design, unlike deactivate-category.
        let other = haggle_db::get_config(&pool, "other-merchant", "v2")
            .await
            .expect("get")
            .expect("row");
        assert!(!other.is_active);
        assert_eq!(other.min_price, Decimal::ZERO);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivate_all_requires_a_reason(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/deactivate-all",
            Some(json!({ "reason": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // -------------------------------------------------------------------------
    // Listing and shopper-side lookup
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn details_lists_only_the_callers_configs(pool: sqlx::PgPool) {
        seed_config(&pool, DEV_MERCHANT_ID, "v1", 20).await;
        seed_config(&pool, "other-merchant", "v2", 30).await;
        let app = test_app(pool);

        let (status, body) = send_json(&app, "GET", "/api/v1/bargaining/details", None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["data"].as_array().expect("data array");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["product_id"].as_str(), Some("v1"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn bargain_info_returns_config_or_null(pool: sqlx::PgPool) {
        seed_config(&pool, DEV_MERCHANT_ID, "v1", 20).await;
        let app = test_app(pool);

        let (status, body) =
            send_json(&app, "GET", "/api/v1/bargaining/info/v1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["product_id"].as_str(), Some("v1"));

        let (status, body) =
            send_json(&app, "GET", "/api/v1/bargaining/info/ghost", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].is_null());
    }

    // -------------------------------------------------------------------------
    // Bulk min-price executor surface
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_min_price_upserts_and_counts(pool: sqlx::PgPool) {
        seed_config(&pool, DEV_MERCHANT_ID, "v1", 20).await;
        let app = test_app(pool.clone());

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/bulk-min-price",
            Some(json!({ "updates": [
                { "product_id": "v1", "min_price": 11 },
                { "product_id": "v2", "min_price": 22 }
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "bulk min price failed: {body}");
        assert_eq!(body["data"]["affected"].as_u64(), Some(2));

        let v2 = haggle_db::get_config(&pool, DEV_MERCHANT_ID, "v2")
            .await
            .expect("get")
            .expect("v2 was provisioned");
        assert_eq!(v2.min_price, Decimal::new(22, 0));
        assert!(v2.is_active);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_min_price_rejects_negative_entry(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/bulk-min-price",
            Some(json!({ "updates": [{ "product_id": "v1", "min_price": -1 }]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"].as_str(), Some("invalid_argument"));
    }

    // -------------------------------------------------------------------------
    // Catalog-backed reconciliation — wiremock upstream
    // -------------------------------------------------------------------------

    async fn mock_products(server: &MockServer, body: &serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/admin/api/2024-04/products.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn set_by_category_provisions_every_variant(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mock_products(&server, &two_category_products()).await;
        seed_credential(&pool, DEV_MERCHANT_ID, &server.uri()).await;
        let app = test_app(pool.clone());

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-by-category",
            Some(json!({ "category": "Shoes", "behavior": "moderate", "min_price": 50 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "set-by-category failed: {body}");
        assert_eq!(body["data"]["created"].as_u64(), Some(2));
        assert_eq!(body["data"]["updated"].as_u64(), Some(0));

        let rows = haggle_db::list_configs(&pool, DEV_MERCHANT_ID)
            .await
            .expect("list");
        assert_eq!(rows.len(), 2, "one record per Shoes variant");
        let out_of_stock = rows.iter().find(|r| r.product_id == "12").expect("v12");
        assert!(!out_of_stock.is_available, "zero inventory maps to unavailable");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn set_by_category_replay_is_idempotent(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mock_products(&server, &two_category_products()).await;
        seed_credential(&pool, DEV_MERCHANT_ID, &server.uri()).await;
        let app = test_app(pool.clone());

        let request_body = json!({ "category": "Shoes", "behavior": "moderate", "min_price": 50 });
        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-by-category",
            Some(request_body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-by-category",
            Some(request_body),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["created"].as_u64(), Some(0));
        assert_eq!(body["data"]["updated"].as_u64(), Some(2));

        let rows = haggle_db::list_configs(&pool, DEV_MERCHANT_ID)
            .await
            .expect("list");
        assert_eq!(rows.len(), 2, "replay must not duplicate records");
        assert!(rows
            .iter()
            .all(|r| r.min_price == Decimal::new(50, 0)));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn set_by_category_unknown_category_is_404(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mock_products(&server, &two_category_products()).await;
        seed_credential(&pool, DEV_MERCHANT_ID, &server.uri()).await;
        let app = test_app(pool);

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-by-category",
            Some(json!({ "category": "Bags", "behavior": "moderate", "min_price": 50 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"].as_str(), Some("not_found"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn set_all_products_on_empty_catalog_is_404(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mock_products(&server, &json!({ "products": [] })).await;
        seed_credential(&pool, DEV_MERCHANT_ID, &server.uri()).await;
        let app = test_app(pool);

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-all-products",
            Some(json!({ "behavior": "firm", "min_price": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn set_all_products_rejects_unknown_behavior(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-all-products",
            Some(json!({ "behavior": "ruthless", "min_price": 10 })),
        )
        .await;
        assert_eq!(
            status,
            StatusCode::UNPROCESSABLE_ENTITY,
            "unknown behavior tags are rejected at deserialization"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn set_by_product_creates_then_updates(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mock_products(&server, &two_category_products()).await;
        seed_credential(&pool, DEV_MERCHANT_ID, &server.uri()).await;
        let app = test_app(pool.clone());

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-by-product",
            Some(json!({ "product_id": "21", "min_price": 18 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "set-by-product failed: {body}");
        assert_eq!(body["data"]["created"].as_u64(), Some(1));

        let row = haggle_db::get_config(&pool, DEV_MERCHANT_ID, "21")
            .await
            .expect("get")
            .expect("provisioned");
        assert_eq!(row.min_price, Decimal::new(18, 0));
        assert!(row.behavior.is_none(), "by-product path carries no behavior");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn set_by_product_unknown_variant_is_404(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mock_products(&server, &two_category_products()).await;
        seed_credential(&pool, DEV_MERCHANT_ID, &server.uri()).await;
        let app = test_app(pool);

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-by-product",
            Some(json!({ "product_id": "99", "min_price": 18 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"].as_str(), Some("not_found"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn missing_credential_is_reported_as_such(pool: sqlx::PgPool) {
        let app = test_app(pool);
        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-all-products",
            Some(json!({ "behavior": "firm", "min_price": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"].as_str(), Some("credential_missing"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn upstream_failure_maps_to_bad_gateway(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin/api/2024-04/products.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        seed_credential(&pool, DEV_MERCHANT_ID, &server.uri()).await;
        let app = test_app(pool);

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/set-all-products",
            Some(json!({ "behavior": "firm", "min_price": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body["error"]["code"].as_str(),
            Some("upstream_unavailable")
        );
    }

    // -------------------------------------------------------------------------
    // Category deactivation — collections-resolved, merchant-scoped
    // -------------------------------------------------------------------------

    async fn mock_collection(server: &MockServer, title: &str, variant_ids: &[i64]) {
        Mock::given(method("GET"))
            .and(path("/admin/api/2024-04/custom_collections.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
                "custom_collections": [{ "id": 9, "title": title }]
            })))
            .mount(server)
            .await;

        let variants: Vec<serde_json::Value> = variant_ids
            .iter()
            .map(|id| json!({ "id": id, "title": "Default Title", "price": "10.00", "inventory_quantity": 1 }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/admin/api/2024-04/collections/9/products.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
                "products": [{ "id": 1, "title": "Bundle", "variants": variants }]
            })))
            .mount(server)
            .await;
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivate_category_scopes_to_the_calling_merchant(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mock_collection(&server, "Summer Sale", &[11, 12]).await;
        seed_credential(&pool, DEV_MERCHANT_ID, &server.uri()).await;
        seed_config(&pool, DEV_MERCHANT_ID, "11", 20).await;
        seed_config(&pool, "other-merchant", "11", 30).await;
        let app = test_app(pool.clone());

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/deactivate-category",
            Some(json!({ "category": "Summer Sale", "reason": "season over" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "deactivate-category failed: {body}");
        assert_eq!(body["data"]["modified_count"].as_u64(), Some(1));

        let mine = haggle_db::get_config(&pool, DEV_MERCHANT_ID, "11")
            .await
            .expect("get")
            .expect("row");
        assert!(!mine.is_active);
        assert_eq!(mine.min_price, Decimal::ZERO);

        // Never touches another merchant's records, unlike deactivate-all.
        let other = haggle_db::get_config(&pool, "other-merchant", "11")
            .await
            .expect("get")
            .expect("row");
        assert!(other.is_active);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivate_category_with_no_local_configs_is_zero_not_error(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mock_collection(&server, "Summer Sale", &[11]).await;
        seed_credential(&pool, DEV_MERCHANT_ID, &server.uri()).await;
        let app = test_app(pool);

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/deactivate-category",
            Some(json!({ "category": "Summer Sale", "reason": "season over" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["modified_count"].as_u64(), Some(0));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivate_category_unknown_collection_is_404(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mock_collection(&server, "Summer Sale", &[11]).await;
        seed_credential(&pool, DEV_MERCHANT_ID, &server.uri()).await;
        let app = test_app(pool);

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/deactivate-category",
            Some(json!({ "category": "Winter Sale", "reason": "season over" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivate_category_empty_collection_is_404(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mock_collection(&server, "Summer Sale", &[]).await;
        seed_credential(&pool, DEV_MERCHANT_ID, &server.uri()).await;
        let app = test_app(pool);

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/v1/bargaining/deactivate-category",
            Some(json!({ "category": "Summer Sale", "reason": "season over" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
