use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Merchant identity assumed when auth is disabled in development.
pub const DEV_MERCHANT_ID: &str = "dev-merchant";

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Authenticated merchant identity, stored as a request extension by the
/// auth middleware. Merchant-scoped handlers trust this without
/// re-validating it.
#[derive(Debug, Clone)]
pub struct MerchantId(pub String);

/// Bearer-token auth settings mapping each token to the merchant it
/// authenticates.
#[derive(Debug, Clone)]
pub struct AuthState {
    merchants_by_token: Arc<HashMap<String, String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from `HAGGLE_API_KEYS` — comma-separated
    /// `token=merchant_id` pairs.
    ///
    /// In development, empty/missing keys disable auth for local iteration
    /// and every request is attributed to [`DEV_MERCHANT_ID`]. In
    /// non-development envs, empty/missing keys fail startup.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var("HAGGLE_API_KEYS").unwrap_or_default();
        let mut merchants_by_token = HashMap::new();
        for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((token, merchant)) = entry.split_once('=') else {
                anyhow::bail!(
                    "HAGGLE_API_KEYS entry \"{entry}\" is not a token=merchant_id pair"
                );
            };
            if token.is_empty() || merchant.is_empty() {
                anyhow::bail!("HAGGLE_API_KEYS entry \"{entry}\" has an empty token or merchant");
            }
            merchants_by_token.insert(token.to_owned(), merchant.to_owned());
        }

        if merchants_by_token.is_empty() {
            if is_development {
                tracing::warn!(
                    "HAGGLE_API_KEYS not set; bearer auth disabled in development environment"
                );
                return Ok(Self {
                    merchants_by_token: Arc::new(HashMap::new()),
                    enabled: false,
                });
            }

            anyhow::bail!(
                "HAGGLE_API_KEYS is required outside development; provide comma-separated token=merchant_id pairs"
            );
        }

        Ok(Self {
            merchants_by_token: Arc::new(merchants_by_token),
            enabled: true,
        })
    }

    /// Resolves a presented token to its merchant, comparing in constant
    /// time against every configured token.
    fn resolve(&self, presented: &str) -> Option<&str> {
        let mut matched: Option<&str> = None;
        for (token, merchant) in self.merchants_by_token.iter() {
            if token.as_bytes().ct_eq(presented.as_bytes()).into() {
                matched = Some(merchant.as_str());
            }
        }
        matched
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Sliding fixed-window limiter for simple API protection.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware resolving the calling merchant from the bearer token.
///
/// When auth is disabled (development only), every request runs as
/// [`DEV_MERCHANT_ID`]. Otherwise an unknown or missing token is rejected
/// before any handler runs.
pub async fn require_merchant_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        req.extensions_mut()
            .insert(MerchantId(DEV_MERCHANT_ID.to_string()));
        return next.run(req).await;
    }

    let token = extract_bearer_token(req.headers().get(AUTHORIZATION));
    let merchant = token.and_then(|t| auth.resolve(t)).map(str::to_owned);

    match merchant {
        Some(merchant) => {
            req.extensions_mut().insert(MerchantId(merchant));
            next.run(req).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "unauthorized",
                    message: "missing or invalid bearer token",
                },
            }),
        )
            .into_response(),
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "rate_limited",
                    message: "rate limit exceeded",
                },
            }),
        )
            .into_response();
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}
