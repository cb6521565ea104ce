//! HTTP client for the Shopify Admin API.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::ShopifyError;
use crate::types::{
    CustomCollection, CustomCollectionsResponse, ShopifyProduct, ShopifyProductsResponse,
};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// A merchant's commerce credential, read from the store and never mutated
/// here.
#[derive(Debug, Clone)]
pub struct ShopCredential {
    /// Bare shop name (`"my-store"`), full domain, or full origin URL.
    pub shop_domain: String,
    pub access_token: String,
    /// Admin API version segment, e.g. `"2024-04"`.
    pub api_version: String,
}

/// HTTP client for the Shopify Admin API.
///
/// Non-2xx responses, network failures, and malformed bodies surface as
/// typed errors; callers map all of them to their upstream-unavailable
/// taxonomy. Requests are bounded by the configured timeout and are NOT
/// retried — a failed catalog fetch fails the whole operation and the
/// caller decides whether to resubmit.
pub struct ShopifyAdminClient {
    client: Client,
}

impl ShopifyAdminClient {
    /// Creates a client with the configured request timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ShopifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches the merchant's full current product list with nested variants.
    ///
    /// # Errors
    ///
    /// - [`ShopifyError::UnexpectedStatus`] — any non-2xx status.
    /// - [`ShopifyError::Http`] — network, TLS, or timeout failure.
    /// - [`ShopifyError::Deserialize`] — response body is not valid JSON.
    pub async fn fetch_products(
        &self,
        credential: &ShopCredential,
    ) -> Result<Vec<ShopifyProduct>, ShopifyError> {
        let url = Self::admin_url(credential, "products.json");
        let response: ShopifyProductsResponse = self
            .get_json(&url, credential, "products list")
            .await?;
        Ok(response.products)
    }

    /// Fetches the merchant's custom collections (id + title).
    ///
    /// # Errors
    ///
    /// Same error surface as [`Self::fetch_products`].
    pub async fn fetch_custom_collections(
        &self,
        credential: &ShopCredential,
    ) -> Result<Vec<CustomCollection>, ShopifyError> {
        let url = Self::admin_url(credential, "custom_collections.json");
        let response: CustomCollectionsResponse = self
            .get_json(&url, credential, "custom collections list")
            .await?;
        Ok(response.custom_collections)
    }

    /// Fetches the products belonging to one collection.
    ///
    /// # Errors
    ///
    /// Same error surface as [`Self::fetch_products`].
    pub async fn fetch_collection_products(
        &self,
        credential: &ShopCredential,
        collection_id: i64,
    ) -> Result<Vec<ShopifyProduct>, ShopifyError> {
        let url = Self::admin_url(
            credential,
            &format!("collections/{collection_id}/products.json"),
        );
        let response: ShopifyProductsResponse = self
            .get_json(&url, credential, "collection products list")
            .await?;
        Ok(response.products)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        credential: &ShopCredential,
        context: &str,
    ) -> Result<T, ShopifyError> {
        let response = self
            .client
            .get(url)
            .header(ACCESS_TOKEN_HEADER, &credential.access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), url, "admin API returned non-success");
            return Err(ShopifyError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| ShopifyError::Deserialize {
            context: format!("{context} from {url}"),
            source: e,
        })
    }

    /// Builds the Admin API URL for the given credential and resource path.
    ///
    /// The stored shop domain comes in three observed shapes:
    /// - a full origin (`"https://shop.example.com"`) — used verbatim, which
    ///   also lets tests point the client at a local mock server;
    /// - a full domain (`"my-store.myshopify.com"`) — wrapped in `https://`;
    /// - a bare shop name (`"my-store"`) — expanded to
    ///   `https://my-store.myshopify.com`.
    fn admin_url(credential: &ShopCredential, resource: &str) -> String {
        let domain = credential.shop_domain.trim_end_matches('/');
        let origin = if domain.contains("://") {
            domain.to_owned()
        } else if domain.contains('.') {
            format!("https://{domain}")
        } else {
            format!("https://{domain}.myshopify.com")
        };
        format!(
            "{origin}/admin/api/{version}/{resource}",
            version = credential.api_version
        )
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
