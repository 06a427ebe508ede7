//! HTTP client for the resource management API.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;

use super::types::{ApiError, ApiResponse};
use crate::core::tracker::{Poller, TrackerHandle};

pub const DEFAULT_BASE_URL: &str = "https://management.azure.com";
pub const DEFAULT_API_VERSION: &str = "2021-04-01";

/// Thin wrapper over `reqwest` that speaks the management API's URL and
/// auth conventions.
///
/// Every response to a mutating call is shown to the operation tracker
/// (when one is attached) so 202 Accepted operations are followed to
/// completion.
#[derive(Clone)]
pub struct ArmClient {
    base_url: Url,
    access_token: Option<String>,
    api_version: String,
    client: reqwest::Client,
    observer: Option<TrackerHandle>,
}

impl ArmClient {
    /// Creates a client.
    ///
    /// # Arguments
    /// * `base_url` - Management endpoint, e.g. `https://management.azure.com`
    /// * `access_token` - Bearer token; `None` sends unauthenticated requests
    /// * `api_version` - Appended to requests that don't carry one already
    pub fn new(
        base_url: &str,
        access_token: Option<String>,
        api_version: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL '{base_url}': {e}")))?;
        if access_token.is_none() {
            warn!("No access token configured, requests will be unauthenticated");
        }
        Ok(Self {
            base_url,
            access_token,
            api_version: api_version.into(),
            client: reqwest::Client::new(),
            observer: None,
        })
    }

    /// Attaches the tracker that follows accepted operations.
    pub fn with_observer(mut self, observer: TrackerHandle) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Resolves `path` against the base URL and makes sure it carries an
    /// `api-version`. Absolute URLs (such as `nextLink`s) are kept as-is
    /// apart from the version.
    pub fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        let mut url = if path.starts_with("http://") || path.starts_with("https://") {
            Url::parse(path)
        } else {
            self.base_url.join(path)
        }
        .map_err(|e| ApiError::Config(format!("invalid request path '{path}': {e}")))?;

        if !url.query_pairs().any(|(k, _)| k == "api-version") {
            url.query_pairs_mut()
                .append_pair("api-version", &self.api_version);
        }
        Ok(url)
    }

    /// GET that fails on non-2xx.
    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.execute(Method::GET, path, false).await?.error_for_status()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get(path).await?.json()
    }

    /// DELETE. A 202 response is handed to the tracker before returning.
    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.execute(Method::DELETE, path, true).await?.error_for_status()
    }

    async fn execute(&self, method: Method, path: &str, observe: bool) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(path)?;
        debug!("{} {}", method, url);

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(format!("reading body of {url}: {e}")))?;
        debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());

        let response = ApiResponse {
            method: method.to_string(),
            uri: url.to_string(),
            status,
            headers,
            body,
        };

        if observe && let Some(observer) = &self.observer {
            match observer.observe(&response) {
                Ok(true) => info!("{} {} accepted, tracking", response.method, response.uri),
                Ok(false) => {}
                Err(e) => return Err(ApiError::Tracking(e.to_string())),
            }
        }
        Ok(response)
    }
}

#[async_trait]
impl Poller for ArmClient {
    async fn poll(&self, uri: &str) -> Result<ApiResponse, ApiError> {
        self.execute(Method::GET, uri, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ArmClient {
        ArmClient::new("https://arm.example/", None, "2021-04-01").unwrap()
    }

    #[test]
    fn test_relative_path_gets_api_version() {
        let url = client().url_for("/subscriptions").unwrap();
        assert_eq!(
            url.as_str(),
            "https://arm.example/subscriptions?api-version=2021-04-01"
        );
    }

    #[test]
    fn test_existing_api_version_is_kept() {
        let url = client()
            .url_for("https://other.example/ops/1?api-version=2020-01-01")
            .unwrap();
        assert_eq!(url.as_str(), "https://other.example/ops/1?api-version=2020-01-01");
    }

    #[test]
    fn test_absolute_next_link_keeps_its_query() {
        let url = client()
            .url_for("https://arm.example/subscriptions/1/resources?$skiptoken=abc")
            .unwrap();
        assert!(url.as_str().contains("skiptoken=abc"));
        assert!(url.as_str().contains("api-version=2021-04-01"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ArmClient::new("not a url", None, "v"),
            Err(ApiError::Config(_))
        ));
    }
}
