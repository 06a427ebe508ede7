use std::fmt;

use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Errors that can occur while talking to the management API.
#[derive(Debug)]
pub enum ApiError {
    /// Client misconfigured (missing token, bad base URL). Not retryable.
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused). Retryable.
    Network(String),
    /// API returned an error response.
    Api { status: u16, message: String },
    /// Failed to parse the API's response body.
    Parse(String),
    /// A 202 response could not be handed to the operation tracker.
    Tracking(String),
}

impl ApiError {
    /// Throttling and server-side errors are worth trying again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Config(msg) => write!(f, "config error: {msg}"),
            ApiError::Network(msg) => write!(f, "network error: {msg}"),
            ApiError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            ApiError::Parse(msg) => write!(f, "parse error: {msg}"),
            ApiError::Tracking(msg) => write!(f, "tracking error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub method: String,
    pub uri: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    }

    /// Turns a non-2xx response into [`ApiError::Api`], preferring the
    /// provider's `error.message` over the raw body.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            return Ok(self);
        }
        let message = serde_json::from_str::<ErrorEnvelope>(&self.body)
            .map(|e| format!("{}: {}", e.error.code, e.error.message))
            .unwrap_or_else(|_| self.body.clone());
        Err(ApiError::Api {
            status: self.status,
            message,
        })
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::Parse(format!("{} {}: {e}", self.method, self.uri)))
    }
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// The common shape of subscriptions, resource groups and resources.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArmResource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Subscriptions carry a display name instead of a name.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "type")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Subscription state ("Enabled", "Disabled", ...).
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
}

impl ArmResource {
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.id)
    }

    /// `provisioningState` for groups and resources, `state` for subscriptions.
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.get("provisioningState"))
            .and_then(|v| v.as_str())
            .or(self.state.as_deref())
    }
}

/// One page of a list call.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArmList {
    #[serde(default)]
    pub value: Vec<ArmResource>,
    #[serde(default)]
    pub next_link: Option<String>,
}
