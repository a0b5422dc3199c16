//! Argo HTTP Client
//!
//! Authenticated, typed access to the Argo control-plane API for build tasks.
//!
//! The client is constructed once per process with [`ControlPlaneClient::connect`],
//! which exchanges the configured credentials for a bearer token, and is then
//! passed to whoever needs it. Reads are retried on transport failures; the
//! run callback is sent exactly once.
//!
//! # Example
//!
//! ```no_run
//! use argo_client::{ClientSettings, ControlPlaneClient, Credentials};
//! use argo_core::cancel::CancelToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = ClientSettings::new("http://localhost:8080", "https://identity.example.com");
//!     let credentials = Credentials::ApiKey {
//!         key: "key".to_string(),
//!         secret: "secret".to_string(),
//!     };
//!     let cancel = CancelToken::never();
//!
//!     let client = ControlPlaneClient::connect(&settings, &credentials, &cancel).await?;
//!     let run = client.fetch_build_run_info("run-1", &cancel).await?;
//!
//!     println!("Build run {} uses config {}", run.id, run.build_config_id);
//!     Ok(())
//! }
//! ```

pub mod auth;
mod builds;
pub mod control_plane;
pub mod error;
mod registries;
pub mod retry;

// Re-export commonly used types
pub use auth::{AccessToken, Credentials};
pub use control_plane::ControlPlane;
pub use error::{ClientError, Result};
pub use retry::RetryPolicy;

use std::time::Duration;

use argo_core::cancel::CancelToken;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

const USER_AGENT: &str = concat!("argo-builder/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`ControlPlaneClient::connect`]
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Control-plane base URL (e.g., "http://localhost:8080")
    pub api_url: String,
    /// Identity service base URL used for credential exchange
    pub identity_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry policy for idempotent reads
    pub retry: RetryPolicy,
}

impl ClientSettings {
    pub fn new(api_url: impl Into<String>, identity_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            identity_url: identity_url.into(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// HTTP client for the Argo control-plane API
///
/// Holds the bearer token obtained at construction. Operations are grouped
/// by resource:
/// - Build runs and configurations, build secrets, run callback
/// - Container registry access
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    /// Base URL of the control plane
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Token sent as the `Authorization` header
    token: AccessToken,
    /// Retry policy applied to GET requests
    retry: RetryPolicy,
}

impl ControlPlaneClient {
    /// Create a client with an existing token
    ///
    /// # Example
    /// ```
    /// use argo_client::{AccessToken, ControlPlaneClient};
    ///
    /// let client = ControlPlaneClient::new("http://localhost:8080/", AccessToken::bearer("tok"));
    /// assert_eq!(client.base_url(), "http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>, token: AccessToken) -> Self {
        Self::with_client(base_url, Client::new(), token)
    }

    /// Create a client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client, token: AccessToken) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy used for reads
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Authenticate and build the process-wide client
    ///
    /// API key credentials are exchanged for an access token first; a failed
    /// exchange is returned as [`ClientError::Auth`] and no client exists.
    pub async fn connect(
        settings: &ClientSettings,
        credentials: &Credentials,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let token = match credentials {
            Credentials::Token(value) => {
                info!("Using pre-configured bearer token");
                AccessToken::from_header(value)
            }
            Credentials::ApiKey { key, secret } => {
                auth::exchange_api_token(&client, &settings.identity_url, key, secret, cancel)
                    .await?
            }
        };

        let client = Self::with_client(settings.api_url.clone(), client, token)
            .with_retry_policy(settings.retry);
        info!("Control plane client initialized for {}", client.base_url());

        Ok(client)
    }

    /// Get the base URL of the control plane
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the retry policy applied to reads
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.token.is_expired() {
            warn!("Access token has expired; requests may be rejected (tokens are not refreshed)");
        }
        request.header(reqwest::header::AUTHORIZATION, self.token.header_value())
    }

    /// GET a JSON resource, retrying transport failures
    async fn get_json<T: DeserializeOwned>(&self, path: &str, cancel: &CancelToken) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);

        let operation = format!("GET {}", path);
        let response = retry::send_with_retry(&self.retry, cancel, &operation, || {
            self.authorize(self.client.get(&url))
        })
        .await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// A non-2xx status becomes [`ClientError::Server`] carrying the raw body;
    /// an empty or malformed 2xx body becomes [`ClientError::Decode`].
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Error status from server ({}): {}", status, body);
            return Err(ClientError::server(status.as_u16(), body));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(ClientError::Decode("empty response body".to_string()));
        }

        serde_json::from_slice(&body).map_err(|e| {
            error!("Could not parse body, unexpected response type sent from server: {}", e);
            ClientError::Decode(e.to_string())
        })
    }

    /// Handle an API response whose body is an acknowledgement only
    ///
    /// Any 2xx status is success, whatever the body contains.
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Error status from server ({}): {}", status, body);
            return Err(ClientError::server(status.as_u16(), body));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ControlPlaneClient::new("http://localhost:8080", AccessToken::bearer("tok"));
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.retry_policy(), &RetryPolicy::default());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ControlPlaneClient::new("http://localhost:8080/", AccessToken::bearer("tok"));
        assert_eq!(client.url("/api/v1/build/1"), "http://localhost:8080/api/v1/build/1");
    }

    #[test]
    fn test_client_with_retry_policy() {
        let policy = RetryPolicy::fixed(5, Duration::from_millis(10));
        let client = ControlPlaneClient::with_client(
            "http://localhost:8080",
            Client::new(),
            AccessToken::bearer("tok"),
        )
        .with_retry_policy(policy);
        assert_eq!(client.retry_policy(), &policy);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ClientSettings::new("http://localhost:8080", "https://id.example.com");
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.retry, RetryPolicy::default());
    }
}
