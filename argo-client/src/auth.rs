//! Credential exchange
//!
//! Turns a long-lived API key/secret into a short-lived access token via the
//! identity service. The exchange is attempted once: a failure aborts client
//! construction. Tokens are never refreshed; one token serves the whole
//! process lifetime.

use argo_core::cancel::CancelToken;
use argo_core::dto::auth::{ApiTokenRequest, ApiTokenResponse};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use tracing::{debug, error, info};

use crate::error::{ClientError, Result};

/// Identity service endpoint for API-token exchange
pub const API_TOKEN_PATH: &str = "/identity/resources/auth/v1/api-token";

/// How the runner authenticates against the control plane
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// API key/secret pair exchanged for an access token at startup
    ApiKey { key: String, secret: String },
    /// Pre-formatted bearer token used as-is
    Token(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiKey { key, .. } => f
                .debug_struct("ApiKey")
                .field("key", key)
                .field("secret", &"<redacted>")
                .finish(),
            Credentials::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
        }
    }
}

/// Bearer token attached to every control-plane request
#[derive(Clone)]
pub struct AccessToken {
    header_value: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Wraps a raw access token
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self {
            header_value: format!("Bearer {}", token.as_ref()),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Wraps an already formatted `Authorization` value
    ///
    /// A value without a `Bearer ` scheme is treated as a raw token.
    pub fn from_header(value: impl AsRef<str>) -> Self {
        let value = value.as_ref().trim();
        let has_scheme = value
            .get(..7)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("bearer "));

        if has_scheme {
            Self {
                header_value: value.to_string(),
                refresh_token: None,
                expires_at: None,
            }
        } else {
            Self::bearer(value)
        }
    }

    /// Builds a token from an identity service response received at `issued_at`
    pub fn from_response(response: ApiTokenResponse, issued_at: DateTime<Utc>) -> Self {
        let expires_at = (response.expires_in > 0)
            .then(|| issued_at + Duration::seconds(response.expires_in));

        Self {
            header_value: format!("Bearer {}", response.access_token),
            refresh_token: Some(response.refresh_token).filter(|t| !t.is_empty()),
            expires_at,
        }
    }

    /// Value for the `Authorization` header
    pub fn header_value(&self) -> &str {
        &self.header_value
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token is past its reported lifetime
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("header_value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Exchanges an API key/secret pair for an access token
///
/// Fails with [`ClientError::Auth`] when the request cannot be sent, the
/// identity service answers with a non-2xx status (its body is included in
/// the error), or the body is not a token. Only cancellation is reported
/// differently, as [`ClientError::Cancelled`].
pub async fn exchange_api_token(
    client: &Client,
    identity_url: &str,
    key: &str,
    secret: &str,
    cancel: &CancelToken,
) -> Result<AccessToken> {
    let url = format!("{}{}", identity_url.trim_end_matches('/'), API_TOKEN_PATH);
    debug!("Exchanging API key for access token at {}", url);

    let request = client.post(&url).json(&ApiTokenRequest {
        client_id: key.to_string(),
        secret: secret.to_string(),
    });

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ClientError::Cancelled),
        response = request.send() => response,
    };

    let response = response.map_err(|e| {
        error!("Could not send token request: {}", e);
        ClientError::Auth(format!("could not reach identity service: {}", e))
    })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::Auth(format!("failed to read token response: {}", e)))?;

    if !status.is_success() {
        error!("Identity service rejected credentials ({}): {}", status, body);
        return Err(ClientError::Auth(body));
    }

    let token: ApiTokenResponse = serde_json::from_str(&body).map_err(|e| {
        error!("Could not decode token response: {}", e);
        ClientError::Auth(format!("unexpected token response: {}", e))
    })?;

    let token = AccessToken::from_response(token, Utc::now());
    info!(
        "Obtained access token (expires at {})",
        token
            .expires_at()
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string())
    );

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header_keeps_scheme() {
        assert_eq!(
            AccessToken::from_header("Bearer abc").header_value(),
            "Bearer abc"
        );
        assert_eq!(
            AccessToken::from_header("bearer abc").header_value(),
            "bearer abc"
        );
        assert_eq!(AccessToken::from_header("abc").header_value(), "Bearer abc");
    }

    #[test]
    fn test_from_response_computes_expiry() {
        let issued_at = Utc::now();
        let token = AccessToken::from_response(
            ApiTokenResponse {
                access_token: "tok".to_string(),
                refresh_token: "ref".to_string(),
                expires_in: 3600,
                expires: String::new(),
            },
            issued_at,
        );

        assert_eq!(token.header_value(), "Bearer tok");
        assert_eq!(token.refresh_token(), Some("ref"));
        assert_eq!(token.expires_at(), Some(issued_at + Duration::seconds(3600)));
        assert!(!token.is_expired());
    }

    #[test]
    fn test_expired_token() {
        let token = AccessToken::from_response(
            ApiTokenResponse {
                access_token: "tok".to_string(),
                refresh_token: String::new(),
                expires_in: 60,
                expires: String::new(),
            },
            Utc::now() - Duration::seconds(120),
        );

        assert!(token.is_expired());
        assert_eq!(token.refresh_token(), None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::ApiKey {
            key: "key-1".to_string(),
            secret: "s3cret".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("s3cret"));
        assert!(!format!("{:?}", AccessToken::bearer("tok-xyz")).contains("tok-xyz"));
    }
}
