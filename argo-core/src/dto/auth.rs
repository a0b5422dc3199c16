//! Identity service DTOs

use serde::{Deserialize, Serialize};

/// Body of the API-token exchange request
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiTokenRequest {
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub secret: String,
}

impl std::fmt::Debug for ApiTokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiTokenRequest")
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Token issued by the identity service
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: i64,
    /// Expiry as reported by the identity service
    #[serde(default)]
    pub expires: String,
}

impl std::fmt::Debug for ApiTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiTokenResponse")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("expires", &self.expires)
            .finish()
    }
}
