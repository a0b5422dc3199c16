//! Build secret DTOs

use serde::{Deserialize, Serialize};

use crate::domain::secret::BuildSecret;

/// Envelope returned by the build secrets endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSecretsResponse {
    pub build_secrets_data: Option<BuildSecretsData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSecretsData {
    #[serde(deserialize_with = "crate::domain::null_as_default")]
    pub data: Vec<BuildSecret>,
}

impl BuildSecretsResponse {
    /// Unwraps the envelope; a missing envelope means no secrets
    pub fn into_secrets(self) -> Vec<BuildSecret> {
        self.build_secrets_data
            .map(|data| data.data)
            .unwrap_or_default()
    }
}
