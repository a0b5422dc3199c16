//! Container registry API endpoints

use argo_core::cancel::CancelToken;
use argo_core::domain::registry::RegistryAccess;

use crate::ControlPlaneClient;
use crate::error::Result;

impl ControlPlaneClient {
    /// Get a short-lived credential lease for a container registry
    ///
    /// # Arguments
    /// * `registry_id` - The registry (artifactory) identifier
    ///
    /// # Returns
    /// Login credentials and registry location; keep them in memory only
    pub async fn fetch_container_registry_access(
        &self,
        registry_id: &str,
        cancel: &CancelToken,
    ) -> Result<RegistryAccess> {
        self.get_json(&format!("/api/v1/registries/{}/access", registry_id), cancel)
            .await
    }
}
