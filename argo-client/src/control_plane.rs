//! Control-plane capability
//!
//! The build orchestrator depends on this trait rather than on
//! [`ControlPlaneClient`] directly, so tests can substitute deterministic
//! fixtures for a live server.

use argo_core::cancel::CancelToken;
use argo_core::domain::build_config::BuildConfig;
use argo_core::domain::build_run::BuildRun;
use argo_core::domain::registry::RegistryAccess;
use argo_core::domain::secret::BuildSecret;
use argo_core::dto::callback::CallbackPayload;
use async_trait::async_trait;

use crate::ControlPlaneClient;
use crate::error::Result;

/// Operations a build task performs against the control plane
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Fetches the build run being executed
    async fn fetch_build_run_info(
        &self,
        build_run_id: &str,
        cancel: &CancelToken,
    ) -> Result<BuildRun>;

    /// Fetches the build configuration the run was created from
    async fn fetch_build_info(&self, build_id: &str, cancel: &CancelToken) -> Result<BuildConfig>;

    /// Fetches push credentials for a registry
    async fn fetch_container_registry_access(
        &self,
        registry_id: &str,
        cancel: &CancelToken,
    ) -> Result<RegistryAccess>;

    /// Fetches the secrets injected as build arguments
    async fn fetch_build_time_secrets(
        &self,
        build_config_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<BuildSecret>>;

    /// Reports the terminal state of the run; never retried
    async fn build_run_callback(
        &self,
        build_run_id: &str,
        payload: &CallbackPayload,
    ) -> Result<()>;
}

// Inherent methods take precedence over trait methods in path resolution,
// so these delegate rather than recurse.
#[async_trait]
impl ControlPlane for ControlPlaneClient {
    async fn fetch_build_run_info(
        &self,
        build_run_id: &str,
        cancel: &CancelToken,
    ) -> Result<BuildRun> {
        ControlPlaneClient::fetch_build_run_info(self, build_run_id, cancel).await
    }

    async fn fetch_build_info(&self, build_id: &str, cancel: &CancelToken) -> Result<BuildConfig> {
        ControlPlaneClient::fetch_build_info(self, build_id, cancel).await
    }

    async fn fetch_container_registry_access(
        &self,
        registry_id: &str,
        cancel: &CancelToken,
    ) -> Result<RegistryAccess> {
        ControlPlaneClient::fetch_container_registry_access(self, registry_id, cancel).await
    }

    async fn fetch_build_time_secrets(
        &self,
        build_config_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<BuildSecret>> {
        ControlPlaneClient::fetch_build_time_secrets(self, build_config_id, cancel).await
    }

    async fn build_run_callback(
        &self,
        build_run_id: &str,
        payload: &CallbackPayload,
    ) -> Result<()> {
        ControlPlaneClient::build_run_callback(self, build_run_id, payload).await
    }
}
