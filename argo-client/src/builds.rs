//! Build-related API endpoints

use argo_core::cancel::CancelToken;
use argo_core::domain::build_config::BuildConfig;
use argo_core::domain::build_run::BuildRun;
use argo_core::domain::secret::BuildSecret;
use argo_core::dto::callback::CallbackPayload;
use argo_core::dto::secrets::BuildSecretsResponse;
use tracing::{debug, error};

use crate::ControlPlaneClient;
use crate::error::Result;

impl ControlPlaneClient {
    // =============================================================================
    // Build Runs
    // =============================================================================

    /// Get a build run by ID
    ///
    /// # Arguments
    /// * `build_run_id` - The build run identifier
    /// * `cancel` - Aborts the request (and any pending retry) when triggered
    ///
    /// # Returns
    /// The build run details
    pub async fn fetch_build_run_info(
        &self,
        build_run_id: &str,
        cancel: &CancelToken,
    ) -> Result<BuildRun> {
        self.get_json(&format!("/api/v1/build/run/{}", build_run_id), cancel)
            .await
    }

    /// Report the terminal state of a build run
    ///
    /// Sent exactly once, without retry and without cancellation: a replayed
    /// or abandoned callback could leave the run in the wrong state. Any 2xx
    /// response counts as acknowledgement, whatever its body.
    ///
    /// # Arguments
    /// * `build_run_id` - The build run identifier
    /// * `payload` - Final status, image and tag
    pub async fn build_run_callback(
        &self,
        build_run_id: &str,
        payload: &CallbackPayload,
    ) -> Result<()> {
        let url = self.url(&format!("/api/v1/build/run/{}/callback", build_run_id));
        debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(&url))
            .json(payload)
            .send()
            .await
            .inspect_err(|e| error!("Could not send run callback: {}", e))?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Build Configurations
    // =============================================================================

    /// Get a build configuration by ID
    ///
    /// # Arguments
    /// * `build_id` - The build configuration identifier
    ///
    /// # Returns
    /// The build recipe (Dockerfile location, image name, registry)
    pub async fn fetch_build_info(
        &self,
        build_id: &str,
        cancel: &CancelToken,
    ) -> Result<BuildConfig> {
        self.get_json(&format!("/api/v1/build/{}", build_id), cancel)
            .await
    }

    /// Get the build-time secrets of a build configuration
    ///
    /// # Arguments
    /// * `build_config_id` - The build configuration identifier
    ///
    /// # Returns
    /// Secrets in the order the control plane lists them; an empty list is
    /// a valid answer
    pub async fn fetch_build_time_secrets(
        &self,
        build_config_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<BuildSecret>> {
        let response: BuildSecretsResponse = self
            .get_json(&format!("/api/v1/build/{}/secrets", build_config_id), cancel)
            .await?;

        Ok(response.into_secrets())
    }
}
