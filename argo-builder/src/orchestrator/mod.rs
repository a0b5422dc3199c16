//! Build orchestrator
//!
//! Drives one build run end to end: fetch run, fetch config, fetch secrets,
//! fetch registry access, log in to the registry, build and publish. Whatever
//! happens along the way, exactly one terminal callback is reported to the
//! control plane when the run ends.

mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use argo_client::ControlPlane;
use argo_core::cancel::CancelToken;
use argo_core::domain::build_config::{BuildConfig, BuildType, OciBuildDetails};
use argo_core::dto::callback::CallbackPayload;
use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

pub use state::{BuildState, StateMachine};

use crate::error::RunError;
use crate::service::{
    BuildEngine, BuildRequest, LoginError, RegistryLogin, build_args_from_secrets,
};

/// Tag suffix of the registry layer cache image
const CACHE_TAG: &str = "argo-cache";

const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Per-run inputs that do not come from the control plane
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Local checkout of the repository being built
    pub repo_path: PathBuf,
    /// Short commit id the image tag is derived from
    pub short_sha: Option<String>,
    /// Use `<image>:argo-cache` as registry layer cache
    pub registry_cache: bool,
}

/// What a successful run published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedBuild {
    /// Image repository, e.g. `registry.example.com/team/app`
    pub image: String,
    pub tag: String,
    /// Reference reported by the build engine (digest when available)
    pub reference: String,
}

/// Derives the image tag for a run
///
/// `<short_sha>-<MMDDHHMMSS>`: repeated runs of the same commit get
/// distinct tags.
pub fn image_tag(short_sha: &str, at: NaiveDateTime) -> String {
    format!("{}-{}", short_sha, at.format("%m%d%H%M%S"))
}

pub struct BuildOrchestrator {
    control_plane: Arc<dyn ControlPlane>,
    registry_login: Arc<dyn RegistryLogin>,
    engine: Arc<dyn BuildEngine>,
    options: RunOptions,
    state: StateMachine,
}

impl BuildOrchestrator {
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        registry_login: Arc<dyn RegistryLogin>,
        engine: Arc<dyn BuildEngine>,
        options: RunOptions,
    ) -> Self {
        Self {
            control_plane,
            registry_login,
            engine,
            options,
            state: StateMachine::new(),
        }
    }

    /// State reached so far
    #[allow(dead_code)]
    pub fn state(&self) -> &StateMachine {
        &self.state
    }

    /// Executes the build run and reports its terminal status
    ///
    /// The callback is sent exactly once, after the pipeline has finished or
    /// failed at any step. A failed callback is logged and does not change
    /// the returned result.
    ///
    /// # Arguments
    /// * `build_run_id` - Run to execute
    /// * `cancel` - Interrupts in-flight control-plane calls, login and build
    ///
    /// # Returns
    /// The published image, or the error that ended the run
    pub async fn run(
        &mut self,
        build_run_id: &str,
        cancel: &CancelToken,
    ) -> Result<PublishedBuild, RunError> {
        info!("Build task started for run {}", build_run_id);

        let mut payload = CallbackPayload::failed();
        let result = self.execute(build_run_id, cancel).await;

        match &result {
            Ok(published) => {
                self.state.transition(BuildState::Completed);
                payload.complete(&published.image, &published.tag);
                info!("Build run {} completed: {}", build_run_id, published.reference);
            }
            Err(e) => {
                let failed_in = self.state.current();
                self.state.transition(BuildState::Failed);
                payload.fail(e.to_string());
                error!(
                    "Build run {} failed while {}: {}",
                    build_run_id,
                    failed_in,
                    payload.error.as_deref().unwrap_or_default()
                );
                debug!("States visited: {:?}", self.state.history());
            }
        }
        debug_assert_eq!(payload.status, self.state.current().run_status());

        self.report(build_run_id, &payload).await;
        result
    }

    /// Sends the terminal callback; failures are only logged
    async fn report(&self, build_run_id: &str, payload: &CallbackPayload) {
        debug!(
            "Reporting status {:?} for build run {}",
            payload.status, build_run_id
        );

        match self
            .control_plane
            .build_run_callback(build_run_id, payload)
            .await
        {
            Ok(()) => info!(
                "Reported status {:?} for build run {}",
                payload.status, build_run_id
            ),
            Err(e) => error!(
                "Failed to report status {:?} for build run {}: {}",
                payload.status, build_run_id, e
            ),
        }
    }

    async fn execute(
        &mut self,
        build_run_id: &str,
        cancel: &CancelToken,
    ) -> Result<PublishedBuild, RunError> {
        let short_sha = self
            .options
            .short_sha
            .as_deref()
            .map(str::trim)
            .filter(|sha| !sha.is_empty())
            .ok_or_else(|| {
                RunError::configuration("SHORT_SHA is not set, image tag not generated")
            })?;
        let tag = image_tag(short_sha, chrono::Local::now().naive_local());
        info!("Image tag for short sha {}: {}", short_sha, tag);

        // =====================================================================
        // Control-plane reads
        // =====================================================================

        self.state.transition(BuildState::FetchingRun);
        let run = self
            .control_plane
            .fetch_build_run_info(build_run_id, cancel)
            .await?;
        if run.status.is_terminal() {
            warn!(
                "Build run {} is already {:?}, building anyway",
                build_run_id, run.status
            );
        }
        debug!("Fetched build run: {:?}", run);

        self.state.transition(BuildState::FetchingConfig);
        let config = self
            .control_plane
            .fetch_build_info(&run.build_config_id, cancel)
            .await?;
        let details = buildable_details(&config)?;
        info!("Fetched build config {} ({})", config.id, config.name);

        self.state.transition(BuildState::FetchingSecrets);
        let secrets = self
            .control_plane
            .fetch_build_time_secrets(&config.id, cancel)
            .await?;
        info!("Fetched {} build secret(s)", secrets.len());

        self.state.transition(BuildState::FetchingRegistryAccess);
        let registry_id = if config.artifactory_id.is_empty() {
            &run.artifactory_id
        } else {
            &config.artifactory_id
        };
        if registry_id.is_empty() {
            return Err(RunError::configuration(
                "build config has no target registry",
            ));
        }
        let access = self
            .control_plane
            .fetch_container_registry_access(registry_id, cancel)
            .await?;
        if access.is_expired() {
            warn!("Registry access for {} has already expired", registry_id);
        }
        let image = access.image_repository(&config.name);
        info!("Target image repository: {}", image);

        // =====================================================================
        // Registry login and build
        // =====================================================================

        self.state.transition(BuildState::AuthenticatingRegistry);
        let (username, password) = access
            .login_credentials()
            .ok_or(LoginError::MissingCredentials)?;
        self.registry_login
            .login(access.server(), &username, &password, cancel)
            .await?;

        self.state.transition(BuildState::Building);
        let context_dir = resolve_under(&self.options.repo_path, &details.working_dir);
        let dockerfile = if details.docker_file_path.trim().is_empty() {
            context_dir.join(DEFAULT_DOCKERFILE)
        } else {
            resolve_under(&context_dir, &details.docker_file_path)
        };
        let cache_ref = self
            .options
            .registry_cache
            .then(|| format!("{}:{}", image, CACHE_TAG));

        let request = BuildRequest {
            context_dir,
            dockerfile,
            build_args: build_args_from_secrets(&secrets),
            image: image.clone(),
            tag: tag.clone(),
            cache_ref,
        };
        let published = self.engine.build_and_publish(&request, cancel).await?;

        Ok(PublishedBuild {
            image,
            tag,
            reference: published.reference,
        })
    }
}

/// Checks that the recipe is a Dockerfile build and returns its details
fn buildable_details(config: &BuildConfig) -> Result<&OciBuildDetails, RunError> {
    if config.build_type != BuildType::Docker {
        return Err(RunError::configuration(format!(
            "build type '{}' is not supported",
            config.build_type
        )));
    }

    config.oci_details().ok_or_else(|| {
        RunError::configuration(format!(
            "build config {} has no OCI build details",
            config.id
        ))
    })
}

/// Joins a path from the build recipe under `base`; recipe paths are
/// relative even when written with a leading slash
fn resolve_under(base: &Path, relative: &str) -> PathBuf {
    let relative = relative.trim().trim_start_matches('/');
    if relative.is_empty() || relative == "." {
        base.to_path_buf()
    } else {
        base.join(relative)
    }
}
