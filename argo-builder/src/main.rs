//! Argo Builder
//!
//! Executes a single Argo build run inside a CI job: authenticates against
//! the control plane, fetches the build recipe, its secrets and registry
//! credentials, builds and pushes the image, and reports the outcome.
//!
//! Architecture:
//! - Configuration: command-line arguments with environment fallbacks
//! - Services: registry login and image build through the container CLI
//! - Orchestrator: the build run state machine and its terminal callback
//!
//! Exits non-zero when the run fails; the control plane has already been
//! told by then.

mod config;
mod error;
mod orchestrator;
mod service;
mod signal;

use std::sync::Arc;

use anyhow::{Context, Result};
use argo_client::{ControlPlane, ControlPlaneClient};
use argo_core::cancel::cancel_pair;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Cli, Config};
use crate::orchestrator::BuildOrchestrator;
use crate::service::{BuildEngine, CliRegistryLogin, DockerBuildEngine, RegistryLogin};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "argo_builder=info,argo_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_cli(Cli::parse());
    config.validate()?;
    info!(
        "Loaded configuration: build_run_id={}, repo_path={}, api_url={}",
        config.build_run_id,
        config.repo_path.display(),
        config.api_url
    );

    let (cancel_handle, cancel) = cancel_pair();
    signal::cancel_on_shutdown(cancel_handle);

    // No run identity is reportable until the client exists
    let credentials = config
        .credentials
        .as_ref()
        .context("no control-plane credentials configured")?;
    let client = ControlPlaneClient::connect(&config.client_settings(), credentials, &cancel)
        .await
        .context("Failed to initialize control-plane client")?;

    let control_plane: Arc<dyn ControlPlane> = Arc::new(client);
    let registry_login: Arc<dyn RegistryLogin> =
        Arc::new(CliRegistryLogin::new(config.container_cli.clone()));
    let engine: Arc<dyn BuildEngine> =
        Arc::new(DockerBuildEngine::new(config.container_cli.clone()));

    let mut orchestrator =
        BuildOrchestrator::new(control_plane, registry_login, engine, config.run_options());

    let published = orchestrator
        .run(&config.build_run_id, &cancel)
        .await
        .with_context(|| format!("Build run {} failed", config.build_run_id))?;

    info!("Build process over: {}", published.reference);
    Ok(())
}
