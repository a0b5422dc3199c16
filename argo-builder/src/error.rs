//! Build run errors

use argo_client::ClientError;
use thiserror::Error;

use crate::service::{EngineError, LoginError};

/// Errors that end a build run
///
/// Every variant is reported to the control plane as a `failed` run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Missing or unusable input (environment, build recipe)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A control-plane read failed after the client's own retries
    #[error(transparent)]
    ControlPlane(#[from] ClientError),

    /// Logging in to the target registry failed
    #[error(transparent)]
    RegistryLogin(#[from] LoginError),

    /// The build engine failed to build or publish the image
    #[error(transparent)]
    Build(#[from] EngineError),
}

impl RunError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
