//! Build engine
//!
//! Builds the image from a context directory and Dockerfile and pushes it
//! to the registry in one blocking call. The default implementation drives
//! `docker buildx build --push`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use argo_core::cancel::CancelToken;
use argo_core::domain::secret::BuildSecret;
use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{error, info, warn};

use super::{combined_output, output_tail};

/// Service trait for building and publishing an image
#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Builds `request` and pushes it; returns once the push finished or failed
    async fn build_and_publish(
        &self,
        request: &BuildRequest,
        cancel: &CancelToken,
    ) -> Result<PublishedImage, EngineError>;
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("build context directory not found: {0}")]
    ContextNotFound(PathBuf),

    #[error("failed to execute '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// `output` is the tail of what the build printed
    #[error("image build failed (exit code {code}): {output}")]
    Failed { code: i32, output: String },

    #[error("image build cancelled")]
    Cancelled,
}

/// A build argument passed to the Dockerfile
#[derive(Clone, PartialEq, Eq)]
pub struct BuildArg {
    pub name: String,
    pub value: String,
}

impl std::fmt::Debug for BuildArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildArg")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Maps build secrets to build arguments, preserving order
pub fn build_args_from_secrets(secrets: &[BuildSecret]) -> Vec<BuildArg> {
    secrets
        .iter()
        .map(|secret| BuildArg {
            name: secret.key.clone(),
            value: secret.value.clone(),
        })
        .collect()
}

/// Everything the engine needs for one build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    /// Build context
    pub context_dir: PathBuf,
    /// Dockerfile, already resolved against the context
    pub dockerfile: PathBuf,
    pub build_args: Vec<BuildArg>,
    /// Image repository, e.g. `registry.example.com/app`
    pub image: String,
    pub tag: String,
    /// Registry reference used as layer cache source and destination
    pub cache_ref: Option<String>,
}

impl BuildRequest {
    /// Full `<image>:<tag>` reference pushed by the build
    pub fn target(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }
}

/// Result of a successful push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedImage {
    /// Pushed reference, by digest when the engine reports one
    pub reference: String,
}

/// Build engine backed by a docker-compatible CLI with buildx
#[derive(Debug, Clone)]
pub struct DockerBuildEngine {
    program: String,
}

/// Variables the CLI itself reads; build args with these names are passed
/// inline so they cannot change how the CLI behaves
const CLI_ENV: &[&str] = &[
    "PATH",
    "HOME",
    "TMPDIR",
    "USER",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
    "ALL_PROXY",
    "SSL_CERT_FILE",
    "SSL_CERT_DIR",
];

const CLI_ENV_PREFIXES: &[&str] = &["DOCKER_", "BUILDX_", "BUILDKIT_"];

fn is_cli_env(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    CLI_ENV.contains(&upper.as_str())
        || CLI_ENV_PREFIXES
            .iter()
            .any(|prefix| upper.starts_with(prefix))
}

impl DockerBuildEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Assembles the build command
    ///
    /// Build arg values travel through the child environment
    /// (`--build-arg NAME` reads `$NAME`) so secrets stay off the command
    /// line, except for names the CLI needs for itself.
    fn command(&self, request: &BuildRequest, metadata_file: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("buildx")
            .arg("build")
            .arg("--file")
            .arg(&request.dockerfile)
            .arg("--tag")
            .arg(request.target())
            .arg("--push")
            .arg("--metadata-file")
            .arg(metadata_file);

        for arg in &request.build_args {
            if is_cli_env(&arg.name) {
                command
                    .arg("--build-arg")
                    .arg(format!("{}={}", arg.name, arg.value));
            } else {
                command.arg("--build-arg").arg(&arg.name);
                command.env(&arg.name, &arg.value);
            }
        }

        if let Some(cache_ref) = &request.cache_ref {
            command
                .arg("--cache-from")
                .arg(format!("type=registry,ref={}", cache_ref))
                .arg("--cache-to")
                .arg(format!("type=registry,ref={},mode=max", cache_ref));
        }

        command
            .arg(&request.context_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> EngineError {
        EngineError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

/// Reads the pushed digest from a buildx metadata file
async fn read_pushed_digest(metadata_file: &Path) -> Option<String> {
    let contents = tokio::fs::read_to_string(metadata_file).await.ok()?;
    let metadata: serde_json::Value = serde_json::from_str(&contents).ok()?;
    metadata
        .get("containerimage.digest")
        .and_then(|digest| digest.as_str())
        .map(str::to_string)
}

#[async_trait]
impl BuildEngine for DockerBuildEngine {
    async fn build_and_publish(
        &self,
        request: &BuildRequest,
        cancel: &CancelToken,
    ) -> Result<PublishedImage, EngineError> {
        if !request.context_dir.is_dir() {
            return Err(EngineError::ContextNotFound(request.context_dir.clone()));
        }

        let metadata_dir = tempfile::tempdir().map_err(|e| self.spawn_error(e))?;
        let metadata_file = metadata_dir.path().join("metadata.json");

        info!(
            "Building {} from {} ({} build arg(s))",
            request.target(),
            request.dockerfile.display(),
            request.build_args.len()
        );

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            output = self.command(request, &metadata_file).output() => {
                output.map_err(|e| self.spawn_error(e))?
            }
        };

        let text = combined_output(&output);
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            info!("Build output:\n{}", text);
            error!("Image build failed with exit code {}", code);
            return Err(EngineError::Failed {
                code,
                output: output_tail(&text),
            });
        }

        info!("Build output:\n{}", text);

        let reference = match read_pushed_digest(&metadata_file).await {
            Some(digest) => format!("{}@{}", request.image, digest),
            None => {
                warn!("Build metadata has no digest, reporting tag reference");
                request.target()
            }
        };

        info!("Published image to {}", reference);
        Ok(PublishedImage { reference })
    }
}
