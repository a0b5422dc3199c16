//! Registry login
//!
//! Authenticates the container CLI against the target registry before the
//! image is pushed. The password is written to the CLI's stdin so it never
//! shows up in the process list.

use std::process::Stdio;

use argo_core::cancel::CancelToken;
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::{combined_output, output_tail};

/// Service trait for logging in to a container registry
#[async_trait]
pub trait RegistryLogin: Send + Sync {
    /// Logs in to `server` (host without scheme)
    async fn login(
        &self,
        server: &str,
        username: &str,
        password: &str,
        cancel: &CancelToken,
    ) -> Result<(), LoginError>;
}

#[derive(Debug, Error)]
pub enum LoginError {
    /// The registry lease carries neither a username/password pair nor a
    /// usable Basic authorization value
    #[error("registry access has no usable credentials")]
    MissingCredentials,

    #[error("failed to execute '{program} login': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to pass the registry password to '{program} login': {source}")]
    PasswordInput {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The login command failed; carries the tail of its output verbatim
    #[error("{0}")]
    Rejected(String),

    #[error("registry login cancelled")]
    Cancelled,
}

/// Logs in through a docker-compatible CLI (`docker login`, `podman login`)
#[derive(Debug, Clone)]
pub struct CliRegistryLogin {
    program: String,
}

impl CliRegistryLogin {
    /// Creates a login service driving `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, server: &str, username: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("login")
            .arg("--username")
            .arg(username)
            .arg("--password-stdin")
            .arg(server)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> LoginError {
        LoginError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl RegistryLogin for CliRegistryLogin {
    async fn login(
        &self,
        server: &str,
        username: &str,
        password: &str,
        cancel: &CancelToken,
    ) -> Result<(), LoginError> {
        info!("Logging in to registry {} as {}", server, username);

        let mut child = self
            .command(server, username)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // stdin is closed on drop so the CLI sees EOF. A CLI that exits
        // without reading it is judged by its exit status instead.
        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(password.as_bytes()).await
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(LoginError::PasswordInput {
                program: self.program.clone(),
                source: e,
            });
        }

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LoginError::Cancelled),
            output = child.wait_with_output() => output.map_err(|e| self.spawn_error(e))?,
        };

        let text = combined_output(&output);
        if !output.status.success() {
            error!("Registry login failed: {}", text);
            return Err(LoginError::Rejected(output_tail(&text)));
        }

        debug!("Registry login output: {}", text);
        info!("Registry login complete for {}", server);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_command_keeps_password_off_argv() {
        let login = CliRegistryLogin::new("docker");
        let command = login.command("registry.example.com", "robot");
        let args: Vec<_> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(command.as_std().get_program(), "docker");
        assert_eq!(
            args,
            vec![
                "login",
                "--username",
                "robot",
                "--password-stdin",
                "registry.example.com"
            ]
        );
    }

    #[test]
    fn test_password_input_error_names_the_step() {
        let err = LoginError::PasswordInput {
            program: "docker".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::WriteZero),
        };

        let message = err.to_string();
        assert!(message.starts_with("failed to pass the registry password to 'docker login'"));
        assert!(!message.contains("failed to execute"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let login = CliRegistryLogin::new("argo-definitely-not-installed");
        let err = login
            .login("registry.example.com", "robot", "pw", &CancelToken::never())
            .await
            .unwrap_err();

        assert!(matches!(err, LoginError::Spawn { .. }), "got {err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_login_is_rejected() {
        // `false` ignores its arguments and exits 1
        let login = CliRegistryLogin::new("false");
        let err = login
            .login("registry.example.com", "robot", "pw", &CancelToken::never())
            .await
            .unwrap_err();

        assert!(matches!(err, LoginError::Rejected(_)), "got {err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_login() {
        let login = CliRegistryLogin::new("true");
        login
            .login("registry.example.com", "robot", "pw", &CancelToken::never())
            .await
            .unwrap();
    }
}
