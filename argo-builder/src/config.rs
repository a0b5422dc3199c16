//! Build task configuration
//!
//! Everything comes from the command line, and every option except the two
//! positional arguments can also be set through the environment, which is
//! how CI schedulers usually hand it over.

use std::path::PathBuf;
use std::time::Duration;

use argo_client::{ClientSettings, Credentials, RetryPolicy};
use clap::{ArgAction, Parser};

use crate::error::RunError;
use crate::orchestrator::RunOptions;

/// Default identity service for API-key exchange
pub const DEFAULT_IDENTITY_URL: &str = "https://argonaut-pp.frontegg.com";

/// Read retries after the first attempt
const READ_RETRIES: u32 = 2;

#[derive(Parser)]
#[command(name = "argo-builder")]
#[command(about = "Builds and publishes the image for an Argo build run", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Build run to execute
    pub build_run_id: String,

    /// Local checkout of the repository to build
    pub repo_path: PathBuf,

    /// API key exchanged for an access token
    #[arg(long, env = "ARG_AUTH_KEY")]
    pub api_key: Option<String>,

    /// API secret exchanged for an access token
    #[arg(long, env = "ARG_AUTH_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Pre-formatted bearer token; skips the API-key exchange
    #[arg(long, env = "ARG_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Control-plane URL
    #[arg(long, env = "ARG_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Identity service URL
    #[arg(long, env = "ARG_IDENTITY_URL", default_value = DEFAULT_IDENTITY_URL)]
    pub identity_url: String,

    /// Short commit id the image tag is derived from
    #[arg(long, env = "SHORT_SHA")]
    pub short_sha: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "ARG_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Delay between retried control-plane reads, in milliseconds
    #[arg(long, env = "ARG_RETRY_WAIT_MS", default_value_t = 1000)]
    pub retry_wait_ms: u64,

    /// Container CLI used for registry login and image builds
    #[arg(long, env = "ARG_CONTAINER_CLI", default_value = "docker")]
    pub container_cli: String,

    /// Use the registry layer cache (`<image>:argo-cache`)
    #[arg(long, env = "ARG_REGISTRY_CACHE", default_value_t = true, action = ArgAction::Set)]
    pub registry_cache: bool,
}

/// Build task configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub build_run_id: String,
    pub repo_path: PathBuf,
    /// `None` when neither a token nor a complete key/secret pair was given
    pub credentials: Option<Credentials>,
    pub api_url: String,
    pub identity_url: String,
    pub short_sha: Option<String>,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    pub container_cli: String,
    pub registry_cache: bool,
}

impl Config {
    /// Builds the configuration from parsed arguments
    ///
    /// A bearer token wins over an API key pair when both are present.
    pub fn from_cli(cli: Cli) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let credentials = match (
            non_empty(cli.auth_token),
            non_empty(cli.api_key),
            non_empty(cli.api_secret),
        ) {
            (Some(token), _, _) => Some(Credentials::Token(token)),
            (None, Some(key), Some(secret)) => Some(Credentials::ApiKey { key, secret }),
            _ => None,
        };

        Self {
            build_run_id: cli.build_run_id,
            repo_path: cli.repo_path,
            credentials,
            api_url: cli.api_url.trim_end_matches('/').to_string(),
            identity_url: cli.identity_url.trim_end_matches('/').to_string(),
            short_sha: cli.short_sha,
            http_timeout: Duration::from_secs(cli.http_timeout_secs),
            retry: RetryPolicy::fixed(READ_RETRIES, Duration::from_millis(cli.retry_wait_ms)),
            container_cli: cli.container_cli,
            registry_cache: cli.registry_cache,
        }
    }

    /// Validates the configuration
    ///
    /// Runs before the control-plane client exists, so a failure here is
    /// never reported to the control plane.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.build_run_id.trim().is_empty() {
            return Err(RunError::configuration("build run id cannot be empty"));
        }

        for (name, url) in [("api_url", &self.api_url), ("identity_url", &self.identity_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RunError::configuration(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }

        if !self.repo_path.is_dir() {
            return Err(RunError::configuration(format!(
                "repository path {} is not a directory",
                self.repo_path.display()
            )));
        }

        if self.http_timeout.is_zero() {
            return Err(RunError::configuration(
                "http timeout must be greater than 0",
            ));
        }

        if self.container_cli.trim().is_empty() {
            return Err(RunError::configuration("container CLI cannot be empty"));
        }

        if self.credentials.is_none() {
            return Err(RunError::configuration(
                "either ARG_AUTH_TOKEN or both ARG_AUTH_KEY and ARG_AUTH_SECRET must be set",
            ));
        }

        Ok(())
    }

    /// Settings for [`argo_client::ControlPlaneClient::connect`]
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            timeout: self.http_timeout,
            retry: self.retry,
            ..ClientSettings::new(&self.api_url, &self.identity_url)
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            repo_path: self.repo_path.clone(),
            short_sha: self.short_sha.clone(),
            registry_cache: self.registry_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_VARS: [&str; 10] = [
        "ARG_AUTH_KEY",
        "ARG_AUTH_SECRET",
        "ARG_AUTH_TOKEN",
        "ARG_API_URL",
        "ARG_IDENTITY_URL",
        "SHORT_SHA",
        "ARG_HTTP_TIMEOUT_SECS",
        "ARG_RETRY_WAIT_MS",
        "ARG_CONTAINER_CLI",
        "ARG_REGISTRY_CACHE",
    ];

    /// Parses `args` with exactly the given variables set
    fn parse(args: &[&str], vars: &[(&str, &str)]) -> Result<Config, clap::Error> {
        let mut env: Vec<(&str, Option<&str>)> =
            ENV_VARS.iter().map(|name| (*name, None)).collect();
        for &(name, value) in vars {
            env.retain(|(n, _)| *n != name);
            env.push((name, Some(value)));
        }

        temp_env::with_vars(env, || {
            let argv = std::iter::once("argo-builder").chain(args.iter().copied());
            Cli::try_parse_from(argv).map(Config::from_cli)
        })
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["run-1", "/repo"], &[]).unwrap();

        assert_eq!(config.build_run_id, "run-1");
        assert_eq!(config.repo_path, PathBuf::from("/repo"));
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.identity_url, DEFAULT_IDENTITY_URL);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.retry, RetryPolicy::fixed(2, Duration::from_secs(1)));
        assert_eq!(config.container_cli, "docker");
        assert!(config.registry_cache);
        assert_eq!(config.short_sha, None);
        assert_eq!(config.credentials, None);
    }

    #[test]
    fn test_environment_overrides() {
        let config = parse(
            &["run-1", "/repo"],
            &[
                ("ARG_AUTH_KEY", "key"),
                ("ARG_AUTH_SECRET", "secret"),
                ("ARG_API_URL", "https://api.example.com/"),
                ("SHORT_SHA", "abc1234"),
                ("ARG_HTTP_TIMEOUT_SECS", "5"),
                ("ARG_RETRY_WAIT_MS", "250"),
                ("ARG_CONTAINER_CLI", "podman"),
                ("ARG_REGISTRY_CACHE", "false"),
            ],
        )
        .unwrap();

        assert_eq!(
            config.credentials,
            Some(Credentials::ApiKey {
                key: "key".to_string(),
                secret: "secret".to_string()
            })
        );
        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.short_sha.as_deref(), Some("abc1234"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.retry.wait, Duration::from_millis(250));
        assert_eq!(config.container_cli, "podman");
        assert!(!config.registry_cache);
    }

    #[test]
    fn test_flags_win_over_environment() {
        let config = parse(
            &["run-1", "/repo", "--api-url", "http://flag:9000"],
            &[("ARG_API_URL", "http://env:9000")],
        )
        .unwrap();

        assert_eq!(config.api_url, "http://flag:9000");
    }

    #[test]
    fn test_token_wins_over_key_pair() {
        let config = parse(
            &["run-1", "/repo"],
            &[
                ("ARG_AUTH_TOKEN", "Bearer abc"),
                ("ARG_AUTH_KEY", "key"),
                ("ARG_AUTH_SECRET", "secret"),
            ],
        )
        .unwrap();

        assert_eq!(
            config.credentials,
            Some(Credentials::Token("Bearer abc".to_string()))
        );
    }

    #[test]
    fn test_incomplete_key_pair_has_no_credentials() {
        let config = parse(&["run-1", "/repo"], &[("ARG_AUTH_KEY", "key")]).unwrap();
        assert_eq!(config.credentials, None);
    }

    #[test]
    fn test_missing_positional_arguments_fail() {
        assert!(parse(&["run-1"], &[]).is_err());
    }

    #[test]
    fn test_validation() {
        let repo = tempfile::tempdir().unwrap();
        let repo_path = repo.path().to_str().unwrap();
        let mut config = parse(&["run-1", repo_path], &[("ARG_AUTH_TOKEN", "t")]).unwrap();

        // Valid config should pass
        assert!(config.validate().is_ok());

        config.credentials = None;
        assert!(matches!(config.validate(), Err(RunError::Configuration(_))));
        config.credentials = Some(Credentials::Token("t".to_string()));

        config.api_url = "localhost:8080".to_string();
        assert!(config.validate().is_err());
        config.api_url = "http://localhost:8080".to_string();

        config.http_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.http_timeout = Duration::from_secs(1);

        config.repo_path = repo.path().join("missing");
        assert!(config.validate().is_err());
        config.repo_path = repo.path().to_path_buf();

        config.build_run_id = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_short_sha_is_not_a_configuration_error() {
        let repo = tempfile::tempdir().unwrap();
        let repo_path = repo.path().to_str().unwrap();
        let config = parse(&["run-1", repo_path], &[("ARG_AUTH_TOKEN", "t")]).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.run_options().short_sha, None);
    }

    #[test]
    fn test_client_settings() {
        let config = parse(
            &["run-1", "/repo", "--http-timeout-secs", "7"],
            &[("ARG_IDENTITY_URL", "https://id.example.com")],
        )
        .unwrap();

        let settings = config.client_settings();
        assert_eq!(settings.api_url, "http://localhost:8080");
        assert_eq!(settings.identity_url, "https://id.example.com");
        assert_eq!(settings.timeout, Duration::from_secs(7));
        assert_eq!(settings.retry.max_retries, 2);
    }
}
