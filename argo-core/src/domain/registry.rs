//! Container registry access
//!
//! A [`RegistryAccess`] is a short-lived credential lease for pushing one
//! image to one registry. It lives in process memory only and its secrets
//! are redacted from `Debug` output.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credential lease returned by the control plane for a registry
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryAccess {
    pub username: String,
    pub password: String,
    /// HTTP Basic authorization value, used when username/password are empty
    pub authorization: Option<String>,
    /// Registry endpoint, e.g. `https://registry.example.com`
    pub url: String,
    /// Registry endpoint including a repository prefix, e.g.
    /// `https://us-docker.pkg.dev/project/images`
    pub url_with_prefix: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl RegistryAccess {
    /// Registry host used for login, without scheme
    pub fn server(&self) -> &str {
        strip_scheme(&self.url)
    }

    /// Repository base that image names are appended to
    pub fn repository_base(&self) -> &str {
        let base = self
            .url_with_prefix
            .as_deref()
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or(&self.url);
        strip_scheme(base)
    }

    /// Composes `<registry host>/<name>` for an image
    pub fn image_repository(&self, name: &str) -> String {
        compose_image_reference(self.repository_base(), name)
    }

    /// Username/password pair to log in with
    ///
    /// Falls back to decoding the Basic `authorization` value when the
    /// explicit pair is absent.
    pub fn login_credentials(&self) -> Option<(String, String)> {
        if !self.username.is_empty() && !self.password.is_empty() {
            return Some((self.username.clone(), self.password.clone()));
        }

        self.authorization.as_deref().and_then(parse_basic_auth)
    }

    /// Whether the lease has already expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

impl std::fmt::Debug for RegistryAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryAccess")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "<redacted>"),
            )
            .field("url", &self.url)
            .field("url_with_prefix", &self.url_with_prefix)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Removes a leading `https://` or `http://` and any trailing slash
pub fn strip_scheme(url: &str) -> &str {
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    url.trim_end_matches('/')
}

/// Joins a registry location and an image name into a repository reference
pub fn compose_image_reference(registry: &str, name: &str) -> String {
    format!("{}/{}", strip_scheme(registry), name.trim_start_matches('/'))
}

/// Parses an HTTP Basic authorization value into `(username, password)`
///
/// `"Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="` yields `("Aladdin", "open sesame")`.
pub fn parse_basic_auth(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
