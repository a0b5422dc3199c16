//! Error types for the Argo client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the control plane or identity service
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credential exchange failed; the client cannot be constructed
    #[error("authentication error: {0}")]
    Auth(String),

    /// The request could not be completed (connect, DNS, TLS, timeout)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("error status from server (status {status}): {body}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The response body could not be decoded into the expected type
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The run was cancelled while the request was in flight
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    /// Create a server error from status code and body
    pub fn server(status: u16, body: impl Into<String>) -> Self {
        Self::Server {
            status,
            body: body.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Server { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Server { status, .. } if (400..500).contains(status))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { status, .. } if *status >= 500)
    }

    /// Check if the failure happened below HTTP and may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(e) if !e.is_builder())
    }
}
