//! Shared helpers for client integration tests
//!
//! Each test builds an axum router standing in for the control plane (and,
//! when needed, the identity service) and serves it on an ephemeral port.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use argo_client::{AccessToken, ControlPlaneClient, RetryPolicy};
use axum::Router;

/// Per-request timeout used by test clients
pub const CLIENT_TIMEOUT: Duration = Duration::from_millis(300);

/// How long a "hanging" handler sleeps; comfortably above `CLIENT_TIMEOUT`
pub const HANG: Duration = Duration::from_secs(3);

pub const TEST_TOKEN: &str = "test-token";

/// Serves `router` on 127.0.0.1 and returns its base URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve test router");
    });

    format!("http://{}", addr)
}

/// Returns a base URL nothing is listening on
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);
    format!("http://{}", addr)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(CLIENT_TIMEOUT)
        .build()
        .expect("build reqwest client")
}

/// Client with a short timeout and a fast two-retry policy
pub fn test_client(base_url: &str) -> ControlPlaneClient {
    ControlPlaneClient::with_client(base_url, http_client(), AccessToken::bearer(TEST_TOKEN))
        .with_retry_policy(RetryPolicy::fixed(2, Duration::from_millis(10)))
}

/// Counts requests reaching a handler
#[derive(Debug, Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    /// Records a request and returns its 1-based sequence number
    pub fn record(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Stores request bodies seen by a handler
#[derive(Debug, Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<serde_json::Value>>>);

impl Captured {
    pub fn push(&self, body: serde_json::Value) {
        self.0.lock().unwrap().push(body);
    }

    pub fn all(&self) -> Vec<serde_json::Value> {
        self.0.lock().unwrap().clone()
    }
}

pub fn build_run_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "build_config_id": "cfg-1",
        "status": "running",
        "ci_ref": "ci-1",
        "artifactory_type": "cr",
        "artifactory_id": "reg-1",
        "repo_meta": { "branch": "main", "commit_sha": "abc1234def" },
        "organization_id": "org-1"
    })
}
