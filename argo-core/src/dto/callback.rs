//! Build run callback DTO

use serde::{Deserialize, Serialize};

use crate::domain::build_run::BuildRunStatus;

/// Longest `error` message sent to the control plane, in bytes
pub const MAX_ERROR_LEN: usize = 8 * 1024;

const TRUNCATED_MARKER: &str = " ... (truncated)";

/// Terminal status report for a build run
///
/// The only write a build task performs against the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub image_tag: Option<String>,
    pub image: Option<String>,
    pub status: BuildRunStatus,
    pub error: Option<String>,
}

impl CallbackPayload {
    /// Payload reported when nothing else has been recorded
    pub fn failed() -> Self {
        Self {
            image_tag: None,
            image: None,
            status: BuildRunStatus::Failed,
            error: None,
        }
    }

    /// Marks the run as completed with the published image
    pub fn complete(&mut self, image: impl Into<String>, image_tag: impl Into<String>) {
        self.image = Some(image.into());
        self.image_tag = Some(image_tag.into());
        self.status = BuildRunStatus::Completed;
        self.error = None;
    }

    /// Marks the run as failed, keeping whatever image was already recorded
    ///
    /// Messages longer than [`MAX_ERROR_LEN`] are cut on a char boundary.
    pub fn fail(&mut self, error: impl Into<String>) {
        let mut error = error.into();
        if error.len() > MAX_ERROR_LEN {
            let mut end = MAX_ERROR_LEN - TRUNCATED_MARKER.len();
            while !error.is_char_boundary(end) {
                end -= 1;
            }
            error.truncate(end);
            error.push_str(TRUNCATED_MARKER);
        }

        self.status = BuildRunStatus::Failed;
        self.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_bounds_error_message() {
        let mut payload = CallbackPayload::failed();
        payload.fail(format!("image build failed: {}", "\u{00e9}".repeat(MAX_ERROR_LEN)));

        let error = payload.error.unwrap();
        assert!(error.len() <= MAX_ERROR_LEN);
        assert!(error.starts_with("image build failed: "));
        assert!(error.ends_with("(truncated)"));
    }

    #[test]
    fn test_fail_keeps_short_message() {
        let mut payload = CallbackPayload::failed();
        payload.fail("boom");
        assert_eq!(payload.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_failed_payload_wire_format() {
        let mut payload = CallbackPayload::failed();
        payload.fail("boom");

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({
                "image_tag": null,
                "image": null,
                "status": "failed",
                "error": "boom"
            })
        );
    }

    #[test]
    fn test_complete_clears_error() {
        let mut payload = CallbackPayload::failed();
        payload.fail("transient");
        payload.complete("registry.example.com/app", "abc1234-1019101500");

        assert_eq!(payload.status, BuildRunStatus::Completed);
        assert_eq!(payload.error, None);
        assert_eq!(payload.image.as_deref(), Some("registry.example.com/app"));
    }
}
