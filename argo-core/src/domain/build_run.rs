//! Build run domain types

use serde::{Deserialize, Serialize};

/// A single execution of a build configuration
///
/// Created by the control plane before the task starts and mutated only
/// through the run callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRun {
    pub id: String,
    pub build_config_id: String,
    pub status: BuildRunStatus,
    #[serde(default, deserialize_with = "crate::domain::null_as_default")]
    pub ci_ref: String,
    #[serde(default, deserialize_with = "crate::domain::null_as_default")]
    pub artifactory_type: ArtifactoryType,
    #[serde(default, deserialize_with = "crate::domain::null_as_default")]
    pub artifactory_id: String,
    #[serde(default, deserialize_with = "crate::domain::null_as_default")]
    pub repo_meta: RepoMeta,
    #[serde(default, deserialize_with = "crate::domain::null_as_default")]
    pub binary_output: BinaryOutput,
    #[serde(default, deserialize_with = "crate::domain::null_as_default")]
    pub organization_id: String,
}

/// Build run status as tracked by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildRunStatus {
    Requested,
    Triggered,
    Running,
    Canceled,
    Failed,
    Completed,
}

impl BuildRunStatus {
    /// Whether the run can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

/// Kind of artifact store a run publishes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactoryType {
    /// Container registry; also what an empty value means
    #[default]
    #[serde(alias = "")]
    Cr,
    /// Any kind this runner does not know about
    #[serde(other)]
    Unknown,
}

/// Source revision the run was triggered for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoMeta {
    pub branch: String,
    pub commit_sha: String,
    pub message: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryOutput {
    pub name: String,
    pub tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_build_run() {
        let run: BuildRun = serde_json::from_value(serde_json::json!({
            "id": "run-1",
            "build_config_id": "cfg-1",
            "status": "running",
            "ci_ref": "ci-42",
            "artifactory_type": "cr",
            "artifactory_id": "reg-1",
            "repo_meta": { "branch": "main", "commit_sha": "abc1234" },
            "organization_id": "org-1"
        }))
        .unwrap();

        assert_eq!(run.build_config_id, "cfg-1");
        assert_eq!(run.status, BuildRunStatus::Running);
        assert_eq!(run.repo_meta.commit_sha, "abc1234");
        assert_eq!(run.repo_meta.message, "");
        assert_eq!(run.binary_output, BinaryOutput::default());
    }

    #[test]
    fn test_decode_build_run_with_zero_values() {
        let run: BuildRun = serde_json::from_value(serde_json::json!({
            "id": "run-1",
            "build_config_id": "cfg-1",
            "status": "triggered",
            "ci_ref": null,
            "artifactory_type": "",
            "artifactory_id": "reg-1",
            "repo_meta": null,
            "binary_output": null,
            "organization_id": null
        }))
        .unwrap();

        assert_eq!(run.artifactory_type, ArtifactoryType::Cr);
        assert_eq!(run.repo_meta, RepoMeta::default());
        assert_eq!(run.binary_output, BinaryOutput::default());
        assert_eq!(run.ci_ref, "");
    }

    #[test]
    fn test_unknown_artifactory_type_is_accepted() {
        let run: BuildRun = serde_json::from_value(serde_json::json!({
            "id": "run-1",
            "build_config_id": "cfg-1",
            "status": "running",
            "artifactory_type": "helm"
        }))
        .unwrap();

        assert_eq!(run.artifactory_type, ArtifactoryType::Unknown);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&BuildRunStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(
            serde_json::from_str::<BuildRunStatus>("\"canceled\"").unwrap(),
            BuildRunStatus::Canceled
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(BuildRunStatus::Completed.is_terminal());
        assert!(BuildRunStatus::Failed.is_terminal());
        assert!(BuildRunStatus::Canceled.is_terminal());
        assert!(!BuildRunStatus::Requested.is_terminal());
        assert!(!BuildRunStatus::Running.is_terminal());
    }
}
