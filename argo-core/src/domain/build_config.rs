//! Build configuration domain types

use serde::{Deserialize, Serialize};

/// Static build recipe owned by the control plane
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub id: String,
    /// Image name inside the target registry
    pub name: String,
    #[serde(default, deserialize_with = "crate::domain::null_as_default")]
    pub repo_id: String,
    #[serde(default, deserialize_with = "crate::domain::null_as_default")]
    pub build_type: BuildType,
    #[serde(default, deserialize_with = "crate::domain::null_as_default")]
    pub details: BuildConfigDetails,
    #[serde(default, deserialize_with = "crate::domain::null_as_default")]
    pub artifactory_id: String,
}

impl BuildConfig {
    /// Returns the OCI build details, if the recipe carries any
    pub fn oci_details(&self) -> Option<&OciBuildDetails> {
        self.details.oci_build_details.as_ref()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    #[default]
    #[serde(alias = "")]
    Docker,
    BuildPack,
    /// Any build type this runner does not know about
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for BuildType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildType::Docker => write!(f, "docker"),
            BuildType::BuildPack => write!(f, "buildpack"),
            BuildType::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfigDetails {
    #[serde(default, deserialize_with = "crate::domain::null_as_default")]
    pub oci_build_details: Option<OciBuildDetails>,
}

/// Dockerfile location within the repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OciBuildDetails {
    /// Dockerfile path, relative to the working directory
    pub docker_file_path: String,
    /// Build context, relative to the repository root
    pub working_dir: String,
}
