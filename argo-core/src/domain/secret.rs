//! Build-time secrets

use serde::{Deserialize, Serialize};

/// A key/value pair injected into the image build as a build argument
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSecret {
    pub key: String,
    pub value: String,
}

impl BuildSecret {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Debug for BuildSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSecret")
            .field("key", &self.key)
            .field("value", &"<redacted>")
            .finish()
    }
}
