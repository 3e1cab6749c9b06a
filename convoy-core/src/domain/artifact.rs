//! Artifact reference types
//!
//! An artifact reference is an immutable, content-addressed pointer to a
//! built, deployable unit (e.g. a container image digest). Two runs with
//! equal digests deploy identical content.

use serde::{Deserialize, Serialize};

/// Content-addressed reference to a deployable artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ArtifactRef {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

/// Resolution result from the artifact builder
///
/// The builder must return a stable content digest for an existing
/// reference; unknown references are rejected at submit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub exists: bool,
    pub digest: Option<String>,
}
