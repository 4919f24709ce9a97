//! Canonical dependency coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured identifier of a binary artifact.
///
/// The `Display` impl below is the only `mvn:` formatter in the workspace;
/// both the pom reconciler and the features generator go through it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinate {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub classifier: Option<String>,
}

impl Coordinate {
    /// Coordinate with the common group/artifact/version/packaging fields set.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        packaging: impl Into<String>,
    ) -> Self {
        Self {
            group_id: Some(group_id.into()),
            artifact_id: Some(artifact_id.into()),
            version: Some(version.into()),
            packaging: Some(packaging.into()),
            classifier: None,
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }
}

impl fmt::Display for Coordinate {
    /// `mvn:<groupId>/<artifactId>/<version>/<packaging>/<classifier>`,
    /// absent fields dropped entirely. Field order is fixed; fields are
    /// never reordered to close gaps.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segments: Vec<&str> = [
            &self.group_id,
            &self.artifact_id,
            &self.version,
            &self.packaging,
            &self.classifier,
        ]
        .into_iter()
        .filter_map(|s| s.as_deref())
        .collect();

        write!(f, "mvn:{}", segments.join("/"))
    }
}
