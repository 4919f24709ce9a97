//! The artifact manifest: what the `<artifacts>` subtree of the project
//! descriptor is expected to contain.

use crate::descriptor::WorkspacePackage;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// File entry of the aggregate feature descriptor.
pub const AGGREGATE_FILE: &str = "target/features.xml";

/// Classifier of the aggregate feature descriptor.
pub const AGGREGATE_CLASSIFIER: &str = "features";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Xml,
    Jar,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Xml => write!(f, "xml"),
            ArtifactKind::Jar => write!(f, "jar"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Path relative to the project root.
    pub file: String,
    pub kind: ArtifactKind,
    pub classifier: String,
}

/// Ordered list of attached artifacts. Entry 0 is always the aggregate
/// feature descriptor, then one entry per artifact package in discovery
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub entries: Vec<ArtifactEntry>,
}

impl ArtifactManifest {
    /// The manifest a workspace is expected to have attached.
    pub fn expected(project_root: &Utf8Path, packages: &[WorkspacePackage]) -> Self {
        let mut entries = vec![ArtifactEntry {
            file: AGGREGATE_FILE.to_string(),
            kind: ArtifactKind::Xml,
            classifier: AGGREGATE_CLASSIFIER.to_string(),
        }];

        for pkg in packages {
            entries.push(ArtifactEntry {
                file: jar_path(project_root, pkg),
                kind: ArtifactKind::Jar,
                classifier: pkg.name().to_string(),
            });
        }

        Self { entries }
    }

    /// Classifier set, order-independent. Check-mode comparisons go through
    /// this rather than entry order.
    pub fn classifiers(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.classifier.as_str()).collect()
    }
}

/// `<package-dir>/target/<package-name>.jar`, relative to the project root.
fn jar_path(project_root: &Utf8Path, pkg: &WorkspacePackage) -> String {
    let jar = pkg.dir().join("target").join(format!("{}.jar", pkg.name()));
    jar.strip_prefix(project_root)
        .map(|p| p.to_string())
        .unwrap_or_else(|_| jar.to_string())
}
