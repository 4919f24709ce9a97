//! Package and project descriptor snapshots.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A parsed `package.json`, read once per invocation.
///
/// Unknown fields are ignored; everything bundlesmith cares about is either
/// a standard field or lives under the `"bundlesmith"` tool section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageDescriptor {
    pub name: String,

    pub version: Option<String>,

    pub workspaces: Option<Workspaces>,

    /// Main entry point, relative to the package root.
    pub main: Option<String>,

    /// Symbolic import name -> filesystem path (or self-reference, see
    /// the composer's alias handling).
    pub alias: BTreeMap<String, String>,

    /// Extra module resolution roots.
    pub resolve: BTreeMap<String, String>,

    /// Deployment-relative root path under which the bundled app serves
    /// assets. Packages without one are not build artifacts.
    #[serde(rename = "context-path")]
    pub context_path: Option<String>,

    /// HTML template for the generated index page.
    pub template: Option<String>,

    /// Test entry point.
    pub test: Option<String>,

    /// Setup file loaded before the test entry.
    #[serde(rename = "test-setup")]
    pub test_setup: Option<String>,

    /// File manifest used by the packaging collaborator.
    pub files: Vec<String>,

    /// Tool section.
    pub bundlesmith: ToolSection,
}

/// Workspace declarations come in two shapes in the wild: the legacy bare
/// array and the `{ "packages": [...] }` object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Workspaces {
    Patterns(Vec<String>),
    Packages { packages: Vec<String> },
}

impl Workspaces {
    pub fn patterns(&self) -> &[String] {
        match self {
            Workspaces::Patterns(p) => p,
            Workspaces::Packages { packages } => packages,
        }
    }
}

/// The `"bundlesmith"` key of a `package.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolSection {
    /// Additional workspace glob patterns beyond the `workspaces` field.
    pub features: Vec<String>,

    /// Additional vendored packages compiled from source.
    pub whitelist: Vec<String>,
}

impl PackageDescriptor {
    /// Parse a descriptor from JSON text.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::configuration(format!("invalid package.json: {e}")))
    }

    /// All workspace glob patterns: the `workspaces` declarations (either
    /// form) followed by the tool-section `features` extensions.
    pub fn workspace_patterns(&self) -> Vec<String> {
        let mut patterns: Vec<String> = self
            .workspaces
            .as_ref()
            .map(|w| w.patterns().to_vec())
            .unwrap_or_default();
        patterns.extend(self.bundlesmith.features.iter().cloned());
        patterns
    }
}

/// A sub-package discovered under a workspace glob pattern.
#[derive(Debug, Clone)]
pub struct WorkspacePackage {
    pub descriptor: PackageDescriptor,

    /// Absolute path of the matched `package.json`.
    pub path: Utf8PathBuf,
}

impl WorkspacePackage {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Directory containing the package.
    pub fn dir(&self) -> &Utf8Path {
        self.path.parent().unwrap_or(Utf8Path::new(""))
    }

    /// Only packages exposing a context path contribute build artifacts.
    pub fn is_artifact(&self) -> bool {
        self.descriptor.context_path.is_some()
    }
}

/// Project identity extracted from `pom.xml`.
///
/// The version is inherited from the parent element; the monorepos this tool
/// targets keep their own version there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
}

impl ProjectInfo {
    /// The project's own coordinate.
    pub fn coordinate(&self) -> crate::Coordinate {
        crate::Coordinate {
            group_id: Some(self.group_id.clone()),
            artifact_id: Some(self.artifact_id.clone()),
            version: Some(self.version.clone()),
            packaging: Some(self.packaging.clone()),
            classifier: None,
        }
    }
}
