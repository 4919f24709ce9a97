//! Check and fix the `<artifacts>` subtree of the project descriptor.
//!
//! The document is parsed into a tree, only the `<artifacts>` element is
//! touched, and the whole document is reserialized with a deterministic
//! pretty-printer. No text splicing.

use bundlesmith_types::{
    ArtifactEntry, ArtifactManifest, Error, ProjectInfo, Result, WorkspacePackage,
};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::collections::BTreeSet;
use tracing::debug;
use xmltree::{Element, EmitterConfig, XMLNode};

/// Project descriptor file name.
pub const POM_FILE: &str = "pom.xml";

/// Remediation instruction reported on drift.
pub const FIX_COMMAND: &str = "bundlesmith pom --fix";

/// A parsed `pom.xml`, bound to its file path.
#[derive(Debug)]
pub struct PomDocument {
    root: Element,
    path: Utf8PathBuf,
}

impl PomDocument {
    pub fn load(path: impl Into<Utf8PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = fs::read(&path)?;
        let root = Element::parse(bytes.as_slice())
            .map_err(|e| Error::configuration(format!("invalid XML in {path}: {e}")))?;
        Ok(Self { root, path })
    }

    /// Project identity. The version is taken from the parent element, where
    /// the monorepos this tool targets keep it; packaging defaults to `jar`.
    pub fn project_info(&self) -> Result<ProjectInfo> {
        let required = |name: &str, value: Option<String>| {
            value.ok_or_else(|| {
                Error::configuration(format!("{}: missing <{name}> element", self.path))
            })
        };

        Ok(ProjectInfo {
            group_id: required("groupId", child_text(&self.root, "groupId"))?,
            artifact_id: required("artifactId", child_text(&self.root, "artifactId"))?,
            version: required(
                "parent/version",
                self.root
                    .get_child("parent")
                    .and_then(|parent| child_text(parent, "version")),
            )?,
            packaging: child_text(&self.root, "packaging").unwrap_or_else(|| "jar".to_string()),
        })
    }

    /// Classifiers currently attached in the `<artifacts>` subtree.
    pub fn attached_classifiers(&self) -> BTreeSet<String> {
        let mut classifiers = BTreeSet::new();
        if let Some(artifacts) = find_element(&self.root, "artifacts") {
            for node in &artifacts.children {
                if let XMLNode::Element(artifact) = node {
                    if artifact.name == "artifact" {
                        if let Some(classifier) = child_text(artifact, "classifier") {
                            classifiers.insert(classifier);
                        }
                    }
                }
            }
        }
        classifiers
    }

    /// Compare the persisted classifier set against the expected manifest.
    ///
    /// Order-independent; any expected classifier missing from the document
    /// is drift. Never touches the file.
    pub fn check(&self, expected: &ArtifactManifest) -> Result<()> {
        let attached = self.attached_classifiers();
        let missing: Vec<&str> = expected
            .classifiers()
            .into_iter()
            .filter(|c| !attached.contains(*c))
            .collect();

        if missing.is_empty() {
            debug!(path = %self.path, "artifacts are in sync");
            return Ok(());
        }

        Err(Error::drift(
            format!(
                "{} is out of sync with workspace packages (missing classifiers: {})",
                self.path,
                missing.join(", ")
            ),
            format!("run `{FIX_COMMAND}` to re-sync"),
        ))
    }

    /// Regenerate the `<artifacts>` element from the expected manifest,
    /// leaving the rest of the document untouched.
    pub fn fix(&mut self, manifest: &ArtifactManifest) -> Result<()> {
        let artifacts = find_element_mut(&mut self.root, "artifacts").ok_or_else(|| {
            Error::configuration(format!("{}: no <artifacts> element to rewrite", self.path))
        })?;

        artifacts.children = vec![
            XMLNode::Comment("NOTE: do not edit these artifacts by hand.".to_string()),
            XMLNode::Comment(format!(
                "They are calculated by `{FIX_COMMAND}`; re-run it to refresh them."
            )),
        ];
        for entry in &manifest.entries {
            artifacts.children.push(artifact_element(entry));
        }

        debug!(path = %self.path, entries = manifest.entries.len(), "artifacts regenerated");
        Ok(())
    }

    /// Serialize the whole document and replace the file in one step.
    ///
    /// The content is staged next to the target and renamed over it, so a
    /// failed write never leaves a half-written descriptor behind.
    pub fn save(&self) -> Result<()> {
        let mut buffer = Vec::new();
        self.root
            .write_with_config(
                &mut buffer,
                EmitterConfig::new()
                    .perform_indent(true)
                    .write_document_declaration(true),
            )
            .map_err(|e| Error::configuration(format!("serialize {}: {e}", self.path)))?;
        buffer.push(b'\n');

        let staged = self.path.with_extension("xml.tmp");
        fs::write(&staged, &buffer)?;
        fs::rename(&staged, &self.path)?;
        Ok(())
    }
}

/// Check the descriptor at the project root against the workspace.
pub fn check(project_root: &Utf8Path, packages: &[WorkspacePackage]) -> Result<()> {
    let pom = PomDocument::load(project_root.join(POM_FILE))?;
    pom.check(&ArtifactManifest::expected(project_root, packages))
}

/// Rewrite the descriptor at the project root from the workspace.
pub fn fix(project_root: &Utf8Path, packages: &[WorkspacePackage]) -> Result<Utf8PathBuf> {
    let path = project_root.join(POM_FILE);
    let mut pom = PomDocument::load(&path)?;
    pom.fix(&ArtifactManifest::expected(project_root, packages))?;
    pom.save()?;
    Ok(path)
}

fn artifact_element(entry: &ArtifactEntry) -> XMLNode {
    let mut artifact = Element::new("artifact");
    artifact.children.push(text_element("file", &entry.file));
    artifact
        .children
        .push(text_element("type", &entry.kind.to_string()));
    artifact
        .children
        .push(text_element("classifier", &entry.classifier));
    XMLNode::Element(artifact)
}

fn text_element(name: &str, text: &str) -> XMLNode {
    let mut element = Element::new(name);
    element.children.push(XMLNode::Text(text.to_string()));
    XMLNode::Element(element)
}

fn child_text(element: &Element, name: &str) -> Option<String> {
    element
        .get_child(name)
        .and_then(|child| child.get_text())
        .map(|text| text.trim().to_string())
}

/// First element with the given name, depth-first.
fn find_element<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    if element.name == name {
        return Some(element);
    }
    element
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Element(child) => find_element(child, name),
            _ => None,
        })
        .next()
}

fn find_element_mut<'a>(element: &'a mut Element, name: &str) -> Option<&'a mut Element> {
    if element.name == name {
        return Some(element);
    }
    element
        .children
        .iter_mut()
        .filter_map(|node| match node {
            XMLNode::Element(child) => find_element_mut(child, name),
            _ => None,
        })
        .next()
}
