//! Enumerate sub-packages from declared workspace glob patterns.

use bundlesmith_types::{Error, PackageDescriptor, Result, WorkspacePackage};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use glob::glob;
use std::collections::BTreeSet;
use tracing::debug;

/// Read and parse a `package.json`.
pub fn load_descriptor(path: &Utf8Path) -> Result<PackageDescriptor> {
    let contents = fs::read_to_string(path)?;
    PackageDescriptor::parse(&contents).map_err(|e| match e {
        Error::Configuration(message) => Error::configuration(format!("{path}: {message}")),
        other => other,
    })
}

/// Expand the descriptor's workspace patterns against the filesystem and load
/// every matched sub-package.
///
/// Patterns mentioning `target` are build output and skipped. Overlapping
/// patterns yield each physical package once; the first occurrence wins, so
/// the result keeps pattern-then-match order. No declared workspaces is an
/// empty result, not an error.
pub fn discover(
    project_root: &Utf8Path,
    descriptor: &PackageDescriptor,
) -> Result<Vec<WorkspacePackage>> {
    let mut seen: BTreeSet<Utf8PathBuf> = BTreeSet::new();
    let mut packages = Vec::new();

    for pattern in descriptor.workspace_patterns() {
        if pattern.contains("target") {
            debug!(pattern = %pattern, "skipping build-output pattern");
            continue;
        }

        let full = project_root.join(&pattern).join("package.json");
        debug!(pattern = %full, "scanning workspace pattern");

        for entry in glob(full.as_str())
            .map_err(|e| Error::configuration(format!("invalid workspace pattern {pattern}: {e}")))?
        {
            let path = entry.map_err(|e| Error::Io(e.into_error()))?;
            let path = Utf8PathBuf::from_path_buf(path)
                .map_err(|p| Error::configuration(format!("non-UTF-8 path {}", p.display())))?;

            if !seen.insert(path.clone()) {
                debug!(path = %path, "already discovered, skipping");
                continue;
            }

            let descriptor = load_descriptor(&path)?;
            packages.push(WorkspacePackage { descriptor, path });
        }
    }

    debug!(count = packages.len(), "workspace discovery complete");
    Ok(packages)
}

/// The build-artifact subset: packages exposing a context path.
pub fn artifact_packages(packages: Vec<WorkspacePackage>) -> Vec<WorkspacePackage> {
    packages.into_iter().filter(|p| p.is_artifact()).collect()
}
