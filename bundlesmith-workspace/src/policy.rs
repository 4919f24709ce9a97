//! Which vendored modules participate in compilation.
//!
//! Most of `node_modules` ships pre-built and is left alone. A small
//! whitelist of packages is published as source and must go through the
//! compiler like first-party code, unless the match is itself a vendored
//! sub-dependency of another vendored package.

use bundlesmith_types::PackageDescriptor;
use serde::{Deserialize, Serialize};

/// Directory name that marks vendored dependencies.
pub const VENDOR_DIR: &str = "node_modules";

/// Vendored packages compiled from source by default.
pub const DEFAULT_WHITELIST: &[&str] = &["catalog-ui-search"];

/// The compile/skip boundary for vendored modules.
///
/// This is the only definition of the boundary; the composer embeds it into
/// compilation rules and the worker-bundle rule rather than re-deriving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBoundary {
    pub vendor_dir: String,
    pub whitelist: Vec<String>,
}

impl Default for SourceBoundary {
    fn default() -> Self {
        Self {
            vendor_dir: VENDOR_DIR.to_string(),
            whitelist: DEFAULT_WHITELIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SourceBoundary {
    /// Default whitelist extended with the descriptor's additions.
    pub fn from_descriptor(descriptor: &PackageDescriptor) -> Self {
        let mut boundary = Self::default();
        for name in &descriptor.bundlesmith.whitelist {
            if !boundary.whitelist.contains(name) {
                boundary.whitelist.push(name.clone());
            }
        }
        boundary
    }

    /// Should this module path be compiled?
    ///
    /// True outside the vendor dir. Inside it, true only when the segment
    /// right after the LAST vendor-dir occurrence is whitelisted; a
    /// whitelisted package's own vendored sub-dependencies stay excluded.
    pub fn include(&self, module_path: &str) -> bool {
        let normalized = module_path.replace('\\', "/");
        let segments: Vec<&str> = normalized.split('/').collect();

        let last_vendor = segments
            .iter()
            .rposition(|s| *s == self.vendor_dir.as_str());

        match last_vendor {
            None => true,
            Some(i) => match segments.get(i + 1) {
                Some(name) => self.whitelist.iter().any(|w| w == name),
                None => false,
            },
        }
    }

    /// Exact negation of [`include`](Self::include).
    pub fn exclude(&self, module_path: &str) -> bool {
        !self.include(module_path)
    }
}
