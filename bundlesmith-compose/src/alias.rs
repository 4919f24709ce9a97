//! Alias resolution.
//!
//! Aliases map symbolic import names to filesystem paths. A value whose
//! first path segment is `.` refers to the requesting package itself and
//! resolves against the caller's own package root, which lets a package
//! alias its own re-exported entry point. Everything else passes through
//! untouched.

use camino::Utf8Path;
use std::collections::BTreeMap;

pub fn resolve_aliases(
    aliases: &BTreeMap<String, String>,
    package_root: &Utf8Path,
) -> BTreeMap<String, String> {
    aliases
        .iter()
        .map(|(name, value)| {
            let mut segments = value.split('/');
            let resolved = match segments.next() {
                Some(".") => {
                    let mut path = package_root.to_path_buf();
                    for segment in segments {
                        path.push(segment);
                    }
                    path.to_string()
                }
                _ => value.clone(),
            };
            (name.clone(), resolved)
        })
        .collect()
}
