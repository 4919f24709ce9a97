//! Source-control revision probe.
//!
//! The composed configuration embeds the current commit id, dirty flag and
//! commit timestamp as build-time constants. A failing probe aborts the
//! whole composition; a bundle that cannot say what revision it was built
//! from must not be produced.

use bundlesmith_types::{Error, Result};
use camino::Utf8Path;
use chrono::DateTime;
use serde_json::Value;
use std::collections::BTreeMap;
use std::process::Command;

pub const COMMIT_HASH: &str = "__COMMIT_HASH__";
pub const IS_DIRTY: &str = "__IS_DIRTY__";
pub const COMMIT_DATE: &str = "__COMMIT_DATE__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionInfo {
    /// Short commit id.
    pub commit_hash: String,

    /// Uncommitted changes present.
    pub dirty: bool,

    /// Commit timestamp, RFC 3339.
    pub commit_date: String,
}

impl RevisionInfo {
    /// Query the repository containing `dir`.
    pub fn probe(dir: &Utf8Path) -> Result<Self> {
        let commit_hash = git(dir, &["rev-parse", "--short", "HEAD"])?;
        let status = git(dir, &["status", "--porcelain"])?;
        let commit_date = git(dir, &["log", "-1", "--pretty=format:%cI"])?;

        DateTime::parse_from_rfc3339(&commit_date).map_err(|e| {
            Error::RevisionProbe(format!("unparseable commit date '{commit_date}': {e}"))
        })?;

        Ok(Self {
            commit_hash,
            dirty: !status.is_empty(),
            commit_date,
        })
    }

    /// Build-time constant map for the configuration object.
    pub fn constants(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            (COMMIT_HASH.to_string(), Value::from(self.commit_hash.as_str())),
            (IS_DIRTY.to_string(), Value::from(self.dirty)),
            (COMMIT_DATE.to_string(), Value::from(self.commit_date.as_str())),
        ])
    }
}

fn git(dir: &Utf8Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| Error::RevisionProbe(format!("git {}: {e}", args.join(" "))))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::RevisionProbe(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    String::from_utf8(output.stdout)
        .map(|s| s.trim().to_string())
        .map_err(|_| Error::RevisionProbe(format!("git {} produced non-UTF-8 output", args.join(" "))))
}
