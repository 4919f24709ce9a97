//! Error taxonomy shared by the whole workspace.
//!
//! Four failure classes, all fatal: missing or invalid build inputs, a
//! persisted descriptor drifting from the expected manifest, filesystem
//! failures, and revision-probe failures. None of them downgrade to a
//! warning; the CLI boundary maps every one of them to exit code 1.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid build inputs; composing aborts without a partial
    /// configuration object.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The persisted descriptor does not match the expected manifest.
    /// Carries the command the operator should run.
    #[error("{message}")]
    Drift { message: String, remediation: String },

    /// Read/write/glob failure. Descriptor rewrites are all-or-nothing, so
    /// an `Io` failure never leaves a half-written file behind.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Source-control query failure. Never silently faked with defaults.
    #[error("revision probe failed: {0}")]
    RevisionProbe(String),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn drift(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Error::Drift {
            message: message.into(),
            remediation: remediation.into(),
        }
    }

    /// Remediation instruction, when this failure has one.
    pub fn remediation(&self) -> Option<&str> {
        match self {
            Error::Drift { remediation, .. } => Some(remediation),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
