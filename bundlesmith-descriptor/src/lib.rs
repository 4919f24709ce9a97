//! Descriptor reconciliation: keeping the project descriptor's `<artifacts>`
//! subtree and the generated features descriptor in sync with the workspace.

pub mod features;
pub mod pom;

pub use features::{FeatureOptions, generate_features};
pub use pom::PomDocument;
