//! Layered build-configuration composition.
//!
//! A request names one of five build targets; composing builds a base layer
//! and the target's overlay, merges them (scalars replace, lists append,
//! maps recurse), and hands back one typed [`BuildConfig`]. The only side
//! read is the source-control revision probe, and its failure is fatal.

pub mod alias;
pub mod config;
pub mod layers;
pub mod merge;
pub mod request;
pub mod revision;

pub use config::{
    BuildConfig, DevServerSection, Loader, ModuleRule, ModuleSection, OutputSection, PluginSpec,
    ProxyRoute, ResolveSection,
};
pub use layers::{compose, compose_with_revision};
pub use request::{ComposeRequest, Target};
pub use revision::RevisionInfo;
