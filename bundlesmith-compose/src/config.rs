//! The configuration object handed to the bundler.
//!
//! This is a contract type: the bundler consumes it as data and owns the
//! actual compilation. Rule order matters — the bundler applies the first
//! rule whose `test` matches, so layers append rather than replace.

use bundlesmith_workspace::SourceBoundary;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// `development` or `production`.
    pub mode: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devtool: Option<String>,

    /// Entry modules, in load order.
    pub entry: Vec<String>,

    pub output: OutputSection,

    pub module: ModuleSection,

    pub resolve: ResolveSection,

    #[serde(default)]
    pub plugins: Vec<PluginSpec>,

    /// Modules resolved at runtime instead of being bundled.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub externals: BTreeMap<String, Value>,

    /// When set, every vendored module is treated as external (server-side
    /// bundles resolve them from disk at runtime).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub vendor_externals: bool,

    /// Build-time constants baked into the bundle, including the revision
    /// probe results.
    pub constants: BTreeMap<String, Value>,

    /// `node` for server-side bundles; absent means browser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_server: Option<DevServerSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Output directory, relative to the project root.
    pub path: String,

    /// Filename pattern; `[hash]` is substituted by the bundler.
    pub filename: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_object: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSection {
    pub rules: Vec<ModuleRule>,
}

/// One module rule. `test` is a regex source the bundler compiles; the
/// optional `exclude` boundary is the shared vendored-source policy, never a
/// second implementation of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRule {
    pub test: String,

    #[serde(rename = "use")]
    pub use_: Vec<Loader>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<SourceBoundary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Loader {
    /// Bare loader reference.
    Name(String),
    /// Loader with options.
    Configured {
        loader: String,
        #[serde(default)]
        options: Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveSection {
    /// Symbolic name -> filesystem path, already resolved (see [`crate::alias`]).
    #[serde(default)]
    pub alias: BTreeMap<String, String>,

    /// Extension search order.
    pub extensions: Vec<String>,

    /// Module root search paths.
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

/// Dev-server descriptor, present for the development and test-harness
/// targets only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevServerSection {
    pub public_path: String,
    pub hot_only: bool,
    pub history_api_fallback: bool,

    /// Static-file root.
    pub content_base: String,

    pub watch_poll_ms: u64,

    /// Path prefix -> upstream route.
    pub proxy: BTreeMap<String, ProxyRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRoute {
    pub target: String,

    /// Basic-auth credentials forwarded upstream.
    pub auth: String,

    /// Allow websocket upgrade.
    pub ws: bool,

    pub secure: bool,

    /// Origin header rewritten to the upstream.
    pub origin: String,
}
