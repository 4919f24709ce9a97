//! The composition request: everything the composer needs, built explicitly
//! by the caller. There is no process-global state feeding any target.

use bundlesmith_types::PackageDescriptor;
use camino::Utf8PathBuf;
use std::fmt;
use std::str::FromStr;

/// Default upstream for dev-server proxying.
pub const DEFAULT_PROXY_TARGET: &str = "https://localhost:8993";

/// Path prefixes routed to the upstream by default.
pub const DEFAULT_PROXY_PREFIXES: &[&str] = &["/admin", "/search", "/services", "/webjars"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Interactive development build.
    Development,
    /// In-browser test-harness build.
    TestHarness,
    /// Optimized production build.
    Production,
    /// Isolated component-preview build.
    ComponentPreview,
    /// Server-render (middleware) bundle.
    ServerRender,
}

impl Target {
    pub fn name(self) -> &'static str {
        match self {
            Target::Development => "development",
            Target::TestHarness => "test",
            Target::Production => "production",
            Target::ComponentPreview => "preview",
            Target::ServerRender => "server",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Target::Development),
            "test" => Ok(Target::TestHarness),
            "production" => Ok(Target::Production),
            "preview" => Ok(Target::ComponentPreview),
            "server" => Ok(Target::ServerRender),
            other => Err(format!(
                "unknown target '{other}' (expected development, test, production, preview or server)"
            )),
        }
    }
}

/// Inputs to one composition.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    /// Root of the package being built; alias self-references resolve
    /// against this.
    pub package_root: Utf8PathBuf,

    /// Descriptor snapshot of that package.
    pub descriptor: PackageDescriptor,

    pub target: Target,

    /// Main entry override; falls back to the descriptor's `main`.
    pub main: Option<String>,

    /// Middleware entry for the server-render target.
    pub middleware: Option<String>,

    /// Root searched for component stories by the preview target.
    pub preview_root: Option<Utf8PathBuf>,

    /// Upstream host proxied to by the dev server.
    pub proxy_target: Option<String>,

    /// Basic-auth credentials for the proxy. Left unset, a logged default
    /// is used.
    pub auth: Option<String>,

    /// Deployment context path; falls back to the descriptor's.
    pub public_path: Option<String>,

    /// Path prefixes routed through the dev-server proxy.
    pub proxy_prefixes: Vec<String>,

    /// Transpile-only TypeScript (skip type checking).
    pub ts_transpile_only: bool,
}

impl ComposeRequest {
    pub fn new(
        package_root: impl Into<Utf8PathBuf>,
        descriptor: PackageDescriptor,
        target: Target,
    ) -> Self {
        Self {
            package_root: package_root.into(),
            descriptor,
            target,
            main: None,
            middleware: None,
            preview_root: None,
            proxy_target: None,
            auth: None,
            public_path: None,
            proxy_prefixes: DEFAULT_PROXY_PREFIXES.iter().map(|s| s.to_string()).collect(),
            ts_transpile_only: false,
        }
    }
}
