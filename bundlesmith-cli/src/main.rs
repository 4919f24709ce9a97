use anyhow::Context;
use bundlesmith_compose::{ComposeRequest, Target, compose};
use bundlesmith_descriptor::features::{FeatureOptions, generate_features};
use bundlesmith_descriptor::pom::{self, POM_FILE, PomDocument};
use bundlesmith_types::WorkspacePackage;
use bundlesmith_workspace::{artifact_packages, discover, load_descriptor};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "bundlesmith",
    version,
    about = "Build-configuration composer and artifact-descriptor reconciler for webapp monorepos."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check the project descriptor's attached artifacts against the
    /// workspace (or rewrite them with --fix).
    Pom(PomArgs),
    /// Generate the dependency-features descriptor.
    Features(FeaturesArgs),
    /// Compose a build configuration and print it as JSON.
    Config(ConfigArgs),
}

#[derive(Debug, Parser)]
struct PomArgs {
    /// Project root (default: current directory).
    #[arg(long, default_value = ".")]
    project_root: Utf8PathBuf,

    /// Regenerate the <artifacts> subtree instead of only checking it.
    #[arg(long, default_value_t = false)]
    fix: bool,
}

#[derive(Debug, Parser)]
struct FeaturesArgs {
    /// Project root (default: current directory).
    #[arg(long, default_value = ".")]
    project_root: Utf8PathBuf,

    /// Inherit bundle entries from existing feature files instead of the
    /// fixed base set.
    #[arg(long, value_delimiter = ',')]
    extend: Vec<Utf8PathBuf>,

    /// Regex patterns removing entries from the base/inherited set.
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,
}

#[derive(Debug, Parser)]
struct ConfigArgs {
    /// Package root (default: current directory).
    #[arg(long, default_value = ".")]
    package_root: Utf8PathBuf,

    /// Build target.
    #[arg(long, value_enum, default_value = "development")]
    target: TargetArg,

    /// Main entry override.
    #[arg(long)]
    main: Option<String>,

    /// Middleware entry for the server target.
    #[arg(long)]
    middleware: Option<String>,

    /// Stories root for the preview target.
    #[arg(long)]
    preview_root: Option<Utf8PathBuf>,

    /// Upstream host proxied by the dev server.
    #[arg(long)]
    proxy: Option<String>,

    /// Basic-auth credentials for the proxy.
    #[arg(long)]
    auth: Option<String>,

    /// Deployment context path override.
    #[arg(long)]
    context_path: Option<String>,

    /// Transpile TypeScript without type checking.
    #[arg(long, default_value_t = false)]
    ts_transpile_only: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum TargetArg {
    Development,
    Test,
    Production,
    Preview,
    Server,
}

impl From<TargetArg> for Target {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Development => Target::Development,
            TargetArg::Test => Target::TestHarness,
            TargetArg::Production => Target::Production,
            TargetArg::Preview => Target::ComponentPreview,
            TargetArg::Server => Target::ServerRender,
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Pom(args) => cmd_pom(args),
        Command::Features(args) => cmd_features(args),
        Command::Config(args) => cmd_config(args),
    }
}

fn cmd_pom(args: PomArgs) -> anyhow::Result<()> {
    let root = args.project_root;
    let packages = workspace_artifacts(&root)?;

    if args.fix {
        let path = pom::fix(&root, &packages).context("rewrite artifacts")?;
        info!("wrote {}", path);
        return Ok(());
    }

    if let Err(err) = pom::check(&root, &packages) {
        if let Some(remediation) = err.remediation() {
            error!("{remediation}");
        }
        return Err(err.into());
    }
    Ok(())
}

fn cmd_features(args: FeaturesArgs) -> anyhow::Result<()> {
    let root = args.project_root;
    let packages = workspace_artifacts(&root)?;

    let project = PomDocument::load(root.join(POM_FILE))?
        .project_info()
        .context("read project identity")?;

    let options = FeatureOptions {
        extend: args.extend,
        exclude: args.exclude,
    };
    let path = generate_features(&root, &project, &packages, &options)
        .context("generate features descriptor")?;
    info!("wrote {}", path);
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let descriptor = load_descriptor(&args.package_root.join("package.json"))
        .context("load package.json")?;

    let mut request = ComposeRequest::new(args.package_root, descriptor, args.target.into());
    request.main = args.main;
    request.middleware = args.middleware;
    request.preview_root = args.preview_root;
    request.proxy_target = args.proxy;
    request.auth = args.auth;
    request.public_path = args.context_path;
    request.ts_transpile_only = args.ts_transpile_only;

    let config = compose(&request).context("compose configuration")?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Discover the workspace from the root descriptor and keep the
/// artifact-bearing subset.
fn workspace_artifacts(root: &Utf8Path) -> anyhow::Result<Vec<WorkspacePackage>> {
    let descriptor = load_descriptor(&root.join("package.json")).context("load package.json")?;
    let packages = discover(root, &descriptor).context("discover workspaces")?;
    Ok(artifact_packages(packages))
}
