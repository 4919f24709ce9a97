//! Layer construction and composition.
//!
//! One base layer shared by every target, one overlay per target, merged
//! with [`crate::merge`]. Layers are plain configuration trees; the typed
//! [`BuildConfig`] is produced by deserializing the merged tree, which also
//! validates that every required section ended up present.

use crate::alias::resolve_aliases;
use crate::config::BuildConfig;
use crate::merge::merge;
use crate::request::{ComposeRequest, DEFAULT_PROXY_TARGET, Target};
use crate::revision::RevisionInfo;
use bundlesmith_types::{Error, Result};
use bundlesmith_workspace::SourceBoundary;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Build-time constant naming the component-preview stories root.
pub const PREVIEW_ROOT: &str = "__PREVIEW_ROOT__";

/// Compose the configuration for the request's target.
///
/// Pure except for the revision probe against the package root; probe
/// failure aborts with [`Error::RevisionProbe`].
pub fn compose(request: &ComposeRequest) -> Result<BuildConfig> {
    let revision = RevisionInfo::probe(&request.package_root)?;
    compose_with_revision(request, &revision)
}

/// Composition with the revision probe already taken; pure function of its
/// arguments.
pub fn compose_with_revision(
    request: &ComposeRequest,
    revision: &RevisionInfo,
) -> Result<BuildConfig> {
    let boundary = SourceBoundary::from_descriptor(&request.descriptor);

    let base = base_layer(request, &boundary, revision);
    let overlay = match request.target {
        Target::Development => development_layer(request)?,
        Target::TestHarness => test_harness_layer(request, &boundary)?,
        Target::Production => production_layer(request)?,
        Target::ComponentPreview => component_preview_layer(request)?,
        Target::ServerRender => server_render_layer(request)?,
    };

    let merged = merge(base, overlay);
    debug!(target = %request.target, "configuration layers merged");

    serde_json::from_value(merged)
        .map_err(|e| Error::configuration(format!("composed configuration is invalid: {e}")))
}

fn base_layer(request: &ComposeRequest, boundary: &SourceBoundary, revision: &RevisionInfo) -> Value {
    let mut aliases = resolve_aliases(&request.descriptor.alias, &request.package_root);
    for (name, path) in resolve_aliases(&request.descriptor.resolve, &request.package_root) {
        aliases.entry(name).or_insert(path);
    }

    json!({
        "entry": ["babel-polyfill", "whatwg-fetch"],
        "output": {
            "path": "target/webapp",
            "filename": "bundle.[hash].js",
            "global_object": "this",
        },
        "module": {
            "rules": [
                {
                    "test": r"\.(png|gif|jpg|jpeg)$",
                    "use": ["file-loader"],
                },
                {
                    "test": r"\.jsx?$",
                    "use": [script_loader(&[])],
                    "exclude": boundary,
                },
                {
                    "test": r"\.(hbs|handlebars)$",
                    "use": ["handlebars-loader"],
                },
                {
                    "test": r"\.(eot|svg|ttf|woff|woff2)$",
                    "use": [{
                        "loader": "file-loader",
                        "options": { "name": "fonts/[name]-[hash].[ext]" },
                    }],
                },
                {
                    "test": r"\.worker\.js$",
                    "use": ["worker-loader", script_loader(&[])],
                    "exclude": boundary,
                },
                {
                    "test": r"\.tsx?$",
                    "use": [{
                        "loader": "ts-loader",
                        "options": {
                            "allowTsInNodeModules": true,
                            "transpileOnly": request.ts_transpile_only,
                        },
                    }],
                    "exclude": boundary,
                },
                {
                    "test": r"\.(html)$",
                    "use": ["html-loader"],
                },
            ],
        },
        "resolve": {
            "alias": aliases,
            "extensions": [".js", ".json", ".jsx", ".ts", ".tsx"],
            "modules": [
                "src/main/webapp/",
                "src/main/webapp/js",
                "src/main/webapp/css",
                "src/main/webapp/lib/",
                boundary.vendor_dir.as_str(),
            ],
        },
        "plugins": [],
        "externals": {
            "react/addons": true,
            "react/lib/ExecutionEnvironment": true,
            "react/lib/ReactContext": true,
        },
        "constants": revision.constants(),
    })
}

fn development_layer(request: &ComposeRequest) -> Result<Value> {
    let main = main_entry(request)?;
    let template = page_template(request, &main);

    Ok(json!({
        "mode": "development",
        "devtool": "cheap-module-eval-source-map",
        "entry": ["console-polyfill", main],
        "module": { "rules": [inline_style_rule()] },
        "plugins": [
            { "name": "named-modules" },
            { "name": "hot-module-replacement" },
            {
                "name": "html",
                "options": { "title": "My App", "filename": "index.html", "template": template },
            },
            { "name": "progress", "options": { "format": "compact" } },
        ],
        "dev_server": dev_server_section(request),
    }))
}

fn test_harness_layer(request: &ComposeRequest, boundary: &SourceBoundary) -> Result<Value> {
    let test = request.descriptor.test.as_deref().ok_or_else(|| {
        Error::configuration("no test entry point: set \"test\" in package.json")
    })?;

    let mut entry: Vec<String> = Vec::new();
    if let Some(setup) = &request.descriptor.test_setup {
        entry.push(request.package_root.join(setup).to_string());
    }
    entry.push(request.package_root.join(test).to_string());

    // Spec sources bypass the whitelist entirely: vendored specs never run.
    let vendored_only = SourceBoundary {
        vendor_dir: boundary.vendor_dir.clone(),
        whitelist: Vec::new(),
    };

    Ok(json!({
        "mode": "development",
        "devtool": "cheap-module-eval-source-map",
        "entry": entry,
        "output": { "path": "target/test", "filename": "test.js" },
        "module": {
            "rules": [
                {
                    "test": r".*spec\.jsx?$",
                    "use": [
                        { "loader": "mocha-loader", "options": { "bail": true } },
                        script_loader(&[json!([
                            "babel-plugin-istanbul",
                            { "exclude": ["**/*spec.js"] },
                        ])]),
                    ],
                    "exclude": vendored_only,
                },
                extracted_style_rule(),
            ],
        },
        "plugins": [
            { "name": "css-extract", "options": { "filename": "styles.[hash].css" } },
            { "name": "html" },
            { "name": "hot-module-replacement" },
        ],
        "dev_server": dev_server_section(request),
    }))
}

fn production_layer(request: &ComposeRequest) -> Result<Value> {
    let main = main_entry(request)?;
    let template = page_template(request, &main);

    Ok(json!({
        "mode": "production",
        "devtool": "source-map",
        "entry": [main],
        "module": { "rules": [extracted_style_rule()] },
        "plugins": [
            { "name": "css-extract", "options": { "filename": "styles.[hash].css" } },
            {
                "name": "html",
                "options": { "title": "My App", "filename": "index.html", "template": template },
            },
        ],
    }))
}

fn component_preview_layer(request: &ComposeRequest) -> Result<Value> {
    let preview_root = request.preview_root.as_ref().ok_or_else(|| {
        Error::configuration("no preview root: the component-preview target needs one")
    })?;

    Ok(json!({
        "mode": "development",
        "devtool": "cheap-module-eval-source-map",
        "output": { "path": "target/preview" },
        "module": { "rules": [inline_style_rule()] },
        "plugins": [{ "name": "hot-module-replacement" }],
        "constants": { PREVIEW_ROOT: preview_root.as_str() },
    }))
}

fn server_render_layer(request: &ComposeRequest) -> Result<Value> {
    let middleware = request.middleware.as_deref().ok_or_else(|| {
        Error::configuration("no middleware entry: the server-render target needs one")
    })?;

    Ok(json!({
        "mode": "development",
        "devtool": "source-map",
        "entry": [request.package_root.join(middleware).to_string()],
        "output": {
            "path": "target/server",
            "filename": "middleware.js",
            "library_target": "commonjs2",
        },
        "platform": "node",
        "vendor_externals": true,
    }))
}

/// Script sources go through the transpiler with a fixed preset stack;
/// `extra_plugins` is for target-specific instrumentation.
fn script_loader(extra_plugins: &[Value]) -> Value {
    let mut plugins = vec![Value::from("react-hot-loader/babel")];
    plugins.extend(extra_plugins.iter().cloned());

    json!({
        "loader": "babel-loader",
        "options": {
            "presets": [
                "babel-preset-react",
                ["babel-preset-latest", { "modules": false }],
                "babel-preset-stage-0",
            ],
            "cacheDirectory": true,
            "plugins": plugins,
        },
    })
}

fn inline_style_rule() -> Value {
    json!({
        "test": r"\.(css|less)$",
        "use": [
            "style-loader",
            { "loader": "css-loader", "options": { "sourceMap": true } },
            { "loader": "less-loader", "options": { "sourceMap": true } },
        ],
    })
}

fn extracted_style_rule() -> Value {
    json!({
        "test": r"\.(css|less)$",
        "use": [
            "css-extract-loader",
            { "loader": "css-loader", "options": { "sourceMap": true } },
            { "loader": "less-loader", "options": { "sourceMap": true } },
        ],
    })
}

fn dev_server_section(request: &ComposeRequest) -> Value {
    let target = request
        .proxy_target
        .clone()
        .unwrap_or_else(|| DEFAULT_PROXY_TARGET.to_string());

    let auth = request.auth.clone().unwrap_or_else(|| {
        warn!("using default basic auth (admin:admin); pass credentials to override");
        "admin:admin".to_string()
    });

    let proxy: BTreeMap<&str, Value> = request
        .proxy_prefixes
        .iter()
        .map(|prefix| {
            (
                prefix.as_str(),
                json!({
                    "target": target.as_str(),
                    "auth": auth.as_str(),
                    "ws": true,
                    "secure": false,
                    "origin": target.as_str(),
                }),
            )
        })
        .collect();

    json!({
        "public_path": public_path(request),
        "hot_only": true,
        "history_api_fallback": true,
        "content_base": "src/main/resources",
        "watch_poll_ms": 1000,
        "proxy": proxy,
    })
}

fn main_entry(request: &ComposeRequest) -> Result<String> {
    let main = request
        .main
        .as_deref()
        .or(request.descriptor.main.as_deref())
        .ok_or_else(|| {
            Error::configuration(format!(
                "no main entry point for target {}: set \"main\" in package.json or pass one",
                request.target
            ))
        })?;
    Ok(request.package_root.join(main).to_string())
}

/// Page template: the descriptor's, or the main entry when none is declared.
fn page_template(request: &ComposeRequest, main: &str) -> String {
    request
        .descriptor
        .template
        .as_deref()
        .map(|t| request.package_root.join(t).to_string())
        .unwrap_or_else(|| main.to_string())
}

fn public_path(request: &ComposeRequest) -> String {
    request
        .public_path
        .clone()
        .or_else(|| request.descriptor.context_path.clone())
        .unwrap_or_else(|| "/".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlesmith_types::PackageDescriptor;
    use pretty_assertions::assert_eq;

    fn revision() -> RevisionInfo {
        RevisionInfo {
            commit_hash: "abc1234".to_string(),
            dirty: false,
            commit_date: "2024-04-01T10:00:00+00:00".to_string(),
        }
    }

    fn descriptor(json: &str) -> PackageDescriptor {
        PackageDescriptor::parse(json).unwrap()
    }

    fn request(target: Target) -> ComposeRequest {
        ComposeRequest::new(
            "/repo/ui/app",
            descriptor(
                r#"{
                    "name": "app",
                    "main": "src/main/webapp/index.js",
                    "test": "src/main/webapp/test.js",
                    "context-path": "/my-app"
                }"#,
            ),
            target,
        )
    }

    #[test]
    fn development_entry_concatenates_base_then_overlay() {
        let config = compose_with_revision(&request(Target::Development), &revision()).unwrap();
        assert_eq!(
            config.entry,
            vec![
                "babel-polyfill",
                "whatwg-fetch",
                "console-polyfill",
                "/repo/ui/app/src/main/webapp/index.js",
            ]
        );
        assert_eq!(config.mode, "development");
        assert_eq!(config.output.path, "target/webapp");
    }

    #[test]
    fn production_overlay_scalars_win() {
        let config = compose_with_revision(&request(Target::Production), &revision()).unwrap();
        assert_eq!(config.mode, "production");
        assert_eq!(config.devtool.as_deref(), Some("source-map"));
        assert!(config.dev_server.is_none());
    }

    #[test]
    fn missing_main_is_a_configuration_error() {
        let mut req = request(Target::Production);
        req.descriptor = descriptor(r#"{ "name": "app" }"#);
        let err = compose_with_revision(&req, &revision()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("main entry point"));
    }

    #[test]
    fn test_harness_redirects_output() {
        let config = compose_with_revision(&request(Target::TestHarness), &revision()).unwrap();
        assert_eq!(config.output.path, "target/test");
        assert_eq!(config.output.filename, "test.js");
        // base filename survives nowhere; overlay replaced both fields
        assert!(config.dev_server.is_some());
    }

    #[test]
    fn test_harness_prepends_setup_entry() {
        let mut req = request(Target::TestHarness);
        req.descriptor = descriptor(
            r#"{
                "name": "app",
                "test": "src/test.js",
                "test-setup": "src/setup.js"
            }"#,
        );
        let config = compose_with_revision(&req, &revision()).unwrap();
        let tail: Vec<&str> = config.entry.iter().rev().take(2).map(|s| s.as_str()).collect();
        assert_eq!(tail, vec!["/repo/ui/app/src/test.js", "/repo/ui/app/src/setup.js"]);
    }

    #[test]
    fn missing_test_entry_fails_the_test_harness() {
        let mut req = request(Target::TestHarness);
        req.descriptor = descriptor(r#"{ "name": "app", "main": "src/index.js" }"#);
        let err = compose_with_revision(&req, &revision()).unwrap_err();
        assert!(err.to_string().contains("test entry point"));
    }

    #[test]
    fn component_preview_requires_an_explicit_root() {
        let mut req = request(Target::ComponentPreview);
        let err = compose_with_revision(&req, &revision()).unwrap_err();
        assert!(err.to_string().contains("preview root"));

        req.preview_root = Some("/repo/ui/app/src/main/webapp".into());
        let config = compose_with_revision(&req, &revision()).unwrap();
        assert_eq!(config.constants[PREVIEW_ROOT], "/repo/ui/app/src/main/webapp");
        assert_eq!(config.output.path, "target/preview");
    }

    #[test]
    fn revision_constants_are_embedded_for_every_target() {
        let config = compose_with_revision(&request(Target::Development), &revision()).unwrap();
        assert_eq!(config.constants[crate::revision::COMMIT_HASH], "abc1234");
        assert_eq!(config.constants[crate::revision::IS_DIRTY], false);
    }

    #[test]
    fn server_render_bundles_for_node() {
        let mut req = request(Target::ServerRender);
        req.middleware = Some("src/main/webapp/middleware.js".to_string());
        let config = compose_with_revision(&req, &revision()).unwrap();

        assert_eq!(config.platform.as_deref(), Some("node"));
        assert!(config.vendor_externals);
        assert_eq!(config.output.library_target.as_deref(), Some("commonjs2"));
        assert_eq!(config.output.path, "target/server");
    }

    #[test]
    fn server_render_requires_a_middleware_entry() {
        let err =
            compose_with_revision(&request(Target::ServerRender), &revision()).unwrap_err();
        assert!(err.to_string().contains("middleware entry"));
    }

    #[test]
    fn aliases_resolve_self_references_into_the_config() {
        let mut req = request(Target::Development);
        req.descriptor = descriptor(
            r#"{
                "name": "app",
                "main": "src/index.js",
                "alias": { "app-ui": "./src/main/webapp/component" }
            }"#,
        );
        let config = compose_with_revision(&req, &revision()).unwrap();
        assert_eq!(
            config.resolve.alias["app-ui"],
            "/repo/ui/app/src/main/webapp/component"
        );
    }

    #[test]
    fn vendored_source_boundary_flows_into_script_rules() {
        let mut req = request(Target::Development);
        req.descriptor = descriptor(
            r#"{
                "name": "app",
                "main": "src/index.js",
                "bundlesmith": { "whitelist": ["map-widgets"] }
            }"#,
        );
        let config = compose_with_revision(&req, &revision()).unwrap();

        let script_rule = config
            .module
            .rules
            .iter()
            .find(|r| r.test == r"\.jsx?$")
            .expect("script rule");
        let boundary = script_rule.exclude.as_ref().expect("boundary");
        assert!(boundary.whitelist.iter().any(|w| w == "map-widgets"));
        assert!(boundary.include("node_modules/map-widgets/index.js"));

        let worker_rule = config
            .module
            .rules
            .iter()
            .find(|r| r.test == r"\.worker\.js$")
            .expect("worker rule");
        assert_eq!(worker_rule.exclude, script_rule.exclude);
    }

    #[test]
    fn dev_server_routes_every_prefix_with_websockets() {
        let mut req = request(Target::Development);
        req.proxy_target = Some("https://upstream:8993".to_string());
        req.auth = Some("admin:changeit".to_string());
        let config = compose_with_revision(&req, &revision()).unwrap();

        let dev_server = config.dev_server.expect("dev server");
        assert_eq!(dev_server.public_path, "/my-app");
        assert_eq!(dev_server.proxy.len(), 4);
        for route in dev_server.proxy.values() {
            assert_eq!(route.target, "https://upstream:8993");
            assert_eq!(route.auth, "admin:changeit");
            assert!(route.ws);
            assert!(!route.secure);
            assert_eq!(route.origin, "https://upstream:8993");
        }
    }

    #[test]
    fn probe_failure_aborts_composition() {
        let temp = tempfile::TempDir::new().unwrap();
        let root =
            camino::Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        let mut req = request(Target::Development);
        req.package_root = root;

        let err = compose(&req).unwrap_err();
        assert!(matches!(err, Error::RevisionProbe(_)));
    }
}
