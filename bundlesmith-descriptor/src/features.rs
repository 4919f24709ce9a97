//! Generation of the dependency-features descriptor.
//!
//! Emits `target/features.xml`: one feature listing a bundle per dependency
//! coordinate. The base set is either fixed (runtime dependency plus the
//! project itself when it packages as a bundle) or inherited verbatim from
//! existing feature files; one bundle per workspace package follows either
//! way.

use bundlesmith_types::manifest::AGGREGATE_FILE;
use bundlesmith_types::{Coordinate, Error, ProjectInfo, Result, WorkspacePackage};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use regex::Regex;
use tracing::debug;
use xmltree::{Element, XMLNode};

/// Servlet container helpers every deployed webapp needs at runtime.
pub fn runtime_dependency() -> Coordinate {
    Coordinate::new(
        "org.eclipse.jetty",
        "jetty-servlets",
        "9.2.19.v20160908",
        "jar",
    )
}

#[derive(Debug, Clone, Default)]
pub struct FeatureOptions {
    /// Feature files whose bundle lists are inherited instead of the fixed
    /// base set.
    pub extend: Vec<Utf8PathBuf>,

    /// Regex patterns filtering the base/inherited coordinates. Does NOT
    /// apply to the per-package coordinates.
    pub exclude: Vec<String>,
}

/// Write the features descriptor for the workspace; returns its path.
pub fn generate_features(
    project_root: &Utf8Path,
    project: &ProjectInfo,
    packages: &[WorkspacePackage],
    options: &FeatureOptions,
) -> Result<Utf8PathBuf> {
    let excludes = compile_excludes(&options.exclude)?;

    let mut coordinates: Vec<String> = base_coordinates(project, &options.extend)?
        .into_iter()
        .filter(|coor| !excludes.iter().any(|re| re.is_match(coor)))
        .collect();

    // Workspace packages are never filtered out, excluded or not.
    for pkg in packages {
        coordinates.push(
            Coordinate::new(
                project.group_id.clone(),
                project.artifact_id.clone(),
                project.version.clone(),
                "jar",
            )
            .with_classifier(pkg.name())
            .to_string(),
        );
    }

    let document = features_document(project, &coordinates);
    let path = project_root.join(AGGREGATE_FILE);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, document)?;

    debug!(path = %path, bundles = coordinates.len(), "features descriptor written");
    Ok(path)
}

fn base_coordinates(project: &ProjectInfo, extend: &[Utf8PathBuf]) -> Result<Vec<String>> {
    if !extend.is_empty() {
        let mut inherited = Vec::new();
        for file in extend {
            inherited.extend(inherited_coordinates(file)?);
        }
        return Ok(inherited);
    }

    let mut base = vec![runtime_dependency().to_string()];
    if project.packaging == "bundle" {
        base.push(project.coordinate().to_string());
    }
    Ok(base)
}

/// Bundle entries of an existing feature file, in document order.
fn inherited_coordinates(file: &Utf8Path) -> Result<Vec<String>> {
    let bytes = fs::read(file)?;
    let root = Element::parse(bytes.as_slice())
        .map_err(|e| Error::configuration(format!("invalid XML in {file}: {e}")))?;

    let mut coordinates = Vec::new();
    for feature in child_elements(&root, "feature") {
        for bundle in child_elements(feature, "bundle") {
            if let Some(text) = bundle.get_text() {
                coordinates.push(text.trim().to_string());
            }
        }
    }
    Ok(coordinates)
}

fn child_elements<'a>(element: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> {
    element.children.iter().filter_map(move |node| match node {
        XMLNode::Element(child) if child.name == name => Some(child),
        _ => None,
    })
}

fn compile_excludes(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p)
                .map_err(|e| Error::configuration(format!("invalid exclude pattern '{p}': {e}")))
        })
        .collect()
}

fn features_document(project: &ProjectInfo, coordinates: &[String]) -> String {
    let bundles = coordinates
        .iter()
        .map(|coor| format!("        <bundle>{}</bundle>", escape_text(coor)))
        .collect::<Vec<_>>()
        .join("\n");

    let name = escape_text(&project.artifact_id);
    let version = escape_text(&project.version);

    format!(
        r#"<features name="{name}-{version}"
          xmlns="http://karaf.apache.org/xmlns/features/v1.3.0"
          xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
          xsi:schemaLocation="http://karaf.apache.org/xmlns/features/v1.3.0 http://karaf.apache.org/xmlns/features/v1.3.0">
    <feature name="{name}" install="auto" version="{version}">
{bundles}
    </feature>
</features>
"#
    )
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlesmith_types::PackageDescriptor;
    use camino::Utf8PathBuf;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn project(packaging: &str) -> ProjectInfo {
        ProjectInfo {
            group_id: "org.example.app".to_string(),
            artifact_id: "webapp".to_string(),
            version: "2.10.0".to_string(),
            packaging: packaging.to_string(),
        }
    }

    fn package(root: &Utf8Path, rel_dir: &str, name: &str) -> WorkspacePackage {
        let descriptor = PackageDescriptor::parse(&format!(
            r#"{{ "name": "{name}", "context-path": "/{name}" }}"#
        ))
        .unwrap();
        WorkspacePackage {
            descriptor,
            path: root.join(rel_dir).join("package.json"),
        }
    }

    fn utf8_root(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8")
    }

    fn bundles_in(document: &str) -> Vec<String> {
        document
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                line.strip_prefix("<bundle>")
                    .and_then(|rest| rest.strip_suffix("</bundle>"))
                    .map(|coor| coor.to_string())
            })
            .collect()
    }

    #[test]
    fn jar_packaging_gets_the_runtime_dependency_only() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let path =
            generate_features(&root, &project("jar"), &[], &FeatureOptions::default()).unwrap();
        let document = fs::read_to_string(path).unwrap();

        assert_eq!(
            bundles_in(&document),
            vec!["mvn:org.eclipse.jetty/jetty-servlets/9.2.19.v20160908/jar"]
        );
    }

    #[test]
    fn bundle_packaging_adds_the_project_itself() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let path =
            generate_features(&root, &project("bundle"), &[], &FeatureOptions::default())
                .unwrap();
        let document = fs::read_to_string(path).unwrap();

        assert_eq!(
            bundles_in(&document),
            vec![
                "mvn:org.eclipse.jetty/jetty-servlets/9.2.19.v20160908/jar",
                "mvn:org.example.app/webapp/2.10.0/bundle",
            ]
        );
    }

    #[test]
    fn one_bundle_per_workspace_package() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let packages = [package(&root, "ui/app", "app"), package(&root, "ui/admin", "admin")];

        let path =
            generate_features(&root, &project("jar"), &packages, &FeatureOptions::default())
                .unwrap();
        let document = fs::read_to_string(path).unwrap();

        assert_eq!(
            bundles_in(&document),
            vec![
                "mvn:org.eclipse.jetty/jetty-servlets/9.2.19.v20160908/jar",
                "mvn:org.example.app/webapp/2.10.0/jar/app",
                "mvn:org.example.app/webapp/2.10.0/jar/admin",
            ]
        );
    }

    #[test]
    fn exclude_filters_the_base_set_only() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let packages = [package(&root, "ui/app", "app")];

        // This pattern matches the runtime dependency AND the per-package
        // coordinate; only the base entry goes away.
        let options = FeatureOptions {
            extend: vec![],
            exclude: vec!["jetty|webapp".to_string()],
        };
        let path = generate_features(&root, &project("jar"), &packages, &options).unwrap();
        let document = fs::read_to_string(path).unwrap();

        assert_eq!(
            bundles_in(&document),
            vec!["mvn:org.example.app/webapp/2.10.0/jar/app"]
        );
    }

    #[test]
    fn extend_inherits_bundles_verbatim_in_order() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let inherited = root.join("base-features.xml");
        fs::write(
            &inherited,
            r#"<features name="base-1.0.0">
    <feature name="base" install="auto" version="1.0.0">
        <bundle>mvn:org.example/zzz/1.0.0/jar</bundle>
        <bundle>mvn:org.example/aaa/1.0.0/jar</bundle>
    </feature>
</features>
"#,
        )
        .unwrap();

        let options = FeatureOptions {
            extend: vec![inherited],
            exclude: vec![],
        };
        let path = generate_features(&root, &project("bundle"), &[], &options).unwrap();
        let document = fs::read_to_string(path).unwrap();

        // inherited order preserved; the fixed base set is NOT added
        assert_eq!(
            bundles_in(&document),
            vec![
                "mvn:org.example/zzz/1.0.0/jar",
                "mvn:org.example/aaa/1.0.0/jar",
            ]
        );
    }

    #[test]
    fn extend_concatenates_multiple_files() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let first = root.join("first.xml");
        fs::write(
            &first,
            "<features><feature><bundle>mvn:a/a/1</bundle></feature></features>",
        )
        .unwrap();
        let second = root.join("second.xml");
        fs::write(
            &second,
            "<features><feature><bundle>mvn:b/b/2</bundle></feature></features>",
        )
        .unwrap();

        let options = FeatureOptions {
            extend: vec![first, second],
            exclude: vec![],
        };
        let path = generate_features(&root, &project("jar"), &[], &options).unwrap();
        let document = fs::read_to_string(path).unwrap();

        assert_eq!(bundles_in(&document), vec!["mvn:a/a/1", "mvn:b/b/2"]);
    }

    #[test]
    fn document_carries_the_project_name_and_version() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let path =
            generate_features(&root, &project("jar"), &[], &FeatureOptions::default()).unwrap();
        let document = fs::read_to_string(path).unwrap();

        assert!(document.starts_with(r#"<features name="webapp-2.10.0""#));
        assert!(document.contains(r#"<feature name="webapp" install="auto" version="2.10.0">"#));
    }

    #[test]
    fn invalid_exclude_pattern_is_a_configuration_error() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let options = FeatureOptions {
            extend: vec![],
            exclude: vec!["[unclosed".to_string()],
        };
        let err = generate_features(&root, &project("jar"), &[], &options).unwrap_err();
        assert!(err.to_string().contains("invalid exclude pattern"));
    }

    #[test]
    fn missing_extend_file_is_an_io_error() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let options = FeatureOptions {
            extend: vec![root.join("absent.xml")],
            exclude: vec![],
        };
        let err = generate_features(&root, &project("jar"), &[], &options).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
