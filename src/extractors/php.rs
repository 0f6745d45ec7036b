//! PHP extractor for Composer projects

use super::common::{file_exists, read_file};
use super::{ExtractError, Extractor};
use crate::matrix;
use crate::metadata::{format_author, non_empty, ProjectMetadata};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

const MANIFEST: &str = "composer.json";

/// Required package → framework name, checked in order
const FRAMEWORKS: &[(&str, &str)] = &[
    ("laravel/framework", "Laravel"),
    ("symfony/framework-bundle", "Symfony"),
    ("symfony/symfony", "Symfony"),
    ("cakephp/cakephp", "CakePHP"),
];

pub struct PhpExtractor;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComposerManifest {
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    package_type: Option<String>,
    license: Value,
    homepage: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    authors: Vec<ComposerAuthor>,
    #[serde(deserialize_with = "null_as_default")]
    support: ComposerSupport,
    #[serde(deserialize_with = "null_as_default")]
    require: BTreeMap<String, String>,
    #[serde(rename = "require-dev", deserialize_with = "null_as_default")]
    require_dev: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    autoload: ComposerAutoload,
    #[serde(deserialize_with = "null_as_default")]
    scripts: BTreeMap<String, Value>,
    bin: Value,
    #[serde(rename = "minimum-stability")]
    minimum_stability: Option<String>,
    #[serde(rename = "prefer-stable")]
    prefer_stable: Option<bool>,
    #[serde(deserialize_with = "null_as_default")]
    keywords: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComposerAuthor {
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComposerSupport {
    source: Option<String>,
    issues: Option<String>,
    docs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComposerAutoload {
    #[serde(rename = "psr-4", deserialize_with = "null_as_default")]
    psr4: BTreeMap<String, Value>,
    #[serde(rename = "psr-0", deserialize_with = "null_as_default")]
    psr0: BTreeMap<String, Value>,
    #[serde(deserialize_with = "null_as_default")]
    classmap: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    files: Vec<String>,
}

/// Treats an explicit `null` like a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Extractor for PhpExtractor {
    fn name(&self) -> &'static str {
        "php"
    }

    fn detect(&self, path: &Path) -> bool {
        file_exists(path, MANIFEST)
    }

    fn extract(&self, path: &Path) -> Result<ProjectMetadata, ExtractError> {
        let manifest_path = path.join(MANIFEST);
        if !manifest_path.is_file() {
            return Err(ExtractError::manifest_not_found(MANIFEST));
        }

        let content = read_file(&manifest_path)?;
        let manifest: ComposerManifest =
            serde_json::from_str(&content).map_err(|e| ExtractError::parse(MANIFEST, e))?;

        debug!("Parsed {} for {:?}", MANIFEST, manifest.name);
        Ok(build_metadata(manifest))
    }
}

fn build_metadata(manifest: ComposerManifest) -> ProjectMetadata {
    let name = manifest.name.unwrap_or_default();
    let mut metadata = ProjectMetadata {
        name: name.clone(),
        description: manifest.description.as_deref().and_then(non_empty),
        homepage: manifest.homepage.as_deref().and_then(non_empty),
        license: license_string(&manifest.license),
        repository: manifest.support.source.as_deref().and_then(non_empty),
        authors: manifest
            .authors
            .iter()
            .filter_map(|a| {
                format_author(
                    a.name.as_deref().unwrap_or_default(),
                    a.email.as_deref().unwrap_or_default(),
                )
            })
            .collect(),
        ..Default::default()
    };
    metadata.set_version(manifest.version.as_deref().unwrap_or_default(), MANIFEST);

    let ls = &mut metadata.language_specific;
    ls.insert_text("package_name", &name);

    let package_type = manifest
        .package_type
        .as_deref()
        .and_then(non_empty)
        .unwrap_or_else(|| "library".to_string());
    ls.insert("is_library", package_type == "library");
    ls.insert("package_type", package_type);

    let requires_php = manifest.require.get("php").cloned().unwrap_or_default();
    ls.insert_text("requires_php", &requires_php);

    let (dependencies, extensions) = split_requirements(&manifest.require);
    ls.insert("dependency_count", dependencies.len());
    ls.insert("dependencies", dependencies);
    ls.insert_list_with_count("php_extensions", "extension_count", extensions);

    let (dev_dependencies, _) = split_requirements(&manifest.require_dev);
    ls.insert_map_with_count("dev_dependencies", "dev_dependency_count", dev_dependencies);

    let autoload = &manifest.autoload;
    let mut autoload_types = Vec::new();
    if !autoload.psr4.is_empty() {
        autoload_types.push("psr-4".to_string());
        ls.insert("psr4_namespaces", namespace_map(&autoload.psr4));
    }
    if !autoload.psr0.is_empty() {
        autoload_types.push("psr-0".to_string());
        ls.insert("psr0_namespaces", namespace_map(&autoload.psr0));
    }
    if !autoload.classmap.is_empty() {
        autoload_types.push("classmap".to_string());
        ls.insert("classmap_paths", autoload.classmap.clone());
    }
    if !autoload.files.is_empty() {
        autoload_types.push("files".to_string());
        ls.insert("autoload_files", autoload.files.clone());
    }
    if !autoload_types.is_empty() {
        ls.insert("autoload_types", autoload_types);
    }

    let scripts: Vec<String> = manifest.scripts.keys().cloned().collect();
    ls.insert_list_with_count("scripts", "script_count", scripts);

    let binaries = string_or_list(&manifest.bin);
    if !binaries.is_empty() {
        ls.insert("binaries", binaries);
    }

    if let Some(stability) = manifest.minimum_stability.as_deref().and_then(non_empty) {
        ls.insert("minimum_stability", stability);
    }
    if let Some(prefer_stable) = manifest.prefer_stable {
        ls.insert("prefer_stable", prefer_stable);
    }
    if !manifest.keywords.is_empty() {
        ls.insert("keywords", manifest.keywords.clone());
    }
    if let Some(issues) = manifest.support.issues.as_deref().and_then(non_empty) {
        ls.insert("issues_url", issues);
    }
    if let Some(docs) = manifest.support.docs.as_deref().and_then(non_empty) {
        ls.insert("docs_url", docs);
    }
    if let Some(framework) = detect_framework(&manifest.require) {
        ls.insert("framework", framework);
    }

    let (versions, json) = matrix::PHP.matrix_with_json(&requires_php);
    ls.insert("php_version_matrix", versions);
    ls.insert("matrix_json", json);

    metadata
}

/// Splits `require` into package dependencies and `ext-*` extension names.
/// The `php` platform requirement belongs to neither.
fn split_requirements(require: &BTreeMap<String, String>) -> (BTreeMap<String, String>, Vec<String>) {
    let mut dependencies = BTreeMap::new();
    let mut extensions = Vec::new();

    for (package, constraint) in require {
        if package == "php" {
            continue;
        }
        if let Some(extension) = package.strip_prefix("ext-") {
            extensions.push(extension.to_string());
            continue;
        }
        dependencies.insert(package.clone(), constraint.clone());
    }

    (dependencies, extensions)
}

pub fn detect_framework(require: &BTreeMap<String, String>) -> Option<&'static str> {
    FRAMEWORKS
        .iter()
        .find(|(package, _)| require.contains_key(*package))
        .map(|(_, framework)| *framework)
}

fn license_string(license: &Value) -> Option<String> {
    let licenses = string_or_list(license);
    if licenses.is_empty() {
        None
    } else {
        Some(licenses.join(", "))
    }
}

fn string_or_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Namespace → path; multiple paths are joined with `, `
fn namespace_map(entries: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(namespace, paths)| (namespace.clone(), string_or_list(paths).join(", ")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn extract(content: &str) -> ProjectMetadata {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(MANIFEST), content).unwrap();
        PhpExtractor.extract(temp.path()).unwrap()
    }

    #[test]
    fn test_detect() {
        let temp = TempDir::new().unwrap();
        assert!(!PhpExtractor.detect(temp.path()));
        assert!(!PhpExtractor.detect(&temp.path().join("nonexistent")));

        fs::write(temp.path().join(MANIFEST), "{}").unwrap();
        assert!(PhpExtractor.detect(temp.path()));
    }

    #[test]
    fn test_extract_basic() {
        let metadata = extract(
            r#"{
  "name": "vendor/package",
  "version": "1.2.3",
  "description": "A test PHP package",
  "license": "MIT",
  "homepage": "https://example.com",
  "support": {
    "source": "https://github.com/vendor/package",
    "issues": "https://github.com/vendor/package/issues",
    "docs": "https://docs.example.com"
  },
  "authors": [{"name": "John Doe", "email": "john@example.com"}],
  "require": {"php": "^8.1"}
}"#,
        );

        assert_eq!(metadata.name, "vendor/package");
        assert_eq!(metadata.version, "1.2.3");
        assert_eq!(metadata.version_source, "composer.json");
        assert_eq!(metadata.description.as_deref(), Some("A test PHP package"));
        assert_eq!(metadata.license.as_deref(), Some("MIT"));
        assert_eq!(metadata.homepage.as_deref(), Some("https://example.com"));
        assert_eq!(
            metadata.repository.as_deref(),
            Some("https://github.com/vendor/package")
        );
        assert_eq!(metadata.authors, vec!["John Doe <john@example.com>"]);

        let ls = &metadata.language_specific;
        assert_eq!(ls.text("package_name"), Some("vendor/package"));
        assert_eq!(ls.text("package_type"), Some("library"));
        assert_eq!(ls.text("requires_php"), Some("^8.1"));
        assert_eq!(ls.flag("is_library"), Some(true));
        assert_eq!(
            ls.text("issues_url"),
            Some("https://github.com/vendor/package/issues")
        );
        assert_eq!(ls.text("docs_url"), Some("https://docs.example.com"));
        assert_eq!(ls.list("php_version_matrix").unwrap(), ["8.1", "8.2", "8.3"]);
        assert!(ls.text("matrix_json").unwrap().contains("php-version"));
    }

    #[test]
    fn test_dependencies_and_extensions() {
        let metadata = extract(
            r#"{
  "name": "vendor/package",
  "require": {
    "php": "^8.1",
    "ext-json": "*",
    "ext-mbstring": "*",
    "symfony/console": "^6.0",
    "guzzlehttp/guzzle": "^7.5"
  },
  "require-dev": {
    "phpunit/phpunit": "^10.0",
    "phpstan/phpstan": "^1.10"
  }
}"#,
        );
        let ls = &metadata.language_specific;

        let deps = ls.map("dependencies").unwrap();
        assert_eq!(deps["symfony/console"], "^6.0");
        assert_eq!(deps["guzzlehttp/guzzle"], "^7.5");
        assert_eq!(ls.count("dependency_count"), Some(2));

        assert_eq!(ls.map("dev_dependencies").unwrap()["phpunit/phpunit"], "^10.0");
        assert_eq!(ls.count("dev_dependency_count"), Some(2));

        assert_eq!(ls.list("php_extensions").unwrap(), ["json", "mbstring"]);
        assert_eq!(ls.count("extension_count"), Some(2));
    }

    #[test]
    fn test_autoload_sections() {
        let metadata = extract(
            r#"{
  "name": "vendor/package",
  "autoload": {
    "psr-4": {
      "Vendor\\Package\\": "src/",
      "Vendor\\Multi\\": ["lib/", "extra/"]
    },
    "psr-0": {"Vendor_Legacy_": "legacy/"},
    "classmap": ["classes/", "utils/"],
    "files": ["helpers.php", "functions.php"]
  }
}"#,
        );
        let ls = &metadata.language_specific;

        let psr4 = ls.map("psr4_namespaces").unwrap();
        assert_eq!(psr4["Vendor\\Package\\"], "src/");
        assert_eq!(psr4["Vendor\\Multi\\"], "lib/, extra/");
        assert_eq!(ls.map("psr0_namespaces").unwrap()["Vendor_Legacy_"], "legacy/");
        assert_eq!(ls.list("classmap_paths").unwrap(), ["classes/", "utils/"]);
        assert_eq!(ls.list("autoload_files").unwrap(), ["helpers.php", "functions.php"]);
        assert_eq!(
            ls.list("autoload_types").unwrap(),
            ["psr-4", "psr-0", "classmap", "files"]
        );
    }

    #[test]
    fn test_scripts_binaries_and_stability() {
        let metadata = extract(
            r#"{
  "name": "vendor/app",
  "type": "project",
  "scripts": {
    "test": "phpunit",
    "lint": "php-cs-fixer fix",
    "analyze": "phpstan analyse",
    "post-install-cmd": ["@php artisan key:generate"]
  },
  "bin": ["bin/console", "bin/deploy"],
  "minimum-stability": "stable",
  "prefer-stable": true,
  "keywords": ["framework", "api"]
}"#,
        );
        let ls = &metadata.language_specific;

        assert_eq!(ls.count("script_count"), Some(4));
        assert!(ls.list("scripts").unwrap().contains(&"lint".to_string()));
        assert_eq!(ls.list("binaries").unwrap(), ["bin/console", "bin/deploy"]);
        assert_eq!(ls.text("minimum_stability"), Some("stable"));
        assert_eq!(ls.flag("prefer_stable"), Some(true));
        assert_eq!(ls.list("keywords").unwrap(), ["framework", "api"]);
        assert_eq!(ls.text("package_type"), Some("project"));
        assert_eq!(ls.flag("is_library"), Some(false));
    }

    #[test]
    fn test_authors_and_licenses() {
        let metadata = extract(
            r#"{
  "name": "vendor/package",
  "license": ["MIT", "Apache-2.0"],
  "authors": [
    {"name": "John Doe", "email": "john@example.com"},
    {"name": "Jane Smith"},
    {"email": "bot@example.com"},
    {"role": "Contributor"}
  ]
}"#,
        );

        assert_eq!(metadata.license.as_deref(), Some("MIT, Apache-2.0"));
        assert_eq!(
            metadata.authors,
            vec!["John Doe <john@example.com>", "Jane Smith", "<bot@example.com>"]
        );
    }

    #[test]
    fn test_framework_detection() {
        let mut require = BTreeMap::new();
        assert_eq!(detect_framework(&require), None);

        require.insert("guzzlehttp/guzzle".to_string(), "^7.0".to_string());
        assert_eq!(detect_framework(&require), None);

        require.insert("symfony/framework-bundle".to_string(), "^6.0".to_string());
        assert_eq!(detect_framework(&require), Some("Symfony"));

        require.insert("laravel/framework".to_string(), "^10.0".to_string());
        assert_eq!(detect_framework(&require), Some("Laravel"));

        let cake: BTreeMap<_, _> = [("cakephp/cakephp".to_string(), "^4.0".to_string())].into();
        assert_eq!(detect_framework(&cake), Some("CakePHP"));
    }

    #[test]
    fn test_minimal_manifest() {
        let metadata = extract(r#"{"name": "vendor/minimal", "require": {"php": ">=7.4"}}"#);
        assert_eq!(metadata.name, "vendor/minimal");
        assert!(metadata.version.is_empty());
        assert!(metadata.version_source.is_empty());
        assert_eq!(metadata.language_specific.count("dependency_count"), Some(0));
        assert_eq!(
            metadata.language_specific.list("php_version_matrix").unwrap(),
            ["8.1", "8.2", "8.3"]
        );
    }

    #[test]
    fn test_missing_and_invalid_manifest() {
        let temp = TempDir::new().unwrap();
        let err = PhpExtractor.extract(temp.path()).unwrap_err();
        assert!(err.to_string().contains("composer.json not found"));

        fs::write(temp.path().join(MANIFEST), "{ invalid json").unwrap();
        let err = PhpExtractor.extract(temp.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
