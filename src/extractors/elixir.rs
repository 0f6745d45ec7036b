//! Elixir extractor for Mix projects
//!
//! `mix.exs` is Elixir code, so it is scanned line by line rather than parsed.
//! The `package:` and `links:` sections are tracked with a one-level block
//! tracker: entered when the opening token is seen, left on a line that closes
//! a bracket without opening one.

use super::common::{dir_exists, file_exists, has_files_with_extensions, read_file};
use super::{ExtractError, Extractor};
use crate::matrix;
use crate::metadata::ProjectMetadata;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

const MANIFEST: &str = "mix.exs";

static APP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"app:\s*:(\w+)").expect("valid regex"));
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"version:\s*"([^"]+)""#).expect("valid regex"));
static VERSION_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^@version\s+"([^"]+)""#).expect("valid regex"));
static VERSION_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bversion:\s*@version\b").expect("valid regex"));
static ELIXIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"elixir:\s*"([^"]+)""#).expect("valid regex"));
static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"description:\s*"([^"]+)""#).expect("valid regex"));
static PACKAGE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"package:\s*\[").expect("valid regex"));
static PACKAGE_FN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"defp\s+package\s+do").expect("valid regex"));
static LICENSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"licenses:\s*\["([^"]+)""#).expect("valid regex"));
static LINKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"links:\s*%\{").expect("valid regex"));
static LINK_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"\s*=>\s*"([^"]+)""#).expect("valid regex"));
static DEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{:(\w+),\s*"([^"]+)""#).expect("valid regex"));

/// Dependency name → framework, checked per dependency in declaration order
const FRAMEWORKS: &[(&str, &str)] = &[
    ("phoenix", "Phoenix"),
    ("nerves", "Nerves"),
    ("plug", "Plug"),
];

pub struct ElixirExtractor;

impl Extractor for ElixirExtractor {
    fn name(&self) -> &'static str {
        "elixir"
    }

    fn detect(&self, path: &Path) -> bool {
        if file_exists(path, MANIFEST) {
            return true;
        }
        if dir_exists(path, "lib") && has_files_with_extensions(&path.join("lib"), &["ex"]) {
            return true;
        }
        has_files_with_extensions(path, &["ex", "exs"])
    }

    fn extract(&self, path: &Path) -> Result<ProjectMetadata, ExtractError> {
        let manifest_path = path.join(MANIFEST);
        if !manifest_path.is_file() {
            return Err(ExtractError::manifest_not_found(MANIFEST));
        }

        let content = read_file(&manifest_path)?;
        let mut metadata = parse_mix_exs(&content);
        metadata.language_specific.insert("build_tool", "Mix");
        Ok(metadata)
    }
}

#[derive(Debug, Default)]
struct BlockTracker {
    in_package: bool,
    in_links: bool,
}

pub fn parse_mix_exs(content: &str) -> ProjectMetadata {
    let mut metadata = ProjectMetadata::new();
    let mut blocks = BlockTracker::default();
    let mut dependencies: Vec<String> = Vec::new();
    let mut elixir_version = String::new();
    let mut version = String::new();
    let mut version_attr: Option<String> = None;
    let mut version_from_attr = false;

    for raw in content.lines() {
        let line = raw.trim();
        if line.starts_with('#') {
            continue;
        }

        if let Some(caps) = APP_RE.captures(line) {
            metadata.name = caps[1].to_string();
        }
        if let Some(caps) = VERSION_ATTR_RE.captures(line) {
            version_attr = Some(caps[1].to_string());
        } else if let Some(caps) = VERSION_RE.captures(line) {
            version = caps[1].to_string();
        } else if VERSION_REF_RE.is_match(line) {
            version_from_attr = true;
        }
        if let Some(caps) = ELIXIR_RE.captures(line) {
            elixir_version = caps[1].to_string();
        }
        if let Some(caps) = DESCRIPTION_RE.captures(line) {
            metadata.description = Some(caps[1].to_string());
        }

        if PACKAGE_BLOCK_RE.is_match(line) || PACKAGE_FN_RE.is_match(line) {
            blocks.in_package = true;
        }
        if blocks.in_package {
            if let Some(caps) = LICENSE_RE.captures(line) {
                metadata.license = Some(caps[1].to_string());
            }
        }

        if LINKS_RE.is_match(line) {
            blocks.in_links = true;
        }
        if blocks.in_links {
            if let Some(caps) = LINK_ENTRY_RE.captures(line) {
                if &caps[1] == "GitHub" || &caps[1] == "Homepage" {
                    metadata.homepage = Some(caps[2].to_string());
                }
            }
        }

        if blocks.in_package && line.contains(']') && !line.contains('[') {
            blocks.in_package = false;
        }
        if blocks.in_links && line.contains('}') && !line.contains("%{") {
            blocks.in_links = false;
        }

        if let Some(caps) = DEP_RE.captures(line) {
            dependencies.push(format!("{}:{}", &caps[1], &caps[2]));
        }
    }

    if version.is_empty() && version_from_attr {
        version = version_attr.unwrap_or_default();
    }
    metadata.set_version(&version, MANIFEST);

    let ls = &mut metadata.language_specific;
    if !elixir_version.is_empty() {
        ls.insert("elixir_version", elixir_version.as_str());
        ls.insert("elixir_version_matrix", matrix::elixir_matrix(&elixir_version));
    }
    if let Some(framework) = detect_framework(&dependencies) {
        ls.insert("framework", framework);
    }
    ls.insert_list_with_count("dependencies", "dependency_count", dependencies);

    metadata
}

/// First dependency that names a known framework wins
pub fn detect_framework(dependencies: &[String]) -> Option<&'static str> {
    dependencies.iter().find_map(|dep| {
        let name = dep.split(':').next().unwrap_or_default();
        FRAMEWORKS
            .iter()
            .find(|(package, _)| *package == name)
            .map(|(_, framework)| *framework)
    })
}
