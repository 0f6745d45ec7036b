//! Scala extractor for SBT and Mill builds

use super::common::{dir_exists, file_contains, file_exists, has_files_with_extensions, read_file, read_optional};
use super::{ExtractError, Extractor};
use crate::matrix;
use crate::metadata::ProjectMetadata;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bname\s*:=\s*"([^"]+)""#).expect("valid regex"));
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bversion\s*:=\s*"([^"]+)""#).expect("valid regex"));
static SCALA_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"scalaVersion\s*:=\s*"([^"]+)""#).expect("valid regex"));
static ORGANIZATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\borganization\s*:=\s*"([^"]+)""#).expect("valid regex"));
static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bdescription\s*:=\s*"([^"]+)""#).expect("valid regex"));
static HOMEPAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"homepage\s*:=\s*Some\(url\("([^"]+)"\)\)"#).expect("valid regex")
});
static LICENSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"licenses\s*:=\s*Seq\(\s*"([^"]+)""#).expect("valid regex"));
/// Dependency declared on the `libraryDependencies` line itself
static INLINE_DEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"libraryDependencies\s*\+\+?=\s*(?:Seq\()?\s*"([^"]+)"\s*%+\s*"([^"]+)"\s*%\s*"([^"]+)""#,
    )
    .expect("valid regex")
});
/// `"org" %% "artifact" % "version"` on its own line inside a `Seq(` block
static BLOCK_DEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*"([^"]+)"\s*%%?\s*"([^"]+)"\s*%\s*"([^"]+)""#).expect("valid regex")
});
static SBT_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sbt\.version\s*=\s*([0-9.]+)").expect("valid regex"));
static PLAY_PLUGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"enablePlugins\([^)]*\bPlayScala\b").expect("valid regex"));

static MILL_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"object\s+(\w+)\s+extends").expect("valid regex"));
static MILL_SCALA_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"def\s+scalaVersion\s*=\s*"([^"]+)""#).expect("valid regex"));
static MILL_PUBLISH_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"def\s+publishVersion\s*=\s*"([^"]+)""#).expect("valid regex"));
static MILL_IVY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"ivy"([^:]+)::?([^:]+):([^"]+)""#).expect("valid regex"));

/// Artifact prefix → framework
const FRAMEWORKS: &[(&str, &str)] = &[
    ("akka-", "Akka"),
    ("http4s-", "http4s"),
    ("zio", "ZIO"),
    ("spark-", "Spark"),
];

pub struct ScalaExtractor;

impl Extractor for ScalaExtractor {
    fn name(&self) -> &'static str {
        "scala"
    }

    fn detect(&self, path: &Path) -> bool {
        file_exists(path, "build.sbt")
            || file_exists(path, "project/build.properties")
            || file_exists(path, "build.sc")
            || file_contains(path, "pom.xml", "scala")
            || dir_exists(path, "src/main/scala")
            || has_files_with_extensions(path, &["scala"])
            || has_files_with_extensions(&path.join("src"), &["scala"])
    }

    fn extract(&self, path: &Path) -> Result<ProjectMetadata, ExtractError> {
        if let Some(content) = read_optional(path, "build.sbt")? {
            let mut metadata = parse_build_sbt(&content);
            let ls = &mut metadata.language_specific;
            ls.insert("build_tool", "SBT");
            if let Some(sbt_version) = sbt_version(path)? {
                ls.insert("sbt_version", sbt_version);
            }
            return Ok(metadata);
        }

        let mill_path = path.join("build.sc");
        if mill_path.is_file() {
            let content = read_file(&mill_path)?;
            let mut metadata = parse_mill(&content);
            metadata.language_specific.insert("build_tool", "Mill");
            return Ok(metadata);
        }

        Err(ExtractError::manifest_not_found("build.sbt"))
    }
}

/// Parses an SBT build definition.
///
/// Multi-line `libraryDependencies ++= Seq(` blocks are followed by counting
/// parentheses per line; the block ends once the depth returns to zero.
pub fn parse_build_sbt(content: &str) -> ProjectMetadata {
    let mut metadata = ProjectMetadata::new();
    let mut dependencies: Vec<String> = Vec::new();
    let mut scala_version = String::new();
    let mut version = String::new();
    let mut in_dependencies = false;
    let mut depth: i32 = 0;
    let mut play = false;

    for raw in content.lines() {
        let line = raw.trim();
        if line.starts_with("//") {
            continue;
        }

        if let Some(caps) = NAME_RE.captures(line) {
            metadata.name = caps[1].to_string();
        }
        if let Some(caps) = VERSION_RE.captures(line) {
            version = caps[1].to_string();
        }
        if let Some(caps) = SCALA_VERSION_RE.captures(line) {
            scala_version = caps[1].to_string();
        }
        if let Some(caps) = ORGANIZATION_RE.captures(line) {
            metadata.language_specific.insert("organization", &caps[1]);
        }
        if let Some(caps) = DESCRIPTION_RE.captures(line) {
            metadata.description = Some(caps[1].to_string());
        }
        if let Some(caps) = HOMEPAGE_RE.captures(line) {
            metadata.homepage = Some(caps[1].to_string());
        }
        if let Some(caps) = LICENSE_RE.captures(line) {
            metadata.license = Some(caps[1].to_string());
        }
        if PLAY_PLUGIN_RE.is_match(line) {
            play = true;
        }
        if let Some(caps) = INLINE_DEP_RE.captures(line) {
            dependencies.push(format!("{}:{}:{}", &caps[1], &caps[2], &caps[3]));
        }

        if line.contains("libraryDependencies") && line.contains("Seq(") {
            depth = paren_balance(line);
            // a Seq closed on the same line was fully handled above
            in_dependencies = depth > 0;
            continue;
        }

        if in_dependencies {
            if let Some(caps) = BLOCK_DEP_RE.captures(line) {
                dependencies.push(format!("{}:{}:{}", &caps[1], &caps[2], &caps[3]));
            }
            depth += paren_balance(line);
            if depth <= 0 {
                in_dependencies = false;
                depth = 0;
            }
        }
    }

    metadata.set_version(&version, "build.sbt");

    let framework = if play {
        Some("Play")
    } else {
        detect_framework(&dependencies)
    };
    finish(&mut metadata, &scala_version, dependencies, framework);
    metadata
}

/// Parses a Mill `build.sc`; the first module object names the project
pub fn parse_mill(content: &str) -> ProjectMetadata {
    let mut metadata = ProjectMetadata::new();
    let mut dependencies: Vec<String> = Vec::new();
    let mut scala_version = String::new();
    let mut version = String::new();

    for raw in content.lines() {
        let line = raw.trim();
        if line.starts_with("//") {
            continue;
        }

        if metadata.name.is_empty() {
            if let Some(caps) = MILL_OBJECT_RE.captures(line) {
                metadata.name = caps[1].to_string();
            }
        }
        if let Some(caps) = MILL_SCALA_VERSION_RE.captures(line) {
            scala_version = caps[1].to_string();
        }
        if let Some(caps) = MILL_PUBLISH_VERSION_RE.captures(line) {
            version = caps[1].to_string();
        }
        for caps in MILL_IVY_RE.captures_iter(line) {
            dependencies.push(format!("{}:{}:{}", &caps[1], &caps[2], &caps[3]));
        }
    }

    metadata.set_version(&version, "build.sc");
    let framework = detect_framework(&dependencies);
    finish(&mut metadata, &scala_version, dependencies, framework);
    metadata
}

fn finish(
    metadata: &mut ProjectMetadata,
    scala_version: &str,
    dependencies: Vec<String>,
    framework: Option<&'static str>,
) {
    let ls = &mut metadata.language_specific;
    if !scala_version.is_empty() {
        ls.insert("scala_version", scala_version);
        ls.insert("scala_version_matrix", matrix::scala_matrix(scala_version));
    }
    if let Some(framework) = framework {
        ls.insert("framework", framework);
    }
    ls.insert_list_with_count("dependencies", "dependency_count", dependencies);
}

fn sbt_version(path: &Path) -> Result<Option<String>, ExtractError> {
    let content = read_optional(path, "project/build.properties")?;
    Ok(content.and_then(|c| SBT_VERSION_RE.captures(&c).map(|caps| caps[1].to_string())))
}

fn paren_balance(line: &str) -> i32 {
    line.matches('(').count() as i32 - line.matches(')').count() as i32
}

/// Framework implied by the first dependency with a known artifact prefix
pub fn detect_framework(dependencies: &[String]) -> Option<&'static str> {
    dependencies.iter().find_map(|dep| {
        let artifact = dep.split(':').nth(1).unwrap_or_default();
        FRAMEWORKS
            .iter()
            .find(|(prefix, _)| artifact.starts_with(prefix))
            .map(|(_, framework)| *framework)
    })
}
