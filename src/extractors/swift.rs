//! Swift Package Manager extractor
//!
//! `Package.swift` is Swift source. The `Package(...)` initializer call is
//! located and its top-level arguments (`platforms:`, `products:`, `targets:`)
//! are cut out by bracket matching; the entries inside each are then picked
//! up with regexes.

use super::common::{file_exists, read_file, strip_block_comments, strip_line_comments};
use super::{ExtractError, Extractor};
use crate::matrix;
use crate::metadata::ProjectMetadata;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

const MANIFEST: &str = "Package.swift";

static TOOLS_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^//\s*swift-tools-version\s*[:\s]\s*([0-9][0-9.]*)").expect("valid regex")
});
static PACKAGE_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bPackage\s*\(").expect("valid regex"));
static NAME_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bname:\s*"([^"]*)""#).expect("valid regex"));
static PLATFORM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\.(\w+)\s*\(\s*(?:\.v(\d+(?:_\d+)*)|"([^"]+)")"#).expect("valid regex")
});
static PRODUCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(library|executable|plugin)\s*\(").expect("valid regex"));
static TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(target|executableTarget|testTarget|binaryTarget|systemLibrary|plugin|macro)\s*\(")
        .expect("valid regex")
});
static DEPENDENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.package\s*\(").expect("valid regex"));
static URL_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\b(?:url|path):\s*"([^"]*)""#).expect("valid regex"));
static VERSION_ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:from|exact|branch|revision):\s*"([^"]+)""#).expect("valid regex")
});
static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"\s*(\.\.[.<])\s*"([^"]+)""#).expect("valid regex"));
static TARGETS_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\btargets:\s*\[([^\]]*)\]").expect("valid regex"));
static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("valid regex"));

pub struct SwiftExtractor;

impl Extractor for SwiftExtractor {
    fn name(&self) -> &'static str {
        "swift"
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
        Ok(parse_package_swift(&content))
    }
}

pub fn parse_package_swift(content: &str) -> ProjectMetadata {
    let mut metadata = ProjectMetadata::new();

    let tools_version = TOOLS_VERSION_RE
        .captures(content)
        .map(|caps| caps[1].trim_end_matches('.').to_string())
        .unwrap_or_default();

    let code = strip_line_comments(&strip_block_comments(content, &['"']), "//", &['"']);
    let package = package_arguments(&code).unwrap_or("");

    if let Some(start) = top_level_value(package, "name") {
        let value = &package[start..];
        if value.starts_with('"') {
            if let Some(caps) = QUOTED_RE.captures(value) {
                metadata.name = caps[1].to_string();
            }
        }
    }

    let platforms = top_level_array(package, "platforms")
        .map(parse_platforms)
        .unwrap_or_default();
    let products = top_level_array(package, "products")
        .map(parse_products)
        .unwrap_or_default();
    let targets = top_level_array(package, "targets")
        .map(parse_targets)
        .unwrap_or_default();
    let dependencies = parse_dependencies(&code);

    let is_library = products.iter().any(|p| p["type"] == "library");
    let is_executable = products.iter().any(|p| p["type"] == "executable")
        || targets.iter().any(|t| t["type"] == "executableTarget");

    metadata.set_version(&tools_version, MANIFEST);

    let ls = &mut metadata.language_specific;
    ls.insert_text("package_name", &metadata.name);
    ls.insert_text("swift_tools_version", &tools_version);
    ls.insert("metadata_source", MANIFEST);
    ls.insert_records_with_count("platforms", "platform_count", platforms);
    ls.insert_records_with_count("products", "product_count", products);
    ls.insert_records_with_count("dependencies", "dependency_count", dependencies);
    ls.insert_records_with_count("targets", "target_count", targets);
    if is_library {
        ls.insert("is_library", true);
    }
    if is_executable {
        ls.insert("is_executable", true);
    }

    let (versions, json) = matrix::SWIFT.matrix_with_json(&tools_version);
    ls.insert("swift_version_matrix", versions);
    ls.insert("matrix_json", json);

    metadata
}

/// Short package name from a repository URL: last path segment without `.git`
pub fn name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed.rsplit('/').next().unwrap_or_default().to_string()
}

/// Splits a list of quoted strings such as `"A", "B"`
pub fn parse_string_array(input: &str) -> Vec<String> {
    QUOTED_RE
        .captures_iter(input)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn parse_platforms(section: &str) -> Vec<BTreeMap<String, String>> {
    PLATFORM_RE
        .captures_iter(section)
        .map(|caps| {
            let version = match (caps.get(2), caps.get(3)) {
                (Some(v), _) => v.as_str().replace('_', "."),
                (None, Some(v)) => v.as_str().to_string(),
                _ => String::new(),
            };
            record(&[("name", &caps[1]), ("version", version.as_str())])
        })
        .collect()
}

fn parse_products(section: &str) -> Vec<BTreeMap<String, String>> {
    calls(section, &PRODUCT_RE)
        .into_iter()
        .filter_map(|(kind, args)| {
            let name = NAME_ARG_RE.captures(args)?[1].to_string();
            let targets = TARGETS_ARG_RE
                .captures(args)
                .map(|caps| parse_string_array(&caps[1]).join(", "))
                .unwrap_or_default();
            Some(record(&[("name", name.as_str()), ("type", kind), ("targets", targets.as_str())]))
        })
        .collect()
}

fn parse_targets(section: &str) -> Vec<BTreeMap<String, String>> {
    calls(section, &TARGET_RE)
        .into_iter()
        .filter_map(|(kind, args)| {
            let name = NAME_ARG_RE.captures(args)?[1].to_string();
            Some(record(&[("name", name.as_str()), ("type", kind)]))
        })
        .collect()
}

fn parse_dependencies(code: &str) -> Vec<BTreeMap<String, String>> {
    calls(code, &DEPENDENCY_RE)
        .into_iter()
        .filter_map(|(_, args)| {
            let url = URL_ARG_RE.captures(args)?[1].to_string();
            let name = NAME_ARG_RE
                .captures(args)
                .map(|caps| caps[1].to_string())
                .unwrap_or_else(|| name_from_url(&url));
            let version = if let Some(caps) = RANGE_RE.captures(args) {
                format!("{}{}{}", &caps[1], &caps[2], &caps[3])
            } else {
                VERSION_ARG_RE
                    .captures(args)
                    .map(|caps| caps[1].to_string())
                    .unwrap_or_default()
            };
            Some(record(&[
                ("url", url.as_str()),
                ("name", name.as_str()),
                ("version", version.as_str()),
            ]))
        })
        .collect()
}

/// Calls matched by `re` (which must end at the opening parenthesis) paired
/// with their argument text. Only calls at the outermost nesting level of
/// `text` are returned, so `.product(...)` inside a target is skipped.
fn calls<'a>(text: &'a str, re: &Regex) -> Vec<(&'a str, &'a str)> {
    let mut found = Vec::new();
    let mut resume = 0;

    for caps in re.captures_iter(text) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        if whole.start() < resume {
            continue;
        }
        let open = whole.end() - 1;
        let close = match matching_close(text, open) {
            Some(close) => close,
            None => break,
        };
        let kind = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        found.push((kind, &text[open + 1..close]));
        resume = close;
    }

    found
}

/// Argument text of the `Package(...)` initializer
fn package_arguments(code: &str) -> Option<&str> {
    let m = PACKAGE_CALL_RE.find(code)?;
    let open = m.end() - 1;
    let close = matching_close(code, open)?;
    Some(&code[open + 1..close])
}

/// Offset just past `key:` where `key` appears as an argument label at nesting depth zero
fn top_level_value(args: &str, key: &str) -> Option<usize> {
    let bytes = args.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            _ if depth == 0 && bytes[i..].starts_with(key.as_bytes()) => {
                let boundary = i == 0 || !is_ident(bytes[i - 1]);
                let rest = &args[i + key.len()..];
                let after_ws = rest.trim_start();
                if boundary && after_ws.starts_with(':') {
                    let value = after_ws[1..].trim_start();
                    return Some(args.len() - value.len());
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Inner text of the array literal passed as top-level argument `key`
fn top_level_array<'a>(args: &'a str, key: &str) -> Option<&'a str> {
    let start = top_level_value(args, key)?;
    if !args[start..].starts_with('[') {
        return None;
    }
    let close = matching_close(args, start)?;
    Some(&args[start + 1..close])
}

/// Index of the bracket closing the one at `open`, skipping string literals
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Index just past the string literal starting at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn record(fields: &[(&str, &str)]) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
