//! C/C++ extractor
//!
//! Build systems are tried in a fixed order: CMake, qmake, Meson, Autotools.
//! A directory with none of them is reported with the `Makefile` label.

use super::common::{
    dir_exists, file_exists, has_files_with_extensions, push_unique, read_file,
    strip_line_comments,
};
use super::{ExtractError, Extractor};
use crate::metadata::ProjectMetadata;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

const CMAKE: &str = "CMakeLists.txt";
const QMAKE: &str = ".qmake.conf";
const MESON: &str = "meson.build";
const AUTOTOOLS: &str = "configure.ac";

const MARKER_FILES: &[&str] = &[CMAKE, QMAKE, "Makefile", AUTOTOOLS, MESON];
const SOURCE_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "hpp", "hxx", "h"];

static CMAKE_PROJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)project\s*\(\s*([^\s)]+)(?:\s+VERSION\s+([0-9.]+))?(?:\s+DESCRIPTION\s+"([^"]+)")?"#)
        .expect("valid regex")
});
static CMAKE_MINIMUM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)cmake_minimum_required\s*\(\s*VERSION\s+([0-9.]+)").expect("valid regex")
});
static CXX_STANDARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)set\s*\(\s*CMAKE_CXX_STANDARD\s+(\d+)\s*\)").expect("valid regex")
});
static C_STANDARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)set\s*\(\s*CMAKE_C_STANDARD\s+(\d+)\s*\)").expect("valid regex")
});
static ADD_EXECUTABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)add_executable\s*\(\s*([^\s)]+)").expect("valid regex"));
static ADD_LIBRARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)add_library\s*\(\s*([^\s)]+)").expect("valid regex"));
static FIND_PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)find_package\s*\(\s*([^\s)]+)").expect("valid regex"));
static ADD_SUBDIRECTORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)add_subdirectory\s*\(\s*([^\s)]+)").expect("valid regex"));

static MODULE_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"MODULE_VERSION\s*=\s*([0-9]+\.[0-9]+(?:\.[0-9]+)?)").expect("valid regex")
});
static QMAKE_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bVERSION\s*=\s*([0-9]+\.[0-9]+(?:\.[0-9]+)?)").expect("valid regex")
});

static MESON_PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bproject\s*\(\s*'([^']+)'").expect("valid regex"));
static MESON_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)project\s*\([^)]*version\s*:\s*'([^']+)'").expect("valid regex")
});
static MESON_EXECUTABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexecutable\s*\(\s*'([^']+)'").expect("valid regex"));
static MESON_LIBRARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:shared_|static_|both_)?library\s*\(\s*'([^']+)'").expect("valid regex")
});
static MESON_DEPENDENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdependency\s*\(\s*'([^']+)'").expect("valid regex"));
static MESON_STD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(cpp_std|c_std)\s*=\s*([^']+)'").expect("valid regex"));

static AC_INIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"AC_INIT\s*\(\s*\[?([^\],]+)\]?\s*,\s*\[?([^\],]+)\]?").expect("valid regex")
});
static PKG_CHECK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PKG_CHECK_MODULES\s*\(\s*\[?[^\],]+\]?\s*,\s*\[?([^\],)]+)\]?").expect("valid regex")
});

pub struct CppExtractor;

impl Extractor for CppExtractor {
    fn name(&self) -> &'static str {
        "cpp"
    }

    fn detect(&self, path: &Path) -> bool {
        if MARKER_FILES.iter().any(|marker| file_exists(path, marker)) {
            return true;
        }
        if has_files_with_extensions(path, SOURCE_EXTENSIONS) {
            return true;
        }
        dir_exists(path, "src") && has_files_with_extensions(&path.join("src"), SOURCE_EXTENSIONS)
    }

    fn extract(&self, path: &Path) -> Result<ProjectMetadata, ExtractError> {
        let parsers: [(&str, &str, fn(&str) -> ProjectMetadata); 4] = [
            (CMAKE, "CMake", parse_cmake),
            (QMAKE, "qmake", parse_qmake),
            (MESON, "Meson", parse_meson),
            (AUTOTOOLS, "Autotools", parse_autotools),
        ];

        for (file, build_system, parse) in parsers {
            let manifest_path = path.join(file);
            if !manifest_path.is_file() {
                continue;
            }
            let content = read_file(&manifest_path)?;
            let mut metadata = parse(&content);
            metadata.language_specific.insert("build_system", build_system);
            debug!(file, build_system, "parsed C/C++ build file");
            return Ok(metadata);
        }

        let mut metadata = ProjectMetadata::new();
        metadata.language_specific.insert("build_system", "Makefile");
        Ok(metadata)
    }
}

#[derive(Debug, Default)]
struct Targets {
    executables: Vec<String>,
    libraries: Vec<String>,
    dependencies: Vec<String>,
}

impl Targets {
    fn store(self, metadata: &mut ProjectMetadata) {
        let ls = &mut metadata.language_specific;
        if !self.executables.is_empty() {
            ls.insert("executables", self.executables);
        }
        if !self.libraries.is_empty() {
            ls.insert("libraries", self.libraries);
        }
        ls.insert_list_with_count("dependencies", "dependency_count", self.dependencies);
    }
}

pub fn parse_cmake(content: &str) -> ProjectMetadata {
    let mut metadata = ProjectMetadata::new();
    let mut targets = Targets::default();
    let mut subdirectories = Vec::new();

    for raw in content.lines() {
        let line = raw.trim();
        if line.starts_with('#') {
            continue;
        }

        if let Some(caps) = CMAKE_MINIMUM_RE.captures(line) {
            metadata
                .language_specific
                .insert("cmake_minimum_version", &caps[1]);
        } else if let Some(caps) = CMAKE_PROJECT_RE.captures(line) {
            if metadata.name.is_empty() {
                metadata.name = caps[1].to_string();
                if let Some(version) = caps.get(2) {
                    metadata.set_version(version.as_str(), CMAKE);
                }
                metadata.description = caps.get(3).map(|d| d.as_str().to_string());
            }
        }

        if let Some(caps) = CXX_STANDARD_RE.captures(line) {
            metadata.language_specific.insert("cxx_standard", &caps[1]);
        }
        if let Some(caps) = C_STANDARD_RE.captures(line) {
            metadata.language_specific.insert("c_standard", &caps[1]);
        }
        if let Some(caps) = ADD_EXECUTABLE_RE.captures(line) {
            targets.executables.push(caps[1].to_string());
        }
        if let Some(caps) = ADD_LIBRARY_RE.captures(line) {
            targets.libraries.push(caps[1].to_string());
        }
        if let Some(caps) = FIND_PACKAGE_RE.captures(line) {
            targets.dependencies.push(caps[1].to_string());
        }
        if let Some(caps) = ADD_SUBDIRECTORY_RE.captures(line) {
            push_unique(&mut subdirectories, &caps[1]);
        }
    }

    targets.store(&mut metadata);
    if !subdirectories.is_empty() {
        metadata.language_specific.insert("subdirectories", subdirectories);
    }
    metadata
}

/// `MODULE_VERSION` anywhere in the file beats a plain `VERSION`
pub fn parse_qmake(content: &str) -> ProjectMetadata {
    let mut metadata = ProjectMetadata::new();
    let mut module_version = None;
    let mut plain_version = None;

    for line in content.lines() {
        if let Some(caps) = MODULE_VERSION_RE.captures(line) {
            module_version = Some(caps[1].to_string());
        } else if plain_version.is_none() {
            plain_version = QMAKE_VERSION_RE.captures(line).map(|caps| caps[1].to_string());
        }
    }

    if let Some(version) = module_version.or(plain_version) {
        metadata.set_version(&version, QMAKE);
    }
    metadata
}

pub fn parse_meson(content: &str) -> ProjectMetadata {
    let mut metadata = ProjectMetadata::new();
    let code = strip_line_comments(content, "#", &['\'', '"']);

    if let Some(caps) = MESON_PROJECT_RE.captures(&code) {
        metadata.name = caps[1].to_string();
    }
    if let Some(caps) = MESON_VERSION_RE.captures(&code) {
        metadata.set_version(&caps[1], MESON);
    }

    let names = |re: &Regex| -> Vec<String> {
        re.captures_iter(&code).map(|caps| caps[1].to_string()).collect()
    };
    let targets = Targets {
        executables: names(&MESON_EXECUTABLE_RE),
        libraries: names(&MESON_LIBRARY_RE),
        dependencies: names(&MESON_DEPENDENCY_RE),
    };

    for caps in MESON_STD_RE.captures_iter(&code) {
        let key = if &caps[1] == "cpp_std" {
            "cxx_standard"
        } else {
            "c_standard"
        };
        metadata.language_specific.insert(key, caps[2].trim());
    }

    targets.store(&mut metadata);
    metadata
}

pub fn parse_autotools(content: &str) -> ProjectMetadata {
    let mut metadata = ProjectMetadata::new();
    let mut dependencies = Vec::new();

    for raw in content.lines() {
        let line = raw.trim();
        if line.starts_with('#') || line.starts_with("dnl") {
            continue;
        }

        if let Some(caps) = AC_INIT_RE.captures(line) {
            metadata.name = caps[1].trim().to_string();
            metadata.set_version(caps[2].trim(), AUTOTOOLS);
        }
        if let Some(caps) = PKG_CHECK_RE.captures(line) {
            if let Some(module) = caps[1].split_whitespace().next() {
                dependencies.push(module.to_string());
            }
        }
    }

    metadata
        .language_specific
        .insert_list_with_count("dependencies", "dependency_count", dependencies);
    metadata
}
