//! Terraform extractor
//!
//! Every `*.tf` file in the directory is parsed with the HCL-subset parser.
//! Files the parser rejects, or that yield no top-level blocks, are scanned
//! line by line instead. Both paths feed the same [`TerraformFindings`], which
//! is merged across files.

use super::common::{dir_name, files_with_extensions, read_file};
use super::parsers::hcl::{self, Body, Expr};
use super::{ExtractError, Extractor};
use crate::matrix;
use crate::metadata::ProjectMetadata;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

static REQUIRED_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequired_version\s*=\s*"([^"]+)""#).expect("valid regex")
});
static BACKEND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*backend\s+"([^"]+)""#).expect("valid regex"));
static RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*resource\s+"([^"]+)"\s+"([^"]+)""#).expect("valid regex")
});
static DATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*data\s+"([^"]+)"\s+"([^"]+)""#).expect("valid regex"));
static MODULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*module\s+"([^"]+)""#).expect("valid regex"));
static PROVIDER_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*provider\s+"([^"]+)""#).expect("valid regex"));
static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*variable\s+"([^"]+)""#).expect("valid regex"));
static OUTPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*output\s+"([^"]+)""#).expect("valid regex"));
static REQUIRED_PROVIDERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*required_providers\s*\{").expect("valid regex"));
static PROVIDER_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([\w-]+)\s*=\s*\{").expect("valid regex"));
static PROVIDER_SHORTHAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*([\w-]+)\s*=\s*"([^"]+)""#).expect("valid regex"));
static SOURCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bsource\s*=\s*"([^"]+)""#).expect("valid regex"));
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bversion\s*=\s*"([^"]+)""#).expect("valid regex"));

pub struct TerraformExtractor;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderRequirement {
    pub name: String,
    pub source: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleCall {
    pub name: String,
    pub source: String,
    pub version: String,
}

/// Everything learned from one or more `.tf` files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerraformFindings {
    pub required_version: Option<String>,
    pub backend: Option<String>,
    pub providers: Vec<ProviderRequirement>,
    pub modules: Vec<ModuleCall>,
    pub resource_types: BTreeMap<String, usize>,
    pub data_sources: usize,
    pub variables: Vec<String>,
    pub outputs: Vec<String>,
}

impl TerraformFindings {
    /// Adds a provider; an existing entry keeps its values and only has blanks filled
    pub fn add_provider(&mut self, provider: ProviderRequirement) {
        match self.providers.iter_mut().find(|p| p.name == provider.name) {
            Some(existing) => {
                if existing.source.is_empty() {
                    existing.source = provider.source;
                }
                if existing.version.is_empty() {
                    existing.version = provider.version;
                }
            }
            None => self.providers.push(provider),
        }
    }

    pub fn add_module(&mut self, module: ModuleCall) {
        if !self.modules.iter().any(|m| m.name == module.name) {
            self.modules.push(module);
        }
    }

    pub fn add_resource(&mut self, resource_type: &str) {
        *self
            .resource_types
            .entry(resource_type.to_string())
            .or_insert(0) += 1;
    }

    pub fn resource_count(&self) -> usize {
        self.resource_types.values().sum()
    }

    /// Folds another file's findings in. Scalars keep the first value seen.
    pub fn merge(&mut self, other: TerraformFindings) {
        if self.required_version.is_none() {
            self.required_version = other.required_version;
        }
        if self.backend.is_none() {
            self.backend = other.backend;
        }
        for provider in other.providers {
            self.add_provider(provider);
        }
        for module in other.modules {
            self.add_module(module);
        }
        for (resource_type, count) in other.resource_types {
            *self.resource_types.entry(resource_type).or_insert(0) += count;
        }
        self.data_sources += other.data_sources;
        for variable in other.variables {
            super::common::push_unique(&mut self.variables, &variable);
        }
        for output in other.outputs {
            super::common::push_unique(&mut self.outputs, &output);
        }
    }
}

impl Extractor for TerraformExtractor {
    fn name(&self) -> &'static str {
        "terraform"
    }

    fn detect(&self, path: &Path) -> bool {
        !files_with_extensions(path, &["tf"]).is_empty()
    }

    fn extract(&self, path: &Path) -> Result<ProjectMetadata, ExtractError> {
        let files = files_with_extensions(path, &["tf"]);
        if files.is_empty() {
            return Err(ExtractError::no_files("Terraform"));
        }

        let mut findings = TerraformFindings::default();
        let mut version_file: Option<String> = None;

        for file in &files {
            let content = read_file(file)?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let file_findings = scan_file(&file_name, &content);
            if version_file.is_none() && file_findings.required_version.is_some() {
                version_file = Some(file_name);
            }
            findings.merge(file_findings);
        }

        Ok(build_metadata(path, findings, version_file))
    }
}

/// Structured parse with regex fallback for a single file
pub fn scan_file(file_name: &str, content: &str) -> TerraformFindings {
    match hcl::parse(content) {
        Ok(body) if !body.blocks.is_empty() => findings_from_body(&body),
        Ok(_) => {
            debug!("{} has no top-level blocks, scanning lines", file_name);
            scan_lines(content)
        }
        Err(e) => {
            warn!("HCL parse of {} failed ({}), falling back to regex scan", file_name, e);
            scan_lines(content)
        }
    }
}

pub fn findings_from_body(body: &Body) -> TerraformFindings {
    let mut findings = TerraformFindings::default();

    for block in &body.blocks {
        match block.kind.as_str() {
            "terraform" => {
                if let Some(version) = block.body.attribute("required_version").and_then(Expr::as_str) {
                    findings.required_version = Some(version.to_string());
                }
                for backend in block.body.blocks_of("backend") {
                    if findings.backend.is_none() {
                        findings.backend = backend.label(0).map(str::to_string);
                    }
                }
                if findings.backend.is_none() && block.body.blocks_of("cloud").next().is_some() {
                    findings.backend = Some("cloud".to_string());
                }
                for required in block.body.blocks_of("required_providers") {
                    for attr in &required.body.attributes {
                        findings.add_provider(provider_from_expr(&attr.name, &attr.expr));
                    }
                }
            }
            "provider" => {
                if let Some(name) = block.label(0) {
                    findings.add_provider(ProviderRequirement {
                        name: name.to_string(),
                        source: String::new(),
                        version: string_attr(&block.body, "version"),
                    });
                }
            }
            "module" => {
                if let Some(name) = block.label(0) {
                    findings.add_module(ModuleCall {
                        name: name.to_string(),
                        source: string_attr(&block.body, "source"),
                        version: string_attr(&block.body, "version"),
                    });
                }
            }
            "resource" => {
                if let Some(resource_type) = block.label(0) {
                    findings.add_resource(resource_type);
                }
            }
            "data" => findings.data_sources += 1,
            "variable" => {
                if let Some(name) = block.label(0) {
                    super::common::push_unique(&mut findings.variables, name);
                }
            }
            "output" => {
                if let Some(name) = block.label(0) {
                    super::common::push_unique(&mut findings.outputs, name);
                }
            }
            _ => {}
        }
    }

    findings
}

fn provider_from_expr(name: &str, expr: &Expr) -> ProviderRequirement {
    let (source, version) = match expr {
        Expr::String(version) => (String::new(), version.clone()),
        Expr::Object(_) => (
            expr.get("source").and_then(Expr::as_str).unwrap_or_default().to_string(),
            expr.get("version").and_then(Expr::as_str).unwrap_or_default().to_string(),
        ),
        _ => (String::new(), String::new()),
    };

    ProviderRequirement {
        name: name.to_string(),
        source,
        version,
    }
}

fn string_attr(body: &Body, name: &str) -> String {
    body.attribute(name)
        .and_then(Expr::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Line-oriented scan used when the structured parser gives up.
///
/// Brace depth is tracked per line so `source`/`version` attributes are only
/// attributed to the enclosing module or provider entry.
pub fn scan_lines(content: &str) -> TerraformFindings {
    let mut findings = TerraformFindings::default();
    let mut depth: i32 = 0;
    let mut required_providers_depth: Option<i32> = None;
    let mut provider: Option<(ProviderRequirement, i32)> = None;
    let mut module: Option<(ModuleCall, i32)> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') || trimmed.starts_with("//") {
            continue;
        }

        let opens = line.matches('{').count() as i32;
        let closes = line.matches('}').count() as i32;

        if let Some((entry, _)) = provider.as_mut() {
            fill_source_version(line, &mut entry.source, &mut entry.version);
        } else if let Some((call, _)) = module.as_mut() {
            fill_source_version(line, &mut call.source, &mut call.version);
        } else if required_providers_depth.is_some() {
            if let Some(caps) = PROVIDER_ENTRY_RE.captures(line) {
                let mut entry = ProviderRequirement {
                    name: caps[1].to_string(),
                    ..Default::default()
                };
                fill_source_version(line, &mut entry.source, &mut entry.version);
                provider = Some((entry, depth + 1));
            } else if let Some(caps) = PROVIDER_SHORTHAND_RE.captures(line) {
                findings.add_provider(ProviderRequirement {
                    name: caps[1].to_string(),
                    source: String::new(),
                    version: caps[2].to_string(),
                });
            }
        } else {
            scan_top_level_line(line, depth, &mut findings, &mut module, &mut required_providers_depth);
        }

        depth += opens - closes;

        if let Some((_, inner)) = &provider {
            if depth < *inner {
                if let Some((entry, _)) = provider.take() {
                    findings.add_provider(entry);
                }
            }
        }
        if let Some((_, inner)) = &module {
            if depth < *inner {
                if let Some((call, _)) = module.take() {
                    findings.add_module(call);
                }
            }
        }
        if matches!(required_providers_depth, Some(inner) if depth < inner) {
            required_providers_depth = None;
        }
    }

    if let Some((entry, _)) = provider {
        findings.add_provider(entry);
    }
    if let Some((call, _)) = module {
        findings.add_module(call);
    }

    findings
}

fn scan_top_level_line(
    line: &str,
    depth: i32,
    findings: &mut TerraformFindings,
    module: &mut Option<(ModuleCall, i32)>,
    required_providers_depth: &mut Option<i32>,
) {
    if let Some(caps) = REQUIRED_VERSION_RE.captures(line) {
        if findings.required_version.is_none() {
            findings.required_version = Some(caps[1].to_string());
        }
    }
    if let Some(caps) = BACKEND_RE.captures(line) {
        if findings.backend.is_none() {
            findings.backend = Some(caps[1].to_string());
        }
    }
    if REQUIRED_PROVIDERS_RE.is_match(line) {
        *required_providers_depth = Some(depth + 1);
    } else if let Some(caps) = RESOURCE_RE.captures(line) {
        findings.add_resource(&caps[1]);
    } else if DATA_RE.is_match(line) {
        findings.data_sources += 1;
    } else if let Some(caps) = MODULE_RE.captures(line) {
        let mut call = ModuleCall {
            name: caps[1].to_string(),
            ..Default::default()
        };
        fill_source_version(line, &mut call.source, &mut call.version);
        *module = Some((call, depth + 1));
    } else if let Some(caps) = PROVIDER_BLOCK_RE.captures(line) {
        findings.add_provider(ProviderRequirement {
            name: caps[1].to_string(),
            source: String::new(),
            version: VERSION_RE
                .captures(line)
                .map(|v| v[1].to_string())
                .unwrap_or_default(),
        });
    } else if let Some(caps) = VARIABLE_RE.captures(line) {
        super::common::push_unique(&mut findings.variables, &caps[1]);
    } else if let Some(caps) = OUTPUT_RE.captures(line) {
        super::common::push_unique(&mut findings.outputs, &caps[1]);
    }
}

fn fill_source_version(line: &str, source: &mut String, version: &mut String) {
    if source.is_empty() {
        if let Some(caps) = SOURCE_RE.captures(line) {
            *source = caps[1].to_string();
        }
    }
    if version.is_empty() {
        if let Some(caps) = VERSION_RE.captures(line) {
            *version = caps[1].to_string();
        }
    }
}

fn build_metadata(path: &Path, findings: TerraformFindings, version_file: Option<String>) -> ProjectMetadata {
    let mut metadata = ProjectMetadata {
        name: dir_name(path),
        ..Default::default()
    };
    let ls = &mut metadata.language_specific;

    let required_version = findings.required_version.clone().unwrap_or_default();
    if !required_version.is_empty() {
        ls.insert("terraform_version", required_version.as_str());
        if let Some(file) = &version_file {
            ls.insert("metadata_source", file.as_str());
        }
    }
    if let Some(backend) = &findings.backend {
        ls.insert("backend", backend.as_str());
    }

    let providers = findings
        .providers
        .iter()
        .map(|p| record(&[("name", &p.name), ("source", &p.source), ("version", &p.version)]))
        .collect();
    ls.insert_records_with_count("providers", "provider_count", providers);

    let modules = findings
        .modules
        .iter()
        .map(|m| record(&[("name", &m.name), ("source", &m.source), ("version", &m.version)]))
        .collect();
    ls.insert_records_with_count("modules", "module_count", modules);

    ls.insert("resource_count", findings.resource_count());
    if !findings.resource_types.is_empty() {
        ls.insert("resource_types", findings.resource_types.clone());
    }
    if findings.data_sources > 0 {
        ls.insert("data_source_count", findings.data_sources);
    }
    ls.insert_list_with_count("variables", "variable_count", findings.variables.clone());
    ls.insert_list_with_count("outputs", "output_count", findings.outputs.clone());

    let (versions, json) = matrix::TERRAFORM.matrix_with_json(&required_version);
    ls.insert("terraform_version_matrix", versions);
    ls.insert("matrix_json", json);

    metadata.set_version(&required_version, "terraform.required_version");
    metadata
}

fn record(fields: &[(&str, &String)]) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn test_name_and_priority() {
        assert_eq!(TerraformExtractor.name(), "terraform");
        assert_eq!(TerraformExtractor.priority(), 1);
    }

    #[test]
    fn test_detect() {
        let temp = TempDir::new().unwrap();
        assert!(!TerraformExtractor.detect(temp.path()));
        assert!(!TerraformExtractor.detect(&temp.path().join("missing")));

        write(&temp, "main.tf", "terraform {\n  required_version = \">=1.5.0\"\n}\n");
        assert!(TerraformExtractor.detect(temp.path()));
    }

    #[test]
    fn test_extract_basic() {
        let temp = TempDir::new().unwrap();
        write(
            &temp,
            "versions.tf",
            r#"terraform {
  required_version = ">= 1.5.0"

  backend "s3" {
    bucket = "state"
    key    = "prod/terraform.tfstate"
  }
}
"#,
        );

        let metadata = TerraformExtractor.extract(temp.path()).unwrap();
        assert_eq!(metadata.name, dir_name(temp.path()));
        assert_eq!(metadata.version, ">= 1.5.0");
        assert_eq!(metadata.version_source, "terraform.required_version");

        let ls = &metadata.language_specific;
        assert_eq!(ls.text("terraform_version"), Some(">= 1.5.0"));
        assert_eq!(ls.text("metadata_source"), Some("versions.tf"));
        assert_eq!(ls.text("backend"), Some("s3"));
        assert_eq!(ls.list("terraform_version_matrix").map(|m| m.len()), Some(6));
        assert!(ls.text("matrix_json").unwrap().contains("terraform-version"));
    }

    #[test]
    fn test_extract_providers_and_modules() {
        let temp = TempDir::new().unwrap();
        write(
            &temp,
            "main.tf",
            r#"terraform {
  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }
    kubernetes = {
      source  = "hashicorp/kubernetes"
      version = ">= 2.0"
    }
    helm = {
      source  = "hashicorp/helm"
      version = "~> 2.9"
    }
  }
}

module "vpc" {
  source  = "terraform-aws-modules/vpc/aws"
  version = "5.0.0"
}

module "eks" {
  source = "terraform-aws-modules/eks/aws"
}
"#,
        );

        let metadata = TerraformExtractor.extract(temp.path()).unwrap();
        let ls = &metadata.language_specific;
        assert_eq!(ls.count("provider_count"), Some(3));
        let aws = &ls.records("providers").unwrap()[0];
        assert_eq!(aws["name"], "aws");
        assert_eq!(aws["source"], "hashicorp/aws");
        assert_eq!(aws["version"], "~> 5.0");

        assert_eq!(ls.count("module_count"), Some(2));
        let vpc = &ls.records("modules").unwrap()[0];
        assert_eq!(vpc["source"], "terraform-aws-modules/vpc/aws");
        assert_eq!(vpc["version"], "5.0.0");

        // no required_version still yields the default matrix
        assert!(metadata.version.is_empty());
        assert!(metadata.version_source.is_empty());
        assert_eq!(ls.list("terraform_version_matrix").map(|m| m.len()), Some(3));
    }

    #[test]
    fn test_resource_counts() {
        let temp = TempDir::new().unwrap();
        write(
            &temp,
            "main.tf",
            r#"resource "aws_instance" "web" {
  ami = "ami-1"
}
resource "aws_instance" "api" {
  ami = "ami-2"
}
resource "aws_s3_bucket" "assets" {}
resource "aws_vpc" "main" {
  cidr_block = "10.0.0.0/16"
}
data "aws_ami" "ubuntu" {}
"#,
        );

        let metadata = TerraformExtractor.extract(temp.path()).unwrap();
        let ls = &metadata.language_specific;
        assert_eq!(ls.count("resource_count"), Some(4));
        let types = ls.counts("resource_types").unwrap();
        assert_eq!(types["aws_instance"], 2);
        assert_eq!(types["aws_s3_bucket"], 1);
        assert_eq!(types["aws_vpc"], 1);
        assert_eq!(ls.count("data_source_count"), Some(1));
    }

    #[test]
    fn test_variables_and_outputs() {
        let temp = TempDir::new().unwrap();
        write(
            &temp,
            "variables.tf",
            "variable \"region\" {\n  default = \"eu-west-1\"\n}\nvariable \"env\" {}\n",
        );
        write(&temp, "outputs.tf", "output \"vpc_id\" {\n  value = module.vpc.vpc_id\n}\n");

        let metadata = TerraformExtractor.extract(temp.path()).unwrap();
        let ls = &metadata.language_specific;
        assert_eq!(ls.list("variables").unwrap(), ["region", "env"]);
        assert_eq!(ls.count("variable_count"), Some(2));
        assert_eq!(ls.list("outputs").unwrap(), ["vpc_id"]);
    }

    #[test]
    fn test_missing_files() {
        let temp = TempDir::new().unwrap();
        let err = TerraformExtractor.extract(temp.path()).unwrap_err();
        assert!(err.to_string().contains("no Terraform files found"));
    }

    #[test]
    fn test_regex_fallback_recovers_core_fields() {
        // unterminated terraform block makes the structured parse fail
        let content = r#"terraform {
  required_version = ">= 1.5.0"
  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }
    random = "~> 3.1"
  }
  backend "s3" {
    bucket = "my-bucket"
  }

module "vpc" {
  source  = "terraform-aws-modules/vpc/aws"
  version = "5.0.0"
}
resource "aws_instance" "web" {
"#;
        assert!(hcl::parse(content).is_err());

        let findings = scan_file("main.tf", content);
        assert_eq!(findings.required_version.as_deref(), Some(">= 1.5.0"));
        assert_eq!(findings.backend.as_deref(), Some("s3"));
        assert_eq!(
            findings.providers,
            vec![
                ProviderRequirement {
                    name: "aws".to_string(),
                    source: "hashicorp/aws".to_string(),
                    version: "~> 5.0".to_string(),
                },
                ProviderRequirement {
                    name: "random".to_string(),
                    source: String::new(),
                    version: "~> 3.1".to_string(),
                },
            ]
        );
        assert_eq!(findings.modules.len(), 1);
        assert_eq!(findings.modules[0].version, "5.0.0");
        assert_eq!(findings.resource_count(), 1);
    }

    #[test]
    fn test_structured_and_regex_paths_agree() {
        let content = r#"terraform {
  required_version = "~> 1.6"
  required_providers {
    google = {
      source  = "hashicorp/google"
      version = "5.1.0"
    }
  }
}

module "network" {
  source = "./modules/network"
}

resource "google_compute_instance" "vm" {
  name = "vm"
}
"#;
        let structured = findings_from_body(&hcl::parse(content).unwrap());
        let scanned = scan_lines(content);
        assert_eq!(structured, scanned);
    }

    #[test]
    fn test_provider_block_fills_blanks() {
        let mut findings = TerraformFindings::default();
        findings.add_provider(ProviderRequirement {
            name: "aws".to_string(),
            ..Default::default()
        });
        findings.add_provider(ProviderRequirement {
            name: "aws".to_string(),
            source: "hashicorp/aws".to_string(),
            version: "~> 5.0".to_string(),
        });
        assert_eq!(findings.providers.len(), 1);
        assert_eq!(findings.providers[0].source, "hashicorp/aws");
    }
}
