//! Output formatting for extraction results
//!
//! JSON is the machine-readable default consumed by CI steps; the human format
//! is a short tree view for terminals.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::metadata::{LanguageValue, ProjectMetadata};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Human,
}

/// Extraction result as printed by `buildmeta extract`
#[derive(Debug, Serialize)]
pub struct ExtractionReport<'a> {
    pub extractor: &'a str,
    pub path: &'a Path,
    pub metadata: &'a ProjectMetadata,
}

pub struct OutputFormatter {
    format: OutputFormat,
    pretty: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            pretty: true,
        }
    }

    /// Single-line JSON when `pretty` is false
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn format(&self, report: &ExtractionReport<'_>) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.to_json(report),
            OutputFormat::Human => Ok(format_human(report)),
        }
    }

    pub fn to_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        json.context("Failed to serialize output to JSON")
    }
}

fn format_human(report: &ExtractionReport<'_>) -> String {
    let metadata = report.metadata;
    let mut output = String::new();

    output.push_str(&format!(
        "\u{2713} {} project at {}\n\n",
        report.extractor,
        report.path.display()
    ));

    let header: Vec<(&str, Option<&str>)> = vec![
        ("Name", Some(metadata.name.as_str()).filter(|s| !s.is_empty())),
        ("Version", Some(metadata.version.as_str()).filter(|s| !s.is_empty())),
        ("Source", Some(metadata.version_source.as_str()).filter(|s| !s.is_empty())),
        ("Description", metadata.description.as_deref()),
        ("License", metadata.license.as_deref()),
        ("Homepage", metadata.homepage.as_deref()),
        ("Repository", metadata.repository.as_deref()),
    ];
    for (label, value) in header {
        if let Some(value) = value {
            output.push_str(&format!("{:<13}{}\n", format!("{}:", label), value));
        }
    }
    if !metadata.authors.is_empty() {
        output.push_str(&format!("{:<13}{}\n", "Authors:", metadata.authors.join(", ")));
    }

    if metadata.language_specific.is_empty() {
        return output;
    }

    output.push_str("\nDetails:\n");
    let count = metadata.language_specific.len();
    for (i, key) in metadata.language_specific.keys().enumerate() {
        let connector = if i + 1 == count { "\u{2514}" } else { "\u{251C}" };
        let value = metadata
            .language_specific
            .get(key)
            .map(summarize)
            .unwrap_or_default();
        output.push_str(&format!("{}\u{2500} {}: {}\n", connector, key, value));
    }

    output
}

fn summarize(value: &LanguageValue) -> String {
    match value {
        LanguageValue::Text(s) => s.clone(),
        LanguageValue::Count(n) => n.to_string(),
        LanguageValue::Flag(b) => b.to_string(),
        LanguageValue::List(items) => items.join(", "),
        LanguageValue::Map(map) => map
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", "),
        LanguageValue::Counts(map) => map
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", "),
        LanguageValue::Records(records) => records
            .iter()
            .filter_map(|r| r.get("name"))
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProjectMetadata {
        let mut metadata = ProjectMetadata::new();
        metadata.name = "vendor/pkg".to_string();
        metadata.set_version("1.0.0", "composer.json");
        metadata.language_specific.insert("package_type", "library");
        metadata
            .language_specific
            .insert_list_with_count("php_extensions", "extension_count", vec!["json".into()]);
        metadata
    }

    #[test]
    fn test_json_includes_extractor_and_metadata() {
        let metadata = sample();
        let report = ExtractionReport {
            extractor: "php",
            path: Path::new("/srv/app"),
            metadata: &metadata,
        };

        let json = OutputFormatter::new(OutputFormat::Json)
            .with_pretty(false)
            .format(&report)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert!(!json.contains('\n'));
        assert_eq!(value["extractor"], "php");
        assert_eq!(value["metadata"]["name"], "vendor/pkg");
        assert_eq!(value["metadata"]["version_source"], "composer.json");
        assert_eq!(value["metadata"]["language_specific"]["extension_count"], 1);
    }

    #[test]
    fn test_human_tree() {
        let metadata = sample();
        let report = ExtractionReport {
            extractor: "php",
            path: Path::new("/srv/app"),
            metadata: &metadata,
        };

        let output = OutputFormatter::new(OutputFormat::Human)
            .format(&report)
            .unwrap();
        assert!(output.contains("php project at /srv/app"));
        assert!(output.contains("Version:     1.0.0"));
        assert!(output.contains("\u{2514}\u{2500} php_extensions: json"));
        assert!(!output.contains("Description:"));
    }
}
