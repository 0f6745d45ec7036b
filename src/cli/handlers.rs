//! Subcommand handlers. Each returns the process exit code.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use super::commands::{DetectArgs, Ecosystem, ExtractArgs, MatrixArgs};
use super::output::{ExtractionReport, OutputFormatter};
use crate::config::BuildmetaConfig;
use crate::extractors::{ExtractError, Extractor, ExtractorRegistry};
use crate::matrix;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_NO_EXTRACTOR: i32 = 2;

pub fn handle_extract(args: &ExtractArgs, config: &BuildmetaConfig) -> i32 {
    let path = target_path(args.path.as_deref());
    let registry = config.registry();

    let result = choose_extractor(&registry, &path, args.extractor.as_deref()).and_then(
        |extractor| {
            info!("Using {} extractor for {}", extractor.name(), path.display());
            let metadata = extractor.extract(&path)?;
            Ok((extractor, metadata))
        },
    );

    let (extractor, metadata) = match result {
        Ok(found) => found,
        Err(e) => return report_extract_error(&e),
    };

    let formatter =
        OutputFormatter::new(args.format.into()).with_pretty(config.pretty && !args.compact);
    let report = ExtractionReport {
        extractor: extractor.name(),
        path: &path,
        metadata: &metadata,
    };

    match formatter.format(&report) {
        Ok(output) => {
            println!("{}", output);
            EXIT_SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            EXIT_FAILURE
        }
    }
}

pub fn handle_detect(args: &DetectArgs, config: &BuildmetaConfig) -> i32 {
    let path = target_path(args.path.as_deref());
    let registry = config.registry();

    if args.all {
        let matches = registry.detect_all(&path);
        if matches.is_empty() {
            return report_extract_error(&ExtractError::NoExtractorFound { path });
        }
        for extractor in matches {
            println!("{}", extractor.name());
        }
        return EXIT_SUCCESS;
    }

    match registry.resolve(&path) {
        Ok(extractor) => {
            println!("{}", extractor.name());
            EXIT_SUCCESS
        }
        Err(e) => report_extract_error(&e),
    }
}

pub fn handle_list(config: &BuildmetaConfig) -> i32 {
    for extractor in config.registry().extractors() {
        println!("{:<12}priority {}", extractor.name(), extractor.priority());
    }
    EXIT_SUCCESS
}

pub fn handle_matrix(args: &MatrixArgs) -> i32 {
    match matrix_output(args.ecosystem, &args.constraint) {
        Ok(output) => {
            println!("{}", output);
            EXIT_SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            EXIT_FAILURE
        }
    }
}

/// JSON fragment for table-driven ecosystems, a JSON list otherwise
pub fn matrix_output(ecosystem: Ecosystem, constraint: &str) -> Result<String> {
    let output = match ecosystem {
        Ecosystem::Terraform => matrix::TERRAFORM.matrix_with_json(constraint).1,
        Ecosystem::Php => matrix::PHP.matrix_with_json(constraint).1,
        Ecosystem::Swift => matrix::SWIFT.matrix_with_json(constraint).1,
        Ecosystem::Elixir => serde_json::to_string(&matrix::elixir_matrix(constraint))
            .context("Failed to serialize Elixir matrix")?,
        Ecosystem::Scala => serde_json::to_string(&matrix::scala_matrix(constraint))
            .context("Failed to serialize Scala matrix")?,
    };
    Ok(output)
}

fn choose_extractor(
    registry: &ExtractorRegistry,
    path: &Path,
    forced: Option<&str>,
) -> Result<Arc<dyn Extractor>, ExtractError> {
    match forced {
        Some(name) => registry.get(name).ok_or_else(|| {
            ExtractError::NotFound(format!(
                "unknown extractor '{}'. Available: {}",
                name,
                registry.names().join(", ")
            ))
        }),
        None => registry.resolve(path),
    }
}

fn report_extract_error(e: &ExtractError) -> i32 {
    error!("{}", e);
    if e.is_registry_miss() {
        EXIT_NO_EXTRACTOR
    } else {
        EXIT_FAILURE
    }
}

fn target_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
