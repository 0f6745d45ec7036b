//! buildmeta - build metadata extraction for CI pipelines
//!
//! Given a project directory, buildmeta picks the ecosystem extractor that
//! recognises it and returns normalized [`ProjectMetadata`]: name, version, the
//! file the version came from, and an ecosystem-specific bag of details such as
//! dependencies, declared toolchain versions and a CI version matrix.
//!
//! # Core Concepts
//!
//! - **Extractor**: detects one ecosystem (Terraform, Scala, Elixir, Swift,
//!   C/C++, PHP) and parses its manifests
//! - **Registry**: ordered set of extractors; the highest priority match wins,
//!   ties go to the extractor registered first
//! - **Version matrix**: the release lines a CI job should test, derived from
//!   the project's declared constraint
//!
//! # Example Usage
//!
//! ```no_run
//! use buildmeta::{Extractor, ExtractorRegistry};
//! use std::path::Path;
//!
//! let registry = ExtractorRegistry::with_defaults();
//! let (extractor, metadata) = registry.extract(Path::new("infra"))?;
//!
//! println!("{} {} ({})", extractor.name(), metadata.name, metadata.version);
//! if let Some(matrix) = metadata.language_specific.text("matrix_json") {
//!     println!("matrix: {}", matrix);
//! }
//! # Ok::<(), buildmeta::ExtractError>(())
//! ```

pub mod cli;
pub mod config;
pub mod extractors;
pub mod matrix;
pub mod metadata;
pub mod util;

pub use config::{BuildmetaConfig, ConfigError};
pub use extractors::{ExtractError, Extractor, ExtractorRegistry};
pub use metadata::{LanguageSpecific, LanguageValue, ProjectMetadata};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_buildmeta() {
        assert_eq!(NAME, "buildmeta");
    }
}
