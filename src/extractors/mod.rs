//! Build-ecosystem extractors
//!
//! Each ecosystem implements [`Extractor`]: a cheap `detect` probe plus an
//! `extract` pass that turns the ecosystem's manifest into [`ProjectMetadata`].
//! Extractors hold no state and are shared across calls through the
//! [`ExtractorRegistry`].

use crate::metadata::ProjectMetadata;
use std::path::Path;

pub mod common;
pub mod cpp;
pub mod elixir;
pub mod error;
pub mod parsers;
pub mod php;
pub mod registry;
pub mod scala;
pub mod swift;
pub mod terraform;

pub use cpp::CppExtractor;
pub use elixir::ElixirExtractor;
pub use error::ExtractError;
pub use php::PhpExtractor;
pub use registry::ExtractorRegistry;
pub use scala::ScalaExtractor;
pub use swift::SwiftExtractor;
pub use terraform::TerraformExtractor;

/// Priority shared by every built-in extractor
pub const DEFAULT_PRIORITY: i32 = 1;

/// Detects and parses one build ecosystem
pub trait Extractor: Send + Sync {
    /// Short identifier, e.g. `"terraform"`
    fn name(&self) -> &'static str;

    /// Higher wins when several extractors match the same directory
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Existence probe over a few candidate files; never fails
    fn detect(&self, path: &Path) -> bool;

    /// Parses the ecosystem manifest(s) found under `path`
    fn extract(&self, path: &Path) -> Result<ProjectMetadata, ExtractError>;
}
