use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by extractors and the registry
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No usable manifest for this ecosystem exists in the directory
    #[error("{0}")]
    NotFound(String),

    #[error("failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no extractor found for type at {}", path.display())]
    NoExtractorFound { path: PathBuf },
}

impl ExtractError {
    /// `"<manifest> not found"`
    pub fn manifest_not_found(manifest: &str) -> Self {
        ExtractError::NotFound(format!("{} not found", manifest))
    }

    /// `"no <ecosystem> files found"`
    pub fn no_files(ecosystem: &str) -> Self {
        ExtractError::NotFound(format!("no {} files found", ecosystem))
    }

    pub fn parse(
        file: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ExtractError::Parse {
            file: file.into(),
            source: source.into(),
        }
    }

    /// True when no registered extractor claimed the directory
    pub fn is_registry_miss(&self) -> bool {
        matches!(self, ExtractError::NoExtractorFound { .. })
    }
}
