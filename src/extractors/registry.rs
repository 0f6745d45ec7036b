//! Extractor registry

use super::{Extractor, ExtractError};
use crate::metadata::ProjectMetadata;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Ordered collection of extractors.
///
/// Registration order matters: among matching extractors with equal priority
/// the one registered first wins.
#[derive(Clone)]
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::from_extractors(default_extractors())
    }

    pub fn from_extractors(extractors: Vec<Arc<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    /// Appends an extractor. Names are not deduplicated.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        self.extractors.push(extractor);
    }

    /// Picks the extractor for `path`: highest priority, then earliest registered
    pub fn resolve(&self, path: &Path) -> Result<Arc<dyn Extractor>, ExtractError> {
        let mut best: Option<&Arc<dyn Extractor>> = None;

        for extractor in &self.extractors {
            if !extractor.detect(path) {
                continue;
            }
            debug!("{} matched {}", extractor.name(), path.display());

            match best {
                Some(current) if extractor.priority() <= current.priority() => {}
                _ => best = Some(extractor),
            }
        }

        best.cloned().ok_or_else(|| ExtractError::NoExtractorFound {
            path: path.to_path_buf(),
        })
    }

    /// Every matching extractor, in resolution order
    pub fn detect_all(&self, path: &Path) -> Vec<Arc<dyn Extractor>> {
        let mut matches: Vec<Arc<dyn Extractor>> = self
            .extractors
            .iter()
            .filter(|e| e.detect(path))
            .cloned()
            .collect();
        // stable sort keeps registration order within a priority
        matches.sort_by_key(|e| std::cmp::Reverse(e.priority()));
        matches
    }

    /// Resolves and runs the matching extractor
    pub fn extract(&self, path: &Path) -> Result<(Arc<dyn Extractor>, ProjectMetadata), ExtractError> {
        let extractor = self.resolve(path)?;
        debug!("Using {} extractor for {}", extractor.name(), path.display());
        let metadata = extractor.extract(path)?;
        Ok((extractor, metadata))
    }

    /// First extractor registered under `name`
    pub fn get(&self, name: &str) -> Option<Arc<dyn Extractor>> {
        self.extractors
            .iter()
            .find(|e| e.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    pub fn extractors(&self) -> &[Arc<dyn Extractor>] {
        &self.extractors
    }

    /// Keeps only extractors whose name is listed, preserving order
    pub fn retain_names(&mut self, names: &[String]) {
        self.extractors
            .retain(|e| names.iter().any(|n| n.eq_ignore_ascii_case(e.name())));
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Built-in extractors in registration order
pub fn default_extractors() -> Vec<Arc<dyn Extractor>> {
    vec![
        Arc::new(super::CppExtractor),
        Arc::new(super::ElixirExtractor),
        Arc::new(super::PhpExtractor),
        Arc::new(super::ScalaExtractor),
        Arc::new(super::SwiftExtractor),
        Arc::new(super::TerraformExtractor),
    ]
}
