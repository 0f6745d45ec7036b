//! Project metadata model
//!
//! Every extractor produces a [`ProjectMetadata`]: a handful of common fields
//! plus an ecosystem-defined [`LanguageSpecific`] bag. The bag is a sorted map so
//! serialized output is stable across runs.

use serde::Serialize;
use std::collections::BTreeMap;

/// A single value stored in the language-specific bag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LanguageValue {
    Text(String),
    Count(usize),
    Flag(bool),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
    Counts(BTreeMap<String, usize>),
    Records(Vec<BTreeMap<String, String>>),
}

impl From<&str> for LanguageValue {
    fn from(value: &str) -> Self {
        LanguageValue::Text(value.to_string())
    }
}

impl From<String> for LanguageValue {
    fn from(value: String) -> Self {
        LanguageValue::Text(value)
    }
}

impl From<usize> for LanguageValue {
    fn from(value: usize) -> Self {
        LanguageValue::Count(value)
    }
}

impl From<bool> for LanguageValue {
    fn from(value: bool) -> Self {
        LanguageValue::Flag(value)
    }
}

impl From<Vec<String>> for LanguageValue {
    fn from(value: Vec<String>) -> Self {
        LanguageValue::List(value)
    }
}

impl From<BTreeMap<String, String>> for LanguageValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        LanguageValue::Map(value)
    }
}

impl From<BTreeMap<String, usize>> for LanguageValue {
    fn from(value: BTreeMap<String, usize>) -> Self {
        LanguageValue::Counts(value)
    }
}

impl From<Vec<BTreeMap<String, String>>> for LanguageValue {
    fn from(value: Vec<BTreeMap<String, String>>) -> Self {
        LanguageValue::Records(value)
    }
}

/// Ecosystem-specific key/value bag attached to every extraction result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LanguageSpecific(BTreeMap<String, LanguageValue>);

impl LanguageSpecific {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<LanguageValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Inserts a text value, skipping empty strings
    pub fn insert_text(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.insert(key, value);
        }
    }

    /// Inserts a list together with its `count_key`, skipping empty lists
    pub fn insert_list_with_count(&mut self, key: &str, count_key: &str, items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        self.insert(count_key, items.len());
        self.insert(key, items);
    }

    pub fn insert_map_with_count(
        &mut self,
        key: &str,
        count_key: &str,
        entries: BTreeMap<String, String>,
    ) {
        if entries.is_empty() {
            return;
        }
        self.insert(count_key, entries.len());
        self.insert(key, entries);
    }

    pub fn insert_records_with_count(
        &mut self,
        key: &str,
        count_key: &str,
        records: Vec<BTreeMap<String, String>>,
    ) {
        if records.is_empty() {
            return;
        }
        self.insert(count_key, records.len());
        self.insert(key, records);
    }

    pub fn get(&self, key: &str) -> Option<&LanguageValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(LanguageValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn count(&self, key: &str) -> Option<usize> {
        match self.0.get(key) {
            Some(LanguageValue::Count(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(LanguageValue::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.0.get(key) {
            Some(LanguageValue::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn map(&self, key: &str) -> Option<&BTreeMap<String, String>> {
        match self.0.get(key) {
            Some(LanguageValue::Map(m)) => Some(m),
            _ => None,
        }
    }

    pub fn counts(&self, key: &str) -> Option<&BTreeMap<String, usize>> {
        match self.0.get(key) {
            Some(LanguageValue::Counts(m)) => Some(m),
            _ => None,
        }
    }

    pub fn records(&self, key: &str) -> Option<&[BTreeMap<String, String>]> {
        match self.0.get(key) {
            Some(LanguageValue::Records(r)) => Some(r),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Metadata extracted from a single project directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectMetadata {
    pub name: String,
    pub version: String,
    pub version_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    pub authors: Vec<String>,
    pub language_specific: LanguageSpecific,
}

impl ProjectMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a declared version and the file or field it came from.
    ///
    /// Empty versions leave both fields untouched so `version_source` is only
    /// ever set alongside a real value.
    pub fn set_version(&mut self, version: &str, source: &str) {
        if version.is_empty() {
            return;
        }
        self.version = version.to_string();
        self.version_source = source.to_string();
    }
}

/// Formats an author entry as `Name <email>`, `Name` or `<email>`.
///
/// Returns `None` when both parts are blank.
pub fn format_author(name: &str, email: &str) -> Option<String> {
    let name = name.trim();
    let email = email.trim();
    match (name.is_empty(), email.is_empty()) {
        (false, false) => Some(format!("{} <{}>", name, email)),
        (false, true) => Some(name.to_string()),
        (true, false) => Some(format!("<{}>", email)),
        (true, true) => None,
    }
}

/// Returns `Some(trimmed)` when the value is not blank
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
