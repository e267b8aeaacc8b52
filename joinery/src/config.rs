//! # Configuration Module
//!
//! Tunables for relationship detection and hydration. Both structs are plain
//! serde-friendly values with chainable setters.

use serde::{Deserialize, Serialize};

// ============================================================================
// Detector Configuration
// ============================================================================

/// Settings for [`RelationshipDetector`](crate::RelationshipDetector).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Column-name substrings treated as "probably unique" by the default hint.
    pub unique_patterns: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self { unique_patterns: ["email", "username", "slug", "code"].map(String::from).to_vec() }
    }
}

impl DetectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the uniqueness name patterns.
    pub fn unique_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }
}

// ============================================================================
// Hydration Configuration
// ============================================================================

/// Settings for [`Hydrator`](crate::Hydrator) and table presence detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrationConfig {
    /// Separator between a table (or alias) prefix and a column in field names.
    pub separator: char,
    /// Delimiter joining the values of a composite primary key into a dedup key.
    pub key_delimiter: String,
    /// Tables accepted as field-name prefixes in addition to the root's neighbours.
    pub extra_tables: Vec<String>,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self { separator: '.', key_delimiter: "|".to_string(), extra_tables: Vec::new() }
    }
}

impl HydrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn key_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.key_delimiter = delimiter.into();
        self
    }

    /// Widens the set of known tables, typically with the full schema table list.
    pub fn extra_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_tables = tables.into_iter().map(Into::into).collect();
        self
    }
}
