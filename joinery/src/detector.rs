//! # Relationship Detector Module
//!
//! Infers typed relationships from declared foreign keys:
//!
//! 1. Every FK column becomes a `ManyToOne`, or a `OneToOne` when the column is
//!    the whole primary key of its table or looks unique.
//! 2. Tables whose primary key is exactly their two FK columns are junctions and
//!    yield a `ManyToMany` in each direction.
//! 3. Every `ManyToOne` gets a reverse `OneToMany`.
//!
//! Only explicitly declared foreign keys are considered.

use std::collections::HashSet;

use log::{debug, warn};

use crate::{
    config::DetectorConfig,
    relationship::{Junction, Relationship, RelationshipKind},
    schema::{Column, TableSchema},
};

// ============================================================================
// Uniqueness Hint
// ============================================================================

/// Decides whether a foreign key column should be treated as unique,
/// which turns its relationship into a `OneToOne`.
pub trait UniqueHint: Send + Sync {
    fn is_unique(&self, table: &TableSchema, column: &Column) -> bool;
}

impl<F> UniqueHint for F
where
    F: Fn(&TableSchema, &Column) -> bool + Send + Sync,
{
    fn is_unique(&self, table: &TableSchema, column: &Column) -> bool {
        self(table, column)
    }
}

/// Default hint: a declared UNIQUE flag, or a column name containing one of
/// the configured patterns (`email`, `username`, `slug`, `code`).
///
/// The name match only approximates a real constraint.
#[derive(Debug, Clone)]
pub struct NamePatternHint {
    patterns: Vec<String>,
}

impl NamePatternHint {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { patterns: patterns.into_iter().map(|p| p.into().to_lowercase()).collect() }
    }
}

impl UniqueHint for NamePatternHint {
    fn is_unique(&self, _table: &TableSchema, column: &Column) -> bool {
        let name = column.name.to_lowercase();
        column.unique || self.patterns.iter().any(|p| name.contains(p.as_str()))
    }
}

// ============================================================================
// Detector
// ============================================================================

/// Classifies foreign keys into relationships.
///
/// Detection is deterministic: output order follows table order, then column
/// order. Repeated calls are not deduplicated against each other.
pub struct RelationshipDetector {
    unique_hint: Box<dyn UniqueHint>,
}

impl Default for RelationshipDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl RelationshipDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { unique_hint: Box::new(NamePatternHint::new(config.unique_patterns)) }
    }

    /// Replaces the uniqueness predicate.
    pub fn with_unique_hint(mut self, hint: impl UniqueHint + 'static) -> Self {
        self.unique_hint = Box::new(hint);
        self
    }

    /// Runs all passes: FK classification, junction detection, reverse synthesis.
    pub fn detect(&self, tables: &[TableSchema]) -> Vec<Relationship> {
        let mut relationships = self.classify_foreign_keys(tables);
        relationships.extend(self.detect_junctions(tables));
        let reverses = Self::synthesize_reverse(&relationships);
        relationships.extend(reverses);

        debug!("Detected {} relationships across {} tables", relationships.len(), tables.len());
        relationships
    }

    /// Emits one `ManyToOne` or `OneToOne` per declared FK column.
    ///
    /// A foreign key whose target table is not in `tables` is skipped with a warning.
    pub fn classify_foreign_keys(&self, tables: &[TableSchema]) -> Vec<Relationship> {
        let known: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let mut relationships = Vec::new();

        for table in tables {
            for col in table.foreign_key_columns() {
                let Some(fk) = &col.foreign_key else { continue };

                if !known.contains(fk.table.as_str()) {
                    warn!(
                        "Skipping foreign key {}.{} -> {}.{}: target table is not in the schema set",
                        table.name, col.name, fk.table, fk.column
                    );
                    continue;
                }

                let is_sole_key = table.primary_key.len() == 1 && table.primary_key[0] == col.name;
                let kind = if is_sole_key || self.unique_hint.is_unique(table, col) {
                    RelationshipKind::OneToOne
                } else {
                    RelationshipKind::ManyToOne
                };

                relationships.push(Relationship {
                    kind,
                    from_table: table.name.clone(),
                    from_column: col.name.clone(),
                    to_table: fk.table.clone(),
                    to_column: fk.column.clone(),
                    optional: col.nullable,
                    junction: None,
                });
            }
        }

        relationships
    }

    /// Finds junction tables and emits `ManyToMany` in both directions for each.
    ///
    /// A junction has exactly two FK columns (both resolvable) and a primary key
    /// equal to exactly those two columns, in any order.
    pub fn detect_junctions(&self, tables: &[TableSchema]) -> Vec<Relationship> {
        let known: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let mut relationships = Vec::new();

        for table in tables {
            let fks: Vec<&Column> = table.foreign_key_columns().collect();
            if fks.len() != 2 || table.primary_key.len() != 2 {
                continue;
            }

            let pk: HashSet<&str> = table.primary_key.iter().map(String::as_str).collect();
            if !fks.iter().all(|c| pk.contains(c.name.as_str())) {
                continue;
            }

            let (Some(a_ref), Some(b_ref)) = (&fks[0].foreign_key, &fks[1].foreign_key) else { continue };
            if !known.contains(a_ref.table.as_str()) || !known.contains(b_ref.table.as_str()) {
                continue;
            }

            debug!("Table '{}' is a junction between '{}' and '{}'", table.name, a_ref.table, b_ref.table);

            let (a_col, b_col) = (fks[0], fks[1]);
            relationships.push(Relationship {
                kind: RelationshipKind::ManyToMany,
                from_table: a_ref.table.clone(),
                from_column: a_ref.column.clone(),
                to_table: b_ref.table.clone(),
                to_column: b_ref.column.clone(),
                optional: a_col.nullable || b_col.nullable,
                junction: Some(Junction {
                    table: table.name.clone(),
                    from_column: a_col.name.clone(),
                    to_column: b_col.name.clone(),
                }),
            });
            relationships.push(Relationship {
                kind: RelationshipKind::ManyToMany,
                from_table: b_ref.table.clone(),
                from_column: b_ref.column.clone(),
                to_table: a_ref.table.clone(),
                to_column: a_ref.column.clone(),
                optional: a_col.nullable || b_col.nullable,
                junction: Some(Junction {
                    table: table.name.clone(),
                    from_column: b_col.name.clone(),
                    to_column: a_col.name.clone(),
                }),
            });
        }

        relationships
    }

    /// Returns one reverse `OneToMany` for every `ManyToOne` in `relationships`.
    ///
    /// `OneToOne` and `ManyToMany` are left alone.
    pub fn synthesize_reverse(relationships: &[Relationship]) -> Vec<Relationship> {
        relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::ManyToOne)
            .map(Relationship::reversed)
            .collect()
    }
}
