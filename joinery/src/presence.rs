//! # Table Presence Module
//!
//! Works out which tables contributed columns to a result set, and picks the
//! hydration strategy from that.

use std::collections::HashSet;

use crate::{
    config::HydrationConfig,
    graph::RelationshipGraph,
    relationship::{Relationship, RelationshipKind},
    row::FieldDescriptor,
};

/// Tables whose data appears in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TablePresence {
    tables: HashSet<String>,
}

impl TablePresence {
    /// Scans field descriptors.
    ///
    /// An explicit, non-blank origin table is taken as-is. Otherwise a field
    /// named `prefix<separator>column` marks `prefix` present only when it is a
    /// known table, so columns that merely contain the separator do not count.
    pub fn detect(fields: &[FieldDescriptor], known_tables: &HashSet<String>, separator: char) -> Self {
        let mut tables = HashSet::new();

        for field in fields {
            match field.origin_table.as_deref().map(str::trim) {
                Some(origin) if !origin.is_empty() => {
                    tables.insert(origin.to_string());
                }
                _ => {
                    if let Some((prefix, _)) = field.name.split_once(separator) {
                        if known_tables.contains(prefix) {
                            tables.insert(prefix.to_string());
                        }
                    }
                }
            }
        }

        Self { tables }
    }

    /// Whether any column of `table` is present in the result.
    pub fn is_present(&self, table: &str) -> bool {
        self.tables.contains(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }
}

/// The root table, every table one relationship away from it (either
/// direction), and any caller-supplied extra tables.
pub fn known_tables(graph: &RelationshipGraph, root: &str, config: &HydrationConfig) -> HashSet<String> {
    let mut known = HashSet::new();
    known.insert(root.to_string());

    for rel in graph.outgoing(root) {
        known.insert(rel.to_table.clone());
    }
    for rel in graph.incoming(root) {
        known.insert(rel.from_table.clone());
    }
    known.extend(config.extra_tables.iter().cloned());

    known
}

/// How a hydration call populates its root entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy<'g> {
    /// No related table present: one root entity per row.
    Plain,
    /// `OneToOne` / `ManyToOne`: attach one related entity per root.
    Single(&'g Relationship),
    /// `OneToMany`: group child rows under each root.
    Children(&'g Relationship),
    /// `ManyToMany`: group the opposite endpoint under each root.
    ManyToMany(&'g Relationship),
}

impl<'g> Strategy<'g> {
    /// The strategy that populates `relationship`.
    pub fn for_relationship(relationship: &'g Relationship) -> Self {
        match relationship.kind {
            RelationshipKind::OneToOne | RelationshipKind::ManyToOne => Strategy::Single(relationship),
            RelationshipKind::OneToMany => Strategy::Children(relationship),
            RelationshipKind::ManyToMany => Strategy::ManyToMany(relationship),
        }
    }

    /// Picks the first outgoing relationship of `root` whose target table is present.
    ///
    /// Self-references are skipped since their columns cannot be told apart
    /// from the root's own.
    pub fn select(graph: &'g RelationshipGraph, root: &str, presence: &TablePresence) -> Self {
        graph
            .outgoing(root)
            .into_iter()
            .find(|rel| rel.to_table != root && presence.is_present(&rel.to_table))
            .map(Strategy::for_relationship)
            .unwrap_or(Strategy::Plain)
    }

    pub fn relationship(&self) -> Option<&'g Relationship> {
        match *self {
            Strategy::Plain => None,
            Strategy::Single(rel) | Strategy::Children(rel) | Strategy::ManyToMany(rel) => Some(rel),
        }
    }
}
