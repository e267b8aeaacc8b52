//! # Relationship Graph Module
//!
//! A read-only, table-indexed view over detected relationships. Built once and
//! shared freely (it is `Send + Sync` and has no mutation API).

use std::collections::HashMap;

use crate::{
    detector::RelationshipDetector,
    relationship::Relationship,
    schema::Schema,
};

#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    relationships: Vec<Relationship>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
}

impl RelationshipGraph {
    /// Indexes a relationship list, keeping its order.
    pub fn new(relationships: Vec<Relationship>) -> Self {
        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, rel) in relationships.iter().enumerate() {
            outgoing.entry(rel.from_table.clone()).or_default().push(idx);
            incoming.entry(rel.to_table.clone()).or_default().push(idx);
        }

        Self { relationships, outgoing, incoming }
    }

    /// Detects relationships over a schema set with the given detector and indexes them.
    pub fn build(schema: &Schema, detector: &RelationshipDetector) -> Self {
        Self::new(detector.detect(schema.tables()))
    }

    /// All relationships, in detection order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Relationships with `table` as their "from" side.
    pub fn outgoing(&self, table: &str) -> Vec<&Relationship> {
        self.lookup(&self.outgoing, table)
    }

    /// Relationships with `table` as their "to" side.
    pub fn incoming(&self, table: &str) -> Vec<&Relationship> {
        self.lookup(&self.incoming, table)
    }

    /// The first relationship going from `a` to `b`, if any.
    pub fn first_between(&self, a: &str, b: &str) -> Option<&Relationship> {
        self.outgoing
            .get(a)?
            .iter()
            .map(|&idx| &self.relationships[idx])
            .find(|rel| rel.to_table == b)
    }

    /// The field name `rel` takes on entities of its "from" table.
    ///
    /// Falls back to [`Relationship::qualified_field_name`] when another
    /// outgoing relationship of that table would get the same name, e.g. two
    /// foreign keys from `posts` to `users`.
    pub fn field_name(&self, rel: &Relationship) -> String {
        let name = rel.field_name();
        let clashes = self
            .outgoing(&rel.from_table)
            .into_iter()
            .any(|other| other != rel && other.field_name() == name);
        if clashes { rel.qualified_field_name() } else { name }
    }

        fn lookup(&self, index: &HashMap<String, Vec<usize>>, table: &str) -> Vec<&Relationship> {
        index
            .get(table)
            .map(|ids| ids.iter().map(|&idx| &self.relationships[idx]).collect())
            .unwrap_or_default()
    }
}
