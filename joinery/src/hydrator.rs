//! # Hydrator Module
//!
//! Turns the flat, repeated rows of a JOIN into deduplicated root entities
//! with one relationship populated.
//!
//! Root entities are keyed by their primary key, serialized in declared order
//! and joined with the configured delimiter. Output order is the order in which
//! each key was first seen; related lists keep row order.

use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
use log::{debug, trace};

use crate::{
    config::HydrationConfig,
    entity::{Entity, Related},
    extractor::EntityExtractor,
    graph::RelationshipGraph,
    presence::{known_tables, Strategy, TablePresence},
    relationship::Relationship,
    row::{RowSource, RowStream},
    schema::{Schema, TableSchema},
    value::coerce,
    Error,
};

// ============================================================================
// Stream Guard
// ============================================================================

/// Closes the wrapped stream when dropped, on success and on every error path.
struct StreamGuard<S: RowStream> {
    stream: S,
}

impl<S: RowStream> Deref for StreamGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.stream
    }
}

impl<S: RowStream> DerefMut for StreamGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}

impl<S: RowStream> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        self.stream.close();
    }
}

// ============================================================================
// Hydrator
// ============================================================================

/// Hydrates row streams against a schema set and its relationship graph.
///
/// The hydrator only borrows shared, immutable state; every call keeps its own
/// dedup maps, so one hydrator can serve concurrent callers.
///
/// # Example
///
/// ```rust,ignore
/// let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
/// let hydrator = Hydrator::new(&schema, &graph);
/// let orders = hydrator.hydrate("purchase_orders", RecordStream::new(rows))?;
/// ```
#[derive(Debug, Clone)]
pub struct Hydrator<'a> {
    schema: &'a Schema,
    graph: &'a RelationshipGraph,
    config: HydrationConfig,
}

impl<'a> Hydrator<'a> {
    pub fn new(schema: &'a Schema, graph: &'a RelationshipGraph) -> Self {
        Self { schema, graph, config: HydrationConfig::default() }
    }

    pub fn with_config(mut self, config: HydrationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &HydrationConfig {
        &self.config
    }

    /// Hydrates `stream` into `root` entities, populating the first outgoing
    /// relationship whose table has columns in the result.
    ///
    /// The stream is drained and closed, whatever the outcome.
    pub fn hydrate<S: RowStream>(&self, root: &str, stream: S) -> Result<Vec<Entity>, Error> {
        self.run(root, None, stream)
    }

    /// Hydrates `stream` populating `relationship`, skipping presence-based selection.
    pub fn hydrate_via<S: RowStream>(
        &self,
        root: &str,
        relationship: &Relationship,
        stream: S,
    ) -> Result<Vec<Entity>, Error> {
        if relationship.from_table != root {
            return Err(Error::RelationshipMismatch {
                root: root.to_string(),
                from: relationship.from_table.clone(),
                column: relationship.from_column.clone(),
            });
        }
        self.run(root, Some(relationship), stream)
    }

    fn run<S: RowStream>(&self, root: &str, chosen: Option<&Relationship>, stream: S) -> Result<Vec<Entity>, Error> {
        let mut stream = StreamGuard { stream };
        let table = self.table(root)?;

        if !stream.advance()? {
            debug!("Empty result for '{}'", root);
            return Ok(Vec::new());
        }

        let strategy = match chosen {
            Some(rel) => Strategy::for_relationship(rel),
            None => {
                let known = known_tables(self.graph, root, &self.config);
                let presence = TablePresence::detect(&stream.fields(), &known, self.config.separator);
                Strategy::select(self.graph, root, &presence)
            }
        };
        debug!("Hydrating '{}' with strategy {:?}", root, strategy);

        let entities = match strategy {
            Strategy::Plain => self.hydrate_plain(table, &mut *stream),
            Strategy::Single(rel) => self.hydrate_single(table, rel, &mut *stream),
            Strategy::Children(rel) => self.hydrate_grouped(table, rel, true, &mut *stream),
            Strategy::ManyToMany(rel) => self.hydrate_grouped(table, rel, false, &mut *stream),
        }?;

        debug!("Hydrated {} '{}' entities", entities.len(), root);
        Ok(entities)
    }

    /// One root entity per row, no deduplication.
    fn hydrate_plain<S: RowStream>(&self, table: &TableSchema, stream: &mut S) -> Result<Vec<Entity>, Error> {
        let extractor = self.extractor();
        let mut entities = Vec::new();

        loop {
            entities.push(extractor.extract_root(table, &*stream)?);
            if !stream.advance()? {
                break;
            }
        }

        Ok(entities)
    }

    /// `OneToOne` / `ManyToOne`: first row of each key wins.
    fn hydrate_single<S: RowStream>(
        &self,
        table: &TableSchema,
        rel: &Relationship,
        stream: &mut S,
    ) -> Result<Vec<Entity>, Error> {
        let extractor = self.extractor();
        let related_table = self.table(&rel.to_table)?;
        let field = self.graph.field_name(rel);
        let mut roots: IndexMap<String, Entity> = IndexMap::new();

        loop {
            let key = self.dedup_key(table, &*stream)?;
            if roots.contains_key(&key) {
                trace!("Skipping repeated row for key '{}'", key);
            } else {
                let mut entity = extractor.extract_root(table, &*stream)?;
                let related = extractor.extract_joined(related_table, &*stream, rel, &entity)?;
                entity.set_relation(field.clone(), Related::One(related.map(Box::new)));
                roots.insert(key, entity);
            }

            if !stream.advance()? {
                break;
            }
        }

        Ok(roots.into_values().collect())
    }

    /// `OneToMany` / `ManyToMany`: children accumulate per key and are attached
    /// once the stream is exhausted.
    ///
    /// With `hops`, each child also gets its own single-valued relationships
    /// populated when their tables are present.
    fn hydrate_grouped<S: RowStream>(
        &self,
        table: &TableSchema,
        rel: &Relationship,
        hops: bool,
        stream: &mut S,
    ) -> Result<Vec<Entity>, Error> {
        let extractor = self.extractor();
        let child_table = self.table(&rel.to_table)?;
        let hop_relationships = if hops { self.hop_relationships(table, child_table, &*stream) } else { Vec::new() };

        let mut roots: IndexMap<String, Entity> = IndexMap::new();
        let mut children: IndexMap<String, Vec<Entity>> = IndexMap::new();

        loop {
            let key = self.dedup_key(table, &*stream)?;
            if !roots.contains_key(&key) {
                let entity = extractor.extract_root(table, &*stream)?;
                roots.insert(key.clone(), entity);
                children.insert(key.clone(), Vec::new());
            }

            let child = match roots.get(&key) {
                Some(parent) => extractor.extract_joined(child_table, &*stream, rel, parent)?,
                None => None,
            };
            if let Some(mut child) = child {
                for (hop, hop_table) in &hop_relationships {
                    let grandchild = extractor.extract_joined(hop_table, &*stream, hop, &child)?;
                    child.set_relation(self.graph.field_name(hop), Related::One(grandchild.map(Box::new)));
                }
                if let Some(list) = children.get_mut(&key) {
                    list.push(child);
                }
            }

            if !stream.advance()? {
                break;
            }
        }

        let field = self.graph.field_name(rel);
        let entities = roots
            .into_iter()
            .map(|(key, mut root)| {
                let list = children.shift_remove(&key).unwrap_or_default();
                root.set_relation(field.clone(), Related::Many(list));
                root
            })
            .collect();

        Ok(entities)
    }

    /// Single-valued relationships of the child table whose target is present,
    /// excluding the way back to the root.
    fn hop_relationships<R: RowSource + ?Sized>(
        &self,
        root: &TableSchema,
        child: &TableSchema,
        row: &R,
    ) -> Vec<(&'a Relationship, &'a TableSchema)> {
        let known = known_tables(self.graph, &child.name, &self.config);
        let presence = TablePresence::detect(&row.fields(), &known, self.config.separator);

        self.graph
            .outgoing(&child.name)
            .into_iter()
            .filter(|hop| hop.kind.is_single())
            .filter(|hop| hop.to_table != root.name && hop.to_table != child.name)
            .filter(|hop| presence.is_present(&hop.to_table))
            .filter_map(|hop| self.schema.table(&hop.to_table).map(|t| (hop, t)))
            .collect()
    }

    /// The root's primary key values, in declared order, joined by the delimiter.
    ///
    /// Backslashes and delimiters inside a value are escaped, so `("a|b", "c")`
    /// and `("a", "b|c")` give different keys.
    fn dedup_key<R: RowSource + ?Sized>(&self, table: &TableSchema, row: &R) -> Result<String, Error> {
        let delimiter = self.config.key_delimiter.as_str();
        let escaped_delimiter = format!("\\{}", delimiter);
        let mut parts = Vec::with_capacity(table.primary_key.len());

        for col in table.primary_key_columns() {
            let value = coerce(&col.name, row.read(&col.name, col.sql_type)?, col.sql_type)?;
            if value.is_null() {
                return Err(Error::NullField { table: table.name.clone(), column: col.name.clone() });
            }
            let part = value.to_string().replace('\\', "\\\\");
            parts.push(if delimiter.is_empty() { part } else { part.replace(delimiter, &escaped_delimiter) });
        }

        Ok(parts.join(delimiter))
    }

    fn extractor(&self) -> EntityExtractor<'a> {
        EntityExtractor::new(self.graph, self.config.separator)
    }

    fn table(&self, name: &str) -> Result<&'a TableSchema, Error> {
        self.schema.table(name).ok_or_else(|| Error::UnknownTable(name.to_string()))
    }
}
