//! # Entity Extractor Module
//!
//! Materializes one entity from the current row.
//!
//! Root entities are read by bare column name. Joined (related) entities are
//! resolved through an ordered list of candidate field names, because drivers
//! and hand-written SELECTs label joined columns differently:
//!
//! | format        | example            |
//! |---------------|--------------------|
//! | `Qualified`   | `suppliers.name`   |
//! | `Underscored` | `suppliers_name`   |
//! | `Initial`     | `s_name`           |
//! | `Bare`        | `name`             |
//!
//! The first candidate present in the row wins. A joined entity needs at
//! least one non-NULL aliased column; the bare name never creates one.

use log::trace;

use crate::{
    entity::{Entity, Related},
    graph::RelationshipGraph,
    relationship::Relationship,
    row::RowSource,
    schema::{Column, TableSchema},
    value::{coerce, Value},
    Error,
};

// ============================================================================
// Alias Formats
// ============================================================================

/// One way of labelling a joined column in a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasFormat {
    /// `table<sep>column`
    Qualified,
    /// `table_column`
    Underscored,
    /// `<first letter of table>_column`
    Initial,
    /// `column`
    Bare,
}

/// The order candidates are tried in for related entities.
pub const ALIAS_CHAIN: [AliasFormat; 4] =
    [AliasFormat::Qualified, AliasFormat::Underscored, AliasFormat::Initial, AliasFormat::Bare];

impl AliasFormat {
    /// The field name this format gives `table`.`column`.
    pub fn candidate(self, table: &str, column: &str, separator: char) -> String {
        match self {
            AliasFormat::Qualified => format!("{}{}{}", table, separator, column),
            AliasFormat::Underscored => format!("{}_{}", table, column),
            AliasFormat::Initial => match table.chars().next() {
                Some(initial) => format!("{}_{}", initial, column),
                None => column.to_string(),
            },
            AliasFormat::Bare => column.to_string(),
        }
    }
}

// ============================================================================
// Join Binding
// ============================================================================

/// A value for one column of a related entity, known from the parent entity
/// through the join condition (e.g. `suppliers.id` = the root's `supplier_id`).
///
/// Consulted after every aliased candidate and before the bare column name.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinBinding {
    pub column: String,
    pub value: Value,
}

impl JoinBinding {
    /// Binding for the entity on the "to" side of `relationship`, taken from
    /// the already extracted "from" side entity.
    pub fn from_parent(relationship: &Relationship, parent: &Entity) -> Option<Self> {
        if relationship.junction.is_some() {
            return None;
        }
        let value = parent.get(&relationship.from_column)?;
        if value.is_null() {
            return None;
        }
        Some(Self { column: relationship.to_column.clone(), value: value.clone() })
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// Builds entities from rows. Root entities get an empty slot for every
/// outgoing relationship of their table.
#[derive(Debug, Clone, Copy)]
pub struct EntityExtractor<'g> {
    graph: &'g RelationshipGraph,
    separator: char,
}

impl<'g> EntityExtractor<'g> {
    pub fn new(graph: &'g RelationshipGraph, separator: char) -> Self {
        Self { graph, separator }
    }

    /// Extracts the root entity, reading every column by its bare name.
    ///
    /// A missing nullable non-key column reads as NULL; anything else missing,
    /// a NULL in a non-nullable column, or an uncoercible value is an error.
    pub fn extract_root<R: RowSource + ?Sized>(&self, table: &TableSchema, row: &R) -> Result<Entity, Error> {
        let mut entity = self.empty_entity(table);

        for col in &table.columns {
            let value = match row.read(&col.name, col.sql_type) {
                Ok(raw) => coerce(&col.name, raw, col.sql_type)?,
                Err(Error::FieldNotFound(_)) if col.nullable && !table.is_primary_key(&col.name) => Value::Null,
                Err(e) => return Err(e),
            };
            check_nullability(table, col, &value)?;
            entity.set_field(col.name.clone(), value);
        }

        Ok(entity)
    }

    /// Extracts a joined entity through the alias chain.
    ///
    /// The entity exists only if at least one of its columns resolves through
    /// an aliased candidate to a non-NULL value. The join binding and then the
    /// bare name only fill the remaining columns. Joined entities carry no
    /// relationship slots of their own.
    ///
    /// Errors for which [`Error::is_recoverable`] holds mean "not present in
    /// this row"; use [`try_extract_related`](Self::try_extract_related) to
    /// get those as `None`.
    pub fn extract_related<R: RowSource + ?Sized>(
        &self,
        table: &TableSchema,
        row: &R,
        binding: Option<&JoinBinding>,
    ) -> Result<Entity, Error> {
        let mut aliased = Vec::with_capacity(table.columns.len());
        for col in &table.columns {
            aliased.push(self.resolve(table, col, row)?);
        }
        if !aliased.iter().flatten().any(|value| !value.is_null()) {
            return Err(Error::FieldNotFound(format!("{}.*", table.name)));
        }

        let mut entity = Entity::new(table.name.clone());
        for (col, found) in table.columns.iter().zip(aliased) {
            let value = match found {
                Some(value) => value,
                None => self.fill_gap(table, col, row, binding)?,
            };
            check_nullability(table, col, &value)?;
            entity.set_field(col.name.clone(), value);
        }

        Ok(entity)
    }

    /// Extracts the entity on the "to" side of `relationship` for `parent`.
    ///
    /// `None` when the parent's join column is NULL, whatever else the row holds.
    pub fn extract_joined<R: RowSource + ?Sized>(
        &self,
        table: &TableSchema,
        row: &R,
        relationship: &Relationship,
        parent: &Entity,
    ) -> Result<Option<Entity>, Error> {
        if relationship.junction.is_none() && parent.get(&relationship.from_column).is_some_and(Value::is_null) {
            trace!("No '{}' entity: {}.{} is NULL", table.name, parent.table(), relationship.from_column);
            return Ok(None);
        }
        let binding = JoinBinding::from_parent(relationship, parent);
        self.try_extract_related(table, row, binding.as_ref())
    }

    /// Like [`extract_related`](Self::extract_related), but an absent entity is `Ok(None)`.
    ///
    /// Coercion failures still propagate.
    pub fn try_extract_related<R: RowSource + ?Sized>(
        &self,
        table: &TableSchema,
        row: &R,
        binding: Option<&JoinBinding>,
    ) -> Result<Option<Entity>, Error> {
        match self.extract_related(table, row, binding) {
            Ok(entity) => Ok(Some(entity)),
            Err(e) if e.is_recoverable() => {
                trace!("No '{}' entity in row: {}", table.name, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Aliased candidate names for `table`.`column`, in lookup order (bare name last).
    pub fn candidates(&self, table: &str, column: &str) -> Vec<String> {
        ALIAS_CHAIN.iter().map(|format| format.candidate(table, column, self.separator)).collect()
    }

    /// An entity with no columns and an empty slot per outgoing relationship.
    pub fn empty_entity(&self, table: &TableSchema) -> Entity {
        let mut entity = Entity::new(table.name.clone());
        for rel in self.graph.outgoing(&table.name) {
            let name = self.graph.field_name(rel);
            if entity.relation(&name).is_none() {
                let slot = if rel.kind.is_single() { Related::One(None) } else { Related::Many(Vec::new()) };
                entity.set_relation(name, slot);
            }
        }
        entity
    }

    /// A column of an already found joined entity that no alias supplied.
    fn fill_gap<R: RowSource + ?Sized>(
        &self,
        table: &TableSchema,
        col: &Column,
        row: &R,
        binding: Option<&JoinBinding>,
    ) -> Result<Value, Error> {
        if let Some(bound) = binding.filter(|b| b.column == col.name) {
            return Ok(bound.value.clone());
        }
        match row.read(&col.name, col.sql_type) {
            Ok(raw) => coerce(&col.name, raw, col.sql_type),
            Err(Error::FieldNotFound(_)) if col.nullable && !table.is_primary_key(&col.name) => Ok(Value::Null),
            Err(Error::FieldNotFound(_)) => Err(Error::FieldNotFound(format!("{}.{}", table.name, col.name))),
            Err(e) => Err(e),
        }
    }

    /// Tries the aliased (non-bare) candidates; `Ok(None)` when none is in the row.
    fn resolve<R: RowSource + ?Sized>(
        &self,
        table: &TableSchema,
        col: &Column,
        row: &R,
    ) -> Result<Option<Value>, Error> {
        for format in ALIAS_CHAIN.iter().filter(|f| **f != AliasFormat::Bare) {
            let name = format.candidate(&table.name, &col.name, self.separator);
            match row.read(&name, col.sql_type) {
                Ok(raw) => return coerce(&name, raw, col.sql_type).map(Some),
                Err(Error::FieldNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

fn check_nullability(table: &TableSchema, col: &Column, value: &Value) -> Result<(), Error> {
    if value.is_null() && !col.nullable {
        return Err(Error::NullField { table: table.name.clone(), column: col.name.clone() });
    }
    Ok(())
}
