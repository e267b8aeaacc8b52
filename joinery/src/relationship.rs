//! # Relationship Module
//!
//! Typed, directed associations between two tables.

use serde::{Deserialize, Serialize};

/// Cardinality of a relationship, read from the "from" table's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// One row of "from" matches at most one row of "to", and vice versa.
    OneToOne,
    /// One row of "from" owns many rows of "to".
    OneToMany,
    /// Many rows of "from" point at one row of "to".
    ManyToOne,
    /// Rows of "from" and "to" are associated through a junction table.
    ManyToMany,
}

impl RelationshipKind {
    /// Whether the relationship populates a single nullable reference.
    pub fn is_single(self) -> bool {
        matches!(self, RelationshipKind::OneToOne | RelationshipKind::ManyToOne)
    }
}

/// The junction table through which a many-to-many relationship passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Junction {
    /// The junction table name (e.g., `"post_categories"`).
    pub table: String,
    /// Junction column pointing at the relationship's "from" table.
    pub from_column: String,
    /// Junction column pointing at the relationship's "to" table.
    pub to_column: String,
}

/// A typed, directed association between two tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    /// Mirrors the nullability of the foreign key column driving this relationship.
    pub optional: bool,
    /// Present only for `ManyToMany`.
    pub junction: Option<Junction>,
}

impl Relationship {
    /// The reverse `OneToMany` of a `ManyToOne`.
    pub fn reversed(&self) -> Relationship {
        Relationship {
            kind: RelationshipKind::OneToMany,
            from_table: self.to_table.clone(),
            from_column: self.to_column.clone(),
            to_table: self.from_table.clone(),
            to_column: self.from_column.clone(),
            optional: self.optional,
            junction: None,
        }
    }

    /// The snake_case name of the relationship-valued field on the "from" entity.
    ///
    /// Single references are named after the foreign key column without its
    /// `_id` suffix (`supplier_id` -> `supplier`); collections are named after
    /// the table on the other side (`purchase_orders`).
    pub fn field_name(&self) -> String {
        match self.kind {
            RelationshipKind::ManyToOne | RelationshipKind::OneToOne => {
                match self.from_column.strip_suffix("_id").filter(|s| !s.is_empty()) {
                    Some(name) => name.to_string(),
                    None => self.to_table.clone(),
                }
            }
            RelationshipKind::OneToMany | RelationshipKind::ManyToMany => self.to_table.clone(),
        }
    }

    /// A longer field name for when [`field_name`](Self::field_name) clashes
    /// with another relationship of the same table.
    ///
    /// Collections add the joining column (`posts_author`, `posts_editor`) or
    /// the junction table; single references keep the whole FK column.
    pub fn qualified_field_name(&self) -> String {
        match (&self.kind, &self.junction) {
            (RelationshipKind::ManyToMany, Some(junction)) => format!("{}_{}", self.to_table, junction.table),
            (RelationshipKind::OneToMany | RelationshipKind::ManyToMany, _) => {
                let column = self.to_column.strip_suffix("_id").filter(|s| !s.is_empty()).unwrap_or(self.to_column.as_str());
                format!("{}_{}", self.to_table, column)
            }
            (RelationshipKind::ManyToOne | RelationshipKind::OneToOne, _) => self.from_column.clone(),
        }
    }
}
