//! # joinery
//!
//! Infers typed relationships between tables from declared foreign keys and
//! hydrates the flat rows of a SQL JOIN back into a deduplicated, nested
//! entity graph.
//!
//! ## Quick Start
//!
//! ```rust
//! use joinery::{Column, Hydrator, Record, RecordStream, RelationshipDetector, RelationshipGraph, Schema, TableSchema};
//!
//! # fn main() -> Result<(), joinery::Error> {
//! let schema = Schema::new(vec![
//!     TableSchema::new("suppliers")
//!         .column(Column::new("id", "TEXT"))
//!         .column(Column::new("name", "TEXT"))
//!         .primary_key(["id"]),
//!     TableSchema::new("purchase_orders")
//!         .column(Column::new("po_number", "TEXT"))
//!         .column(Column::new("supplier_id", "TEXT").references("suppliers", "id"))
//!         .primary_key(["po_number"]),
//! ])?;
//!
//! let graph = RelationshipGraph::build(&schema, &RelationshipDetector::default());
//! let hydrator = Hydrator::new(&schema, &graph);
//!
//! let rows = RecordStream::new(vec![
//!     Record::new().with("po_number", "PO1").with("supplier_id", "S1").with("suppliers.name", "Acme"),
//! ]);
//! let orders = hydrator.hydrate("purchase_orders", rows)?;
//!
//! assert_eq!(orders[0].one("supplier").unwrap().get("name").unwrap().as_str(), Some("Acme"));
//! # Ok(())
//! # }
//! ```

pub mod any_row;
pub mod config;
pub mod database;
pub mod detector;
pub mod entity;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod hydrator;
pub mod model;
pub mod presence;
pub mod relationship;
pub mod row;
pub mod schema;
pub mod value;

pub use joinery_macro::Model;

pub use any_row::SqlxRowStream;
pub use config::{DetectorConfig, HydrationConfig};
pub use database::{Connection, Database, DatabaseBuilder, Drivers, RawQuery};
pub use detector::{NamePatternHint, RelationshipDetector, UniqueHint};
pub use entity::{Entity, Related};
pub use error::Error;
pub use extractor::{AliasFormat, EntityExtractor, JoinBinding, ALIAS_CHAIN};
pub use graph::RelationshipGraph;
pub use hydrator::Hydrator;
pub use model::{ColumnInfo, Model};
pub use presence::{known_tables, Strategy, TablePresence};
pub use relationship::{Junction, Relationship, RelationshipKind};
pub use row::{FieldDescriptor, Record, RecordStream, RowSource, RowStream};
pub use schema::{Column, ForeignKeyRef, Schema, SqlType, TableSchema};
pub use value::{coerce, RawValue, Value};
