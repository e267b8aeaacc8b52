//! # Schema Module
//!
//! The immutable table description that feeds relationship detection and
//! hydration. Schemas are normally produced by an external DDL parser or by
//! `#[derive(Model)]`; this module only models and validates them.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

// ============================================================================
// SQL Types
// ============================================================================

/// The concrete representation a declared SQL type is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Text,
    Int32,
    Int64,
    Float,
    Double,
    Boolean,
    Bytes,
    /// Timestamp without time zone.
    Timestamp,
    /// Timestamp with time zone, normalised to UTC.
    TimestampTz,
    Date,
    Time,
    Uuid,
    Json,
    /// Fixed-length float vector (pgvector style), with its declared dimension.
    Vector(Option<usize>),
}

impl SqlType {
    /// Maps declared SQL type text (`VARCHAR(50)`, `int8`, `vector(3)`, ...) to a `SqlType`.
    ///
    /// Unknown types fall back to `Text`.
    pub fn parse(declared: &str) -> Self {
        let lower = declared.trim().to_lowercase();
        let base = lower.split('(').next().unwrap_or(&lower).trim();
        let arg = lower
            .split_once('(')
            .and_then(|(_, rest)| rest.split(')').next())
            .map(str::trim);

        if base.ends_with("[]") {
            return SqlType::Json;
        }

        match base {
            "int" | "int4" | "integer" | "mediumint" | "serial" | "serial4" | "smallint" | "int2"
            | "smallserial" | "serial2" => SqlType::Int32,
            "tinyint" if arg == Some("1") => SqlType::Boolean,
            "tinyint" => SqlType::Int32,
            "bigint" | "int8" | "bigserial" | "serial8" => SqlType::Int64,
            "real" | "float4" | "float" => SqlType::Float,
            "double" | "double precision" | "float8" | "decimal" | "numeric" => SqlType::Double,
            "boolean" | "bool" | "bit" => SqlType::Boolean,
            "bytea" | "blob" | "longblob" | "mediumblob" | "tinyblob" | "binary" | "varbinary" => {
                SqlType::Bytes
            }
            "timestamp" | "datetime" | "timestamp without time zone" => SqlType::Timestamp,
            "timestamptz" | "timestamp with time zone" => SqlType::TimestampTz,
            "date" => SqlType::Date,
            "time" | "timetz" | "time without time zone" => SqlType::Time,
            "uuid" => SqlType::Uuid,
            "json" | "jsonb" => SqlType::Json,
            "vector" => SqlType::Vector(arg.and_then(|a| a.parse().ok())),
            _ => SqlType::Text,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Text => write!(f, "text"),
            SqlType::Int32 => write!(f, "int32"),
            SqlType::Int64 => write!(f, "int64"),
            SqlType::Float => write!(f, "float"),
            SqlType::Double => write!(f, "double"),
            SqlType::Boolean => write!(f, "boolean"),
            SqlType::Bytes => write!(f, "bytes"),
            SqlType::Timestamp => write!(f, "timestamp"),
            SqlType::TimestampTz => write!(f, "timestamptz"),
            SqlType::Date => write!(f, "date"),
            SqlType::Time => write!(f, "time"),
            SqlType::Uuid => write!(f, "uuid"),
            SqlType::Json => write!(f, "json"),
            SqlType::Vector(Some(n)) => write!(f, "vector({})", n),
            SqlType::Vector(None) => write!(f, "vector"),
        }
    }
}

// ============================================================================
// Columns and Tables
// ============================================================================

/// Target of a declared foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// The column name in the database.
    pub name: String,
    /// The declared SQL type text, as written in the DDL.
    pub declared_type: String,
    /// The representation values of this column are coerced into.
    pub sql_type: SqlType,
    /// Whether this column allows NULL values.
    pub nullable: bool,
    /// Whether a UNIQUE constraint was declared on this column.
    #[serde(default)]
    pub unique: bool,
    /// Explicitly declared foreign key target, if any.
    pub foreign_key: Option<ForeignKeyRef>,
}

impl Column {
    /// Creates a non-nullable column without a foreign key.
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        Self {
            name: name.into(),
            sql_type: SqlType::parse(&declared_type),
            declared_type,
            nullable: false,
            unique: false,
            foreign_key: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Declares a foreign key to `table.column`.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyRef { table: table.into(), column: column.into() });
        self
    }
}

/// Structural description of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    /// Ordered primary key column names.
    pub primary_key: Vec<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), columns: Vec::new(), primary_key: Vec::new() }
    }

    /// Appends a column.
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the ordered primary key.
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|pk| pk == column)
    }

    /// Columns that carry an explicitly declared foreign key, in declaration order.
    pub fn foreign_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.foreign_key.is_some())
    }

    /// Primary key columns in key order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.primary_key.iter().filter_map(|pk| self.get_column(pk))
    }

    /// Checks unique column names and a non-empty primary key over existing columns.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: String| Error::InvalidSchema { table: self.name.clone(), reason };

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(invalid(format!("duplicate column '{}'", col.name)));
            }
        }

        if self.primary_key.is_empty() {
            return Err(invalid("primary key is empty".to_string()));
        }

        for pk in &self.primary_key {
            if !seen.contains(pk.as_str()) {
                return Err(invalid(format!("primary key column '{}' does not exist", pk)));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Schema Set
// ============================================================================

/// An ordered, validated set of tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    tables: Vec<TableSchema>,
}

impl Schema {
    /// Builds a schema set, enforcing unique table names and per-table validity.
    pub fn new(tables: Vec<TableSchema>) -> Result<Self, Error> {
        let mut names = HashSet::new();
        for table in &tables {
            if !names.insert(table.name.as_str()) {
                return Err(Error::InvalidSchema {
                    table: table.name.clone(),
                    reason: "duplicate table name".to_string(),
                });
            }
            table.validate()?;
        }
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }
}
