use crate::schema::{Column, ForeignKeyRef, SqlType, TableSchema};

/// Static metadata about a database column.
///
/// It is usually populated automatically by the `#[derive(Model)]` macro and
/// converted into a [`Column`] when the table schema is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnInfo {
    /// The column name in the database.
    pub name: &'static str,
    /// The SQL type of the column (e.g., "TEXT", "INTEGER", "TIMESTAMPTZ").
    pub sql_type: &'static str,
    /// Whether this column is part of the Primary Key.
    pub is_primary_key: bool,
    /// Whether this column allows NULL values.
    pub is_nullable: bool,
    /// Whether this column has a UNIQUE constraint.
    pub unique: bool,
    /// The name of the foreign table, if this is a Foreign Key.
    pub foreign_table: Option<&'static str>,
    /// The name of the foreign column, if this is a Foreign Key.
    pub foreign_key: Option<&'static str>,
}

impl ColumnInfo {
    /// Converts the static metadata into an owned schema column.
    pub fn to_column(&self) -> Column {
        let foreign_key = match (self.foreign_table, self.foreign_key) {
            (Some(table), Some(column)) => Some(ForeignKeyRef { table: table.to_string(), column: column.to_string() }),
            _ => None,
        };

        Column {
            name: self.name.strip_prefix("r#").unwrap_or(self.name).to_string(),
            declared_type: self.sql_type.to_string(),
            sql_type: SqlType::parse(self.sql_type),
            nullable: self.is_nullable,
            unique: self.unique,
            foreign_key,
        }
    }
}

/// A Rust type that describes one database table.
///
/// This trait is typically implemented automatically via the `#[derive(Model)]` macro.
///
/// # Example
///
/// ```rust,ignore
/// use joinery::Model;
///
/// #[derive(Model)]
/// #[orm(table = "purchase_orders")]
/// struct PurchaseOrder {
///     #[orm(primary_key)]
///     po_number: String,
///     #[orm(foreign_key = "suppliers::id")]
///     supplier_id: String,
/// }
/// ```
pub trait Model {
    /// Returns the table name associated with this model.
    fn table_name() -> &'static str;

    /// Returns the list of column definitions for this model.
    fn columns() -> Vec<ColumnInfo>;

    /// Builds the table schema, with the primary key in field order.
    fn schema() -> TableSchema {
        let columns = Self::columns();
        let primary_key: Vec<String> = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.to_column().name)
            .collect();

        TableSchema {
            name: Self::table_name().to_string(),
            columns: columns.iter().map(ColumnInfo::to_column).collect(),
            primary_key,
        }
    }
}
