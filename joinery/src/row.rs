//! # Row Stream Module
//!
//! The forward-only cursor contract the hydrator pulls rows from, and an
//! in-memory implementation over [`Record`]s.

use indexmap::IndexMap;

use crate::{schema::SqlType, value::RawValue, Error};

/// Name and best-effort origin table of one field in a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    /// Table the field was selected from, when the source exposes it.
    pub origin_table: Option<String>,
}

/// Read access to the current row.
pub trait RowSource {
    /// Descriptors of the fields in the current result.
    fn fields(&self) -> Vec<FieldDescriptor>;

    /// Reads `field` from the current row.
    ///
    /// `hint` is the declared type of the column being materialized; sources
    /// that decode lazily use it to pick a decoder. Returns
    /// `Error::FieldNotFound` when the row has no such field.
    fn read(&self, field: &str, hint: SqlType) -> Result<RawValue, Error>;

    /// Whether the row has a field named `field`.
    fn has_field(&self, field: &str) -> bool {
        self.fields().iter().any(|f| f.name == field)
    }
}

/// A single-pass, forward-only row cursor.
pub trait RowStream: RowSource {
    /// Moves to the next row. Returns `false` once the stream is exhausted.
    fn advance(&mut self) -> Result<bool, Error>;

    /// Releases the stream. Must be safe to call more than once.
    fn close(&mut self);
}

impl<S: RowSource + ?Sized> RowSource for &mut S {
    fn fields(&self) -> Vec<FieldDescriptor> {
        (**self).fields()
    }

    fn read(&self, field: &str, hint: SqlType) -> Result<RawValue, Error> {
        (**self).read(field, hint)
    }

    fn has_field(&self, field: &str) -> bool {
        (**self).has_field(field)
    }
}

impl<S: RowStream + ?Sized> RowStream for &mut S {
    fn advance(&mut self) -> Result<bool, Error> {
        (**self).advance()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct RecordField {
    value: RawValue,
    origin: Option<String>,
}

/// One row as an ordered field-name to value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, RecordField>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field without origin metadata.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.fields.insert(name.into(), RecordField { value: value.into(), origin: None });
        self
    }

    /// Appends a field annotated with the table it was selected from.
    pub fn with_origin(
        mut self,
        name: impl Into<String>,
        value: impl Into<RawValue>,
        origin_table: impl Into<String>,
    ) -> Self {
        self.fields.insert(name.into(), RecordField { value: value.into(), origin: Some(origin_table.into()) });
        self
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name).map(|f| &f.value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl RowSource for Record {
    fn fields(&self) -> Vec<FieldDescriptor> {
        self.fields
            .iter()
            .map(|(name, f)| FieldDescriptor { name: name.clone(), origin_table: f.origin.clone() })
            .collect()
    }

    fn read(&self, field: &str, _hint: SqlType) -> Result<RawValue, Error> {
        self.get(field).cloned().ok_or_else(|| Error::FieldNotFound(field.to_string()))
    }

    fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

/// A [`RowStream`] over an in-memory list of records.
#[derive(Debug, Default)]
pub struct RecordStream {
    rows: std::vec::IntoIter<Record>,
    current: Option<Record>,
    closed: bool,
}

impl RecordStream {
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows: rows.into_iter(), current: None, closed: false }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn current(&self) -> Result<&Record, Error> {
        self.current.as_ref().ok_or_else(|| Error::Stream("no current row".to_string()))
    }
}

impl RowSource for RecordStream {
    fn fields(&self) -> Vec<FieldDescriptor> {
        self.current.as_ref().map(RowSource::fields).unwrap_or_default()
    }

    fn read(&self, field: &str, hint: SqlType) -> Result<RawValue, Error> {
        self.current()?.read(field, hint)
    }

    fn has_field(&self, field: &str) -> bool {
        self.current.as_ref().is_some_and(|r| r.has_field(field))
    }
}

impl RowStream for RecordStream {
    fn advance(&mut self) -> Result<bool, Error> {
        if self.closed {
            return Err(Error::Stream("stream is closed".to_string()));
        }
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn close(&mut self) {
        self.closed = true;
        self.current = None;
        self.rows = Vec::new().into_iter();
    }
}

impl FromIterator<Record> for RecordStream {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
