//! # AnyRow Stream Support
//!
//! Adapts rows fetched through sqlx's `Any` driver to the [`RowStream`]
//! contract. sqlx exposes no origin-table metadata, so presence detection
//! relies on field-name prefixes for these streams.
//!
//! The `Any` driver cannot carry SQLite `BOOLEAN` columns: fetching one fails
//! with a column decode error before any row reaches the stream. Declare such
//! columns `INTEGER` (or `CAST(.. AS INTEGER)` in the SELECT); `coerce` maps
//! `0`/`1` to booleans when the schema declares the column `BOOLEAN`.

use std::fmt;

use sqlx::{any::AnyRow, Column, Row};

use crate::{
    row::{FieldDescriptor, RowSource, RowStream},
    schema::SqlType,
    value::RawValue,
    Error,
};

type Decoder = fn(&AnyRow, &str) -> Result<RawValue, sqlx::Error>;

fn as_int(row: &AnyRow, field: &str) -> Result<RawValue, sqlx::Error> {
    Ok(row.try_get::<Option<i64>, _>(field)?.into())
}

fn as_float(row: &AnyRow, field: &str) -> Result<RawValue, sqlx::Error> {
    Ok(row.try_get::<Option<f64>, _>(field)?.into())
}

fn as_bool(row: &AnyRow, field: &str) -> Result<RawValue, sqlx::Error> {
    Ok(row.try_get::<Option<bool>, _>(field)?.into())
}

fn as_text(row: &AnyRow, field: &str) -> Result<RawValue, sqlx::Error> {
    Ok(row.try_get::<Option<String>, _>(field)?.into())
}

fn as_bytes(row: &AnyRow, field: &str) -> Result<RawValue, sqlx::Error> {
    Ok(row.try_get::<Option<Vec<u8>>, _>(field)?.into())
}

const INT_FIRST: &[Decoder] = &[as_int, as_text, as_float];
const FLOAT_FIRST: &[Decoder] = &[as_float, as_int, as_text];
const BOOL_FIRST: &[Decoder] = &[as_bool, as_int, as_text];
const BYTES_FIRST: &[Decoder] = &[as_bytes, as_text];
const VECTOR: &[Decoder] = &[as_text, as_bytes];
const TEXT_FIRST: &[Decoder] = &[as_text, as_int, as_float, as_bool, as_bytes];

/// Decoders to try, most natural for the declared type first.
fn decoders(hint: SqlType) -> &'static [Decoder] {
    match hint {
        SqlType::Int32 | SqlType::Int64 => INT_FIRST,
        SqlType::Float | SqlType::Double => FLOAT_FIRST,
        SqlType::Boolean => BOOL_FIRST,
        SqlType::Bytes => BYTES_FIRST,
        SqlType::Vector(_) => VECTOR,
        _ => TEXT_FIRST,
    }
}

/// Reads one field of an `AnyRow` as a loose value.
pub fn decode_field(row: &AnyRow, field: &str, hint: SqlType) -> Result<RawValue, Error> {
    if row.try_column(field).is_err() {
        return Err(Error::FieldNotFound(field.to_string()));
    }

    let mut last_error = None;
    for decode in decoders(hint) {
        match decode(row, field) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }

    let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
    Err(Error::malformed(field, hint, reason))
}

/// A [`RowStream`] over rows fetched with sqlx.
pub struct SqlxRowStream {
    rows: std::vec::IntoIter<AnyRow>,
    current: Option<AnyRow>,
    closed: bool,
}

impl SqlxRowStream {
    pub fn new(rows: Vec<AnyRow>) -> Self {
        Self { rows: rows.into_iter(), current: None, closed: false }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl fmt::Debug for SqlxRowStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlxRowStream")
            .field("remaining", &self.rows.len())
            .field("has_current", &self.current.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

impl RowSource for SqlxRowStream {
    fn fields(&self) -> Vec<FieldDescriptor> {
        match &self.current {
            Some(row) => row
                .columns()
                .iter()
                .map(|c| FieldDescriptor { name: c.name().to_string(), origin_table: None })
                .collect(),
            None => Vec::new(),
        }
    }

    fn read(&self, field: &str, hint: SqlType) -> Result<RawValue, Error> {
        let row = self.current.as_ref().ok_or_else(|| Error::Stream("no current row".to_string()))?;
        decode_field(row, field, hint)
    }

    fn has_field(&self, field: &str) -> bool {
        self.current.as_ref().is_some_and(|row| row.try_column(field).is_ok())
    }
}

impl RowStream for SqlxRowStream {
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
