//! # joinery-macro
//!
//! Procedural macros for joinery. `#[derive(Model)]` turns a struct into
//! static column metadata from which a `TableSchema` is built.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod derive_model;
mod types;

/// Derives `joinery::Model` for a struct with named fields.
///
/// Supported attributes:
///
/// - struct: `#[orm(table = "purchase_orders")]` (defaults to the snake_case struct name)
/// - field: `#[orm(primary_key)]`, `#[orm(unique)]`,
///   `#[orm(foreign_key = "Table::column")]`, `#[orm(sql_type = "VECTOR(3)")]`
///
/// `Option<T>` fields are nullable.
#[proc_macro_derive(Model, attributes(orm))]
pub fn model_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_model::expand(ast).unwrap_or_else(syn::Error::into_compile_error).into()
}
