use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

use crate::types::rust_type_to_sql;

/// Expands the `#[derive(Model)]` macro.
///
/// This function parses the struct fields and `#[orm(...)]` attributes to generate
/// `ColumnInfo` metadata for each field and the `impl Model` block.
pub fn expand(ast: DeriveInput) -> syn::Result<TokenStream> {
    let struct_name = &ast.ident;

    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields,
            _ => return Err(syn::Error::new_spanned(struct_name, "Model must have named fields")),
        },
        _ => return Err(syn::Error::new_spanned(struct_name, "Model must be a struct")),
    };

    // Parse struct-level #[orm(table = "...")]
    let mut table_name = struct_name.to_string().to_snake_case();
    for attr in &ast.attrs {
        if attr.path().is_ident("orm") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    table_name = value.value();
                    Ok(())
                } else {
                    Err(meta.error("unsupported struct attribute, expected `table`"))
                }
            })?;
        }
    }

    let mut column_defs = Vec::with_capacity(fields.named.len());

    for f in &fields.named {
        let Some(ident) = &f.ident else { continue };
        let column_name = ident.to_string();
        let column_name = column_name.strip_prefix("r#").unwrap_or(&column_name).to_string();

        let (mut sql_type, is_nullable) = rust_type_to_sql(&f.ty);
        let mut is_primary_key = false;
        let mut unique = false;
        let mut foreign_table_tokens = quote! { None };
        let mut foreign_key_tokens = quote! { None };

        // Parse attributes #[orm(...)]
        for attr in &f.attrs {
            if !attr.path().is_ident("orm") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    is_primary_key = true;
                } else if meta.path.is_ident("unique") {
                    unique = true;
                } else if meta.path.is_ident("sql_type") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    sql_type = value.value();
                } else if meta.path.is_ident("foreign_key") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    let fk_string = value.value();

                    match fk_string.split_once("::") {
                        Some((table, col)) if !table.is_empty() && !col.is_empty() => {
                            let table = table.to_snake_case();
                            foreign_table_tokens = quote! { Some(#table) };
                            foreign_key_tokens = quote! { Some(#col) };
                        }
                        _ => return Err(meta.error("Invalid format for foreign_key. Use 'Table::column'")),
                    }
                } else {
                    return Err(meta.error("unsupported orm attribute"));
                }
                Ok(())
            })?;
        }

        column_defs.push(quote! {
            joinery::ColumnInfo {
                name: #column_name,
                sql_type: #sql_type,
                is_primary_key: #is_primary_key,
                is_nullable: #is_nullable,
                unique: #unique,
                foreign_table: #foreign_table_tokens,
                foreign_key: #foreign_key_tokens,
            }
        });
    }

    Ok(quote! {
        impl joinery::Model for #struct_name {
            fn table_name() -> &'static str {
                #table_name
            }

            fn columns() -> Vec<joinery::ColumnInfo> {
                vec![#(#column_defs),*]
            }
        }
    })
}
