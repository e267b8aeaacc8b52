use syn::{GenericArgument, PathArguments, Type};

/// Maps Rust types to their corresponding SQL types.
///
/// Returns a tuple containing:
/// 1. The SQL type string (e.g., "TEXT", "INTEGER").
/// 2. A boolean indicating if the type is nullable (Option<T>).
pub fn rust_type_to_sql(ty: &Type) -> (String, bool) {
    let Type::Path(type_path) = ty else {
        return ("TEXT".to_string(), false);
    };
    let Some(segment) = type_path.path.segments.last() else {
        return ("TEXT".to_string(), false);
    };
    let type_name = segment.ident.to_string();

    // Handle Option<T> for nullable columns
    if type_name == "Option" {
        if let Some(inner_ty) = first_generic(&segment.arguments) {
            let (inner_sql_type, _ignored_nullable) = rust_type_to_sql(inner_ty);
            return (inner_sql_type, true);
        }
    }

    // Vec<u8> is a byte column, Vec<f32> an embedding vector
    if type_name == "Vec" {
        if let Some(Type::Path(inner)) = first_generic(&segment.arguments) {
            match inner.path.segments.last().map(|s| s.ident.to_string()).as_deref() {
                Some("u8") => return ("BYTEA".to_string(), false),
                Some("f32") => return ("VECTOR".to_string(), false),
                _ => return ("JSONB".to_string(), false),
            }
        }
    }

    let sql_type = match type_name.as_str() {
        "i16" => "SMALLINT",
        "i32" => "INTEGER",
        "i64" => "BIGINT",
        "f32" => "REAL",
        "f64" => "DOUBLE PRECISION",
        "bool" => "BOOLEAN",
        "String" => "TEXT",
        "Uuid" => "UUID",
        "DateTime" => "TIMESTAMPTZ",
        "NaiveDateTime" => "TIMESTAMP",
        "NaiveDate" => "DATE",
        "NaiveTime" => "TIME",
        "Value" => "JSONB",
        _ => "TEXT",
    };
    (sql_type.to_string(), false)
}

fn first_generic(arguments: &PathArguments) -> Option<&Type> {
    if let PathArguments::AngleBracketed(args) = arguments {
        if let Some(GenericArgument::Type(inner_ty)) = args.args.first() {
            return Some(inner_ty);
        }
    }
    None
}
