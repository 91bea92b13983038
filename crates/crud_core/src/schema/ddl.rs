//! DDL derived from entity schemas.

use super::{EntitySchema, FieldDescriptor, FieldKind, SchemaError};

/// Builds the idempotent DDL batch creating the entity table and its indices.
///
/// Rows are keyed by SQLite's implicit `rowid`; `uuid` is the public key.
pub fn create_table_sql(schema: &EntitySchema) -> Result<String, SchemaError> {
    schema.validate()?;

    let columns = schema
        .columns()
        .map(column_definition)
        .collect::<Vec<_>>()
        .join(",\n    ");
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {columns}\n);\n",
        schema.table
    );

    for field in schema.columns().filter(|field| field.indexed && !field.unique) {
        sql.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column});\n",
            table = schema.table,
            column = field.name
        ));
    }

    Ok(sql)
}

fn column_definition(field: &FieldDescriptor) -> String {
    let mut definition = format!("{} {}", field.name, sql_type(field.kind));
    if !field.nullable {
        definition.push_str(" NOT NULL");
    }
    if field.unique {
        definition.push_str(" UNIQUE");
    }
    match field.kind {
        FieldKind::Boolean => {
            definition.push_str(&format!(" DEFAULT 0 CHECK ({} IN (0, 1))", field.name));
        }
        FieldKind::Actor => definition.push_str(" REFERENCES users(id) ON DELETE SET NULL"),
        FieldKind::ToOne { target } => {
            definition.push_str(&format!(" REFERENCES {target}(uuid) ON DELETE SET NULL"));
        }
        _ => {}
    }
    definition
}

fn sql_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Integer | FieldKind::Boolean | FieldKind::Actor => "INTEGER",
        FieldKind::Real => "REAL",
        FieldKind::Uuid
        | FieldKind::Text
        | FieldKind::Timestamp
        | FieldKind::Json
        | FieldKind::ToOne { .. }
        | FieldKind::ToMany { .. } => "TEXT",
    }
}
