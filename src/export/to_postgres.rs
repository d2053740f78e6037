//! PostgreSQL DDL renderer. Identifiers are emitted bare; foreign keys go
//! into an ALTER TABLE block after all CREATE TABLE statements.

use crate::model::{Column, DataType};

use super::SchemaGraph;

pub fn render(graph: &SchemaGraph) -> String {
    let mut statements: Vec<String> = graph
        .tables
        .iter()
        .map(|table| create_table(graph, &table.id, &table.name))
        .collect();

    for relationship in graph.resolvable_relationships() {
        let source_table = graph.table_name(&relationship.source_table_id).unwrap_or_default();
        let target_table = graph.table_name(&relationship.target_table_id).unwrap_or_default();
        let source_column = graph
            .column_name(&relationship.source_column_id)
            .unwrap_or_default();
        let target_column = graph
            .column_name(&relationship.target_column_id)
            .unwrap_or_default();
        statements.push(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {};",
            source_table,
            graph.constraint_name(relationship),
            source_column,
            target_table,
            target_column,
            relationship.on_delete.as_sql(),
            relationship.on_update.as_sql(),
        ));
    }

    statements.join("\n\n")
}

fn create_table(graph: &SchemaGraph, table_id: &str, table_name: &str) -> String {
    let mut lines: Vec<String> = graph
        .columns_of(table_id)
        .into_iter()
        .map(column_line)
        .collect();

    let primary_keys: Vec<&str> = graph
        .primary_keys_of(table_id)
        .into_iter()
        .map(|c| c.name.as_str())
        .collect();
    if !primary_keys.is_empty() {
        lines.push(format!("PRIMARY KEY ({})", primary_keys.join(", ")));
    }

    format!("CREATE TABLE {} (\n  {}\n);", table_name, lines.join(",\n  "))
}

fn column_line(column: &Column) -> String {
    let mut line = format!("{} {}", column.name, map_type(column));
    if !column.nullable {
        line.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default_value {
        // Default expressions are trusted raw SQL fragments.
        line.push_str(&format!(" DEFAULT {}", default));
    }
    if column.is_unique && !column.is_primary_key {
        line.push_str(" UNIQUE");
    }
    line
}

fn map_type(column: &Column) -> String {
    let base = match column.data_type {
        DataType::SmallInt => "SMALLINT",
        DataType::Int => "INTEGER",
        DataType::BigInt => "BIGINT",
        DataType::Decimal => "DECIMAL",
        DataType::Numeric => "NUMERIC",
        DataType::Float => "REAL",
        DataType::Real => "REAL",
        DataType::Double => "DOUBLE PRECISION",
        DataType::Serial => "SERIAL",
        DataType::Char => "CHAR",
        DataType::Varchar => "VARCHAR",
        DataType::Text => "TEXT",
        DataType::Date => "DATE",
        DataType::Time => "TIME",
        DataType::Timestamp => "TIMESTAMP",
        DataType::TimestampTz => "TIMESTAMPTZ",
        DataType::Boolean => "BOOLEAN",
        DataType::Binary | DataType::VarBinary | DataType::Blob => "BYTEA",
        DataType::Json => "JSON",
        DataType::Jsonb => "JSONB",
        DataType::Uuid => "UUID",
    };
    format!("{}{}", base, super::type_suffix(column))
}
