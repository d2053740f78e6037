//! SQLite DDL renderer. SQLite cannot ALTER TABLE to add a foreign key, so
//! every relationship is folded into its source table's CREATE TABLE as an
//! inline constraint clause. Types follow SQLite's affinity model: lengths
//! are dropped and most exotic types collapse to TEXT/INTEGER/REAL/BLOB.

use crate::model::{Column, DataType, Relationship};

use super::SchemaGraph;

pub fn render(graph: &SchemaGraph) -> String {
    let statements: Vec<String> = graph
        .tables
        .iter()
        .map(|table| create_table(graph, &table.id, &table.name))
        .collect();
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

    for relationship in graph.resolvable_relationships() {
        if relationship.source_table_id == table_id {
            lines.push(foreign_key_clause(graph, relationship));
        }
    }

    format!("CREATE TABLE {} (\n  {}\n);", table_name, lines.join(",\n  "))
}

fn foreign_key_clause(graph: &SchemaGraph, relationship: &Relationship) -> String {
    let source_column = graph
        .column_name(&relationship.source_column_id)
        .unwrap_or_default();
    let target_table = graph
        .table_name(&relationship.target_table_id)
        .unwrap_or_default();
    let target_column = graph
        .column_name(&relationship.target_column_id)
        .unwrap_or_default();
    format!(
        "FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
        source_column,
        target_table,
        target_column,
        relationship.on_delete.as_sql(),
        relationship.on_update.as_sql(),
    )
}

fn column_line(column: &Column) -> String {
    let mut line = format!("{} {}", column.name, map_type(column));
    // PRIMARY KEY already implies NOT NULL in SQLite.
    if !column.nullable && !column.is_primary_key {
        line.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default_value {
        line.push_str(&format!(" DEFAULT {}", default));
    }
    if column.is_unique && !column.is_primary_key {
        line.push_str(" UNIQUE");
    }
    line
}

fn map_type(column: &Column) -> &'static str {
    match column.data_type {
        DataType::SmallInt
        | DataType::Int
        | DataType::BigInt
        | DataType::Serial
        | DataType::Boolean => "INTEGER",
        DataType::Decimal
        | DataType::Numeric
        | DataType::Float
        | DataType::Real
        | DataType::Double => "REAL",
        DataType::Char
        | DataType::Varchar
        | DataType::Text
        | DataType::Date
        | DataType::Time
        | DataType::Timestamp
        | DataType::TimestampTz
        | DataType::Json
        | DataType::Jsonb
        | DataType::Uuid => "TEXT",
        DataType::Binary | DataType::VarBinary | DataType::Blob => "BLOB",
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::shop_schema;
    use super::super::SchemaGraph;
    use super::*;

    #[test]
    fn foreign_keys_are_inlined_never_altered() {
        let schema = shop_schema();
        let sql = render(&SchemaGraph::new(&schema));
        assert_eq!(sql.matches("ALTER TABLE").count(), 0);
        assert!(sql.contains(
            "FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE ON UPDATE NO ACTION"
        ));
    }

    #[test]
    fn varchar_collapses_to_text_without_length() {
        let schema = shop_schema();
        let sql = render(&SchemaGraph::new(&schema));
        assert!(sql.contains("email TEXT NOT NULL UNIQUE"));
        assert!(!sql.contains("VARCHAR"));
        assert!(!sql.contains("(255)"));
    }

    #[test]
    fn primary_key_columns_skip_explicit_not_null() {
        let schema = shop_schema();
        let sql = render(&SchemaGraph::new(&schema));
        assert!(sql.contains("id INTEGER,"));
        assert!(!sql.contains("id INTEGER NOT NULL"));
        assert!(sql.contains("PRIMARY KEY (id)"));
    }
}
