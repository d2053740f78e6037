//! MySQL DDL renderer. Identifiers are backtick-quoted; foreign keys go
//! into an ALTER TABLE block after all CREATE TABLE statements.

use crate::model::{Column, DataType};

use super::SchemaGraph;

fn quote(name: &str) -> String {
    format!("`{}`", name)
}

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
            quote(source_table),
            quote(&graph.constraint_name(relationship)),
            quote(source_column),
            quote(target_table),
            quote(target_column),
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

    let primary_keys: Vec<String> = graph
        .primary_keys_of(table_id)
        .into_iter()
        .map(|c| quote(&c.name))
        .collect();
    if !primary_keys.is_empty() {
        lines.push(format!("PRIMARY KEY ({})", primary_keys.join(", ")));
    }

    format!(
        "CREATE TABLE {} (\n  {}\n);",
        quote(table_name),
        lines.join(",\n  ")
    )
}

fn column_line(column: &Column) -> String {
    let mut line = format!("{} {}", quote(&column.name), map_type(column));
    if !column.nullable {
        line.push_str(" NOT NULL");
    }
    // SERIAL already expands to INT AUTO_INCREMENT.
    if column.is_auto_increment && column.data_type != DataType::Serial {
        line.push_str(" AUTO_INCREMENT");
    }
    if let Some(default) = &column.default_value {
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
        DataType::Int => "INT",
        DataType::BigInt => "BIGINT",
        DataType::Decimal => "DECIMAL",
        DataType::Numeric => "NUMERIC",
        DataType::Float => "FLOAT",
        DataType::Real | DataType::Double => "DOUBLE",
        DataType::Serial => "INT AUTO_INCREMENT",
        DataType::Char => "CHAR",
        DataType::Varchar => "VARCHAR",
        DataType::Text => "TEXT",
        DataType::Date => "DATE",
        DataType::Time => "TIME",
        DataType::Timestamp | DataType::TimestampTz => "TIMESTAMP",
        DataType::Boolean => "TINYINT(1)",
        DataType::Binary => "BINARY",
        DataType::VarBinary => "VARBINARY",
        DataType::Blob => "BLOB",
        DataType::Json | DataType::Jsonb => "JSON",
        DataType::Uuid => "CHAR(36)",
    };
    format!("{}{}", base, super::type_suffix(column))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{column, shop_schema};
    use super::super::SchemaGraph;
    use super::*;

    #[test]
    fn identifiers_are_backtick_quoted() {
        let schema = shop_schema();
        let sql = render(&SchemaGraph::new(&schema));
        assert!(sql.contains("CREATE TABLE `users`"));
        assert!(sql.contains("`email` VARCHAR(255) NOT NULL UNIQUE"));
        assert!(sql.contains("PRIMARY KEY (`id`)"));
        assert!(sql.contains("REFERENCES `users` (`id`)"));
        assert_eq!(sql.matches("ALTER TABLE").count(), 1);
    }

    #[test]
    fn serial_maps_to_int_auto_increment() {
        let mut schema = shop_schema();
        let mut seq = column("c-seq", "t-orders", "seq", DataType::Serial, 5);
        seq.nullable = false;
        schema.columns.push(seq);
        let sql = render(&SchemaGraph::new(&schema));
        assert!(sql.contains("`seq` INT AUTO_INCREMENT NOT NULL"));
    }

    #[test]
    fn auto_increment_flag_appends_once() {
        let mut schema = shop_schema();
        for c in &mut schema.columns {
            if c.id == "c-orders-id" {
                c.is_auto_increment = true;
            }
        }
        let sql = render(&SchemaGraph::new(&schema));
        assert!(sql.contains("`id` INT NOT NULL AUTO_INCREMENT"));
    }
}
