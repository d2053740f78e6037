//! DDL and JSON generation from a project's schema snapshot.
//!
//! Each target has its own module; `generate_sql` adds the header comment,
//! dispatches to the dialect renderer, and runs the cosmetic formatting
//! pass. Tables render in creation order with no dependency sort: a table
//! may reference a table created after it, which deferred-constraint
//! semantics permit.

pub mod to_json;
pub mod to_mysql;
pub mod to_postgres;
pub mod to_sqlite;

use chrono::Utc;
use sqlformat::{FormatOptions, Indent, QueryParams};

use crate::model::{Column, Relationship, SchemaExport, SqlDialect, Table};

/// Borrowed view over one project's graph with the lookups the dialect
/// renderers share.
pub struct SchemaGraph<'a> {
    pub tables: &'a [Table],
    pub columns: &'a [Column],
    pub relationships: &'a [Relationship],
}

impl<'a> SchemaGraph<'a> {
    pub fn new(schema: &'a SchemaExport) -> Self {
        Self {
            tables: &schema.tables,
            columns: &schema.columns,
            relationships: &schema.relationships,
        }
    }

    /// Columns of one table in DDL order.
    pub fn columns_of(&self, table_id: &str) -> Vec<&'a Column> {
        let mut columns: Vec<&Column> = self
            .columns
            .iter()
            .filter(|c| c.table_id == table_id)
            .collect();
        columns.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then(a.created_at.cmp(&b.created_at))
        });
        columns
    }

    pub fn primary_keys_of(&self, table_id: &str) -> Vec<&'a Column> {
        self.columns_of(table_id)
            .into_iter()
            .filter(|c| c.is_primary_key)
            .collect()
    }

    pub fn table_name(&self, table_id: &str) -> Option<&'a str> {
        self.tables
            .iter()
            .find(|t| t.id == table_id)
            .map(|t| t.name.as_str())
    }

    pub fn column_name(&self, column_id: &str) -> Option<&'a str> {
        self.columns
            .iter()
            .find(|c| c.id == column_id)
            .map(|c| c.name.as_str())
    }

    /// User-supplied constraint name, or a deterministic fallback carrying
    /// the source column so two links between the same table pair stay
    /// distinct.
    pub fn constraint_name(&self, relationship: &Relationship) -> String {
        if let Some(name) = &relationship.name {
            return name.clone();
        }
        let source = self
            .table_name(&relationship.source_table_id)
            .unwrap_or("unknown");
        let target = self
            .table_name(&relationship.target_table_id)
            .unwrap_or("unknown");
        let source_column = self
            .column_name(&relationship.source_column_id)
            .unwrap_or("unknown");
        format!("fk_{}_{}_{}", source, target, source_column)
    }

    /// Every relationship whose four references resolve in this graph.
    /// Dangling rows are skipped; the generator never fails on them.
    pub fn resolvable_relationships(&self) -> Vec<&'a Relationship> {
        self.relationships
            .iter()
            .filter(|r| {
                self.table_name(&r.source_table_id).is_some()
                    && self.table_name(&r.target_table_id).is_some()
                    && self.column_name(&r.source_column_id).is_some()
                    && self.column_name(&r.target_column_id).is_some()
            })
            .collect()
    }
}

/// Length / precision modifier for a column type. `(length)` for CHAR and
/// VARCHAR when set; `(precision,scale)` for DECIMAL and NUMERIC only when
/// both are present — a lone precision or scale is dropped silently.
pub(crate) fn type_suffix(column: &Column) -> String {
    if column.data_type.takes_length() {
        if let Some(length) = column.length {
            return format!("({})", length);
        }
    }
    if column.data_type.takes_precision_scale() {
        if let (Some(precision), Some(scale)) = (column.precision, column.scale) {
            return format!("({},{})", precision, scale);
        }
    }
    String::new()
}

/// Render the full DDL script for one dialect.
pub fn generate_sql(schema: &SchemaExport, dialect: SqlDialect) -> String {
    let graph = SchemaGraph::new(schema);
    let body = match dialect {
        SqlDialect::Postgresql => to_postgres::render(&graph),
        SqlDialect::Mysql => to_mysql::render(&graph),
        SqlDialect::Sqlite => to_sqlite::render(&graph),
    };
    let header = header_comment(schema, dialect);
    format_sql(format!("{}\n{}", header, body))
}

fn header_comment(schema: &SchemaExport, dialect: SqlDialect) -> String {
    format!(
        "-- {} schema for {}\n-- Generated at {}\n-- Tables: {}, Relationships: {}\n",
        dialect.display_name(),
        schema.project.name,
        Utc::now().to_rfc3339(),
        schema.tables.len(),
        schema.relationships.len()
    )
}

/// Cosmetic reflow/casing pass. Never load-bearing: anything suspicious from
/// the formatter and the raw text is returned instead.
fn format_sql(sql: String) -> String {
    let options = FormatOptions {
        indent: Indent::Spaces(2),
        uppercase: Some(true),
        lines_between_queries: 2,
        ..Default::default()
    };
    let formatted = sqlformat::format(&sql, &QueryParams::None, &options);
    if formatted.trim().is_empty() {
        sql
    } else {
        formatted
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::model::*;

    pub fn project(name: &str) -> Project {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Project {
            id: format!("project-{}", name),
            name: name.to_string(),
            description: None,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn table(id: &str, project_id: &str, name: &str) -> Table {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Table {
            id: id.to_string(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            description: None,
            position: Position::default(),
            color: None,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn column(id: &str, table_id: &str, name: &str, data_type: DataType, order: i32) -> Column {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Column {
            id: id.to_string(),
            table_id: table_id.to_string(),
            name: name.to_string(),
            data_type,
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            is_primary_key: false,
            is_unique: false,
            is_auto_increment: false,
            default_value: None,
            description: None,
            order_index: order,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn relationship(
        id: &str,
        project_id: &str,
        source: (&str, &str),
        target: (&str, &str),
        on_delete: ReferentialAction,
    ) -> Relationship {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Relationship {
            id: id.to_string(),
            project_id: project_id.to_string(),
            name: None,
            source_table_id: source.0.to_string(),
            source_column_id: source.1.to_string(),
            target_table_id: target.0.to_string(),
            target_column_id: target.1.to_string(),
            on_delete,
            on_update: ReferentialAction::NoAction,
            created_at: at,
            updated_at: at,
        }
    }

    /// Shop: users(id PK serial, email varchar(255) unique not null),
    /// orders(id PK serial, user_id int) with user_id → users.id CASCADE.
    pub fn shop_schema() -> SchemaExport {
        let project = project("Shop");
        let users = table("t-users", &project.id, "users");
        let orders = table("t-orders", &project.id, "orders");

        let mut users_id = column("c-users-id", "t-users", "id", DataType::Int, 0);
        users_id.is_primary_key = true;
        users_id.nullable = false;

        let mut email = column("c-users-email", "t-users", "email", DataType::Varchar, 1);
        email.length = Some(255);
        email.nullable = false;
        email.is_unique = true;

        let mut orders_id = column("c-orders-id", "t-orders", "id", DataType::Int, 0);
        orders_id.is_primary_key = true;
        orders_id.nullable = false;

        let user_id = column("c-orders-user-id", "t-orders", "user_id", DataType::Int, 1);

        let fk = relationship(
            "r-orders-users",
            &project.id,
            ("t-orders", "c-orders-user-id"),
            ("t-users", "c-users-id"),
            ReferentialAction::Cascade,
        );

        SchemaExport {
            version: EXPORT_VERSION.to_string(),
            exported_at: 0,
            project,
            tables: vec![users, orders],
            columns: vec![users_id, email, orders_id, user_id],
            relationships: vec![fk],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::shop_schema;
    use super::*;

    #[test]
    fn header_carries_counts_and_dialect() {
        let schema = shop_schema();
        let sql = generate_sql(&schema, SqlDialect::Postgresql);
        assert!(sql.contains("PostgreSQL"));
        assert!(sql.contains("Tables: 2, Relationships: 1"));
    }

    #[test]
    fn constraint_name_falls_back_to_source_column() {
        let schema = shop_schema();
        let graph = SchemaGraph::new(&schema);
        assert_eq!(
            graph.constraint_name(&schema.relationships[0]),
            "fk_orders_users_user_id"
        );
    }

    #[test]
    fn user_supplied_constraint_name_wins() {
        let mut schema = shop_schema();
        schema.relationships[0].name = Some("fk_custom".to_string());
        let graph = SchemaGraph::new(&schema);
        assert_eq!(graph.constraint_name(&schema.relationships[0]), "fk_custom");
    }
}
