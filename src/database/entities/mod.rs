pub mod projects;
pub mod relationships;
pub mod schema_columns;
pub mod schema_tables;
pub mod viewports;
