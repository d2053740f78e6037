//! Entity model for the schema designer graph.
//!
//! Project → Table → Column → Relationship, plus the versioned
//! `SchemaExport` envelope used for storage-at-rest and file exchange.
//! Wire format is camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Envelope version written by export; unknown versions are accepted on
/// import and defaulted to this value.
pub const EXPORT_VERSION: &str = "1.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canvas placement hint. Not meaningful to SQL generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub table_id: String,
    pub name: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub is_auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source_table_id: String,
    pub source_column_id: String,
    pub target_table_id: String,
    pub target_column_id: String,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-project pan/zoom state, persisted apart from the entity graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub updated_at: DateTime<Utc>,
}

/// Complete denormalized snapshot of one project's graph. Unit of
/// storage-at-rest for the remote backend and the import/export format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaExport {
    pub version: String,
    /// Milliseconds since the Unix epoch.
    pub exported_at: i64,
    pub project: Project,
    pub tables: Vec<Table>,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl SchemaExport {
    /// An empty snapshot for a project with no tables yet.
    pub fn empty(project: Project) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now().timestamp_millis(),
            project,
            tables: Vec::new(),
            columns: Vec::new(),
            relationships: Vec::new(),
        }
    }
}

/// Abstract column data types, mapped per dialect at generation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    // Numeric
    SmallInt,
    Int,
    BigInt,
    Decimal,
    Numeric,
    Float,
    Real,
    Double,
    Serial,
    // String
    Char,
    Varchar,
    Text,
    // Date/time
    Date,
    Time,
    Timestamp,
    TimestampTz,
    // Boolean
    Boolean,
    // Binary
    Binary,
    VarBinary,
    Blob,
    // JSON
    Json,
    Jsonb,
    // UUID
    Uuid,
}

impl DataType {
    pub const ALL: [DataType; 23] = [
        DataType::SmallInt,
        DataType::Int,
        DataType::BigInt,
        DataType::Decimal,
        DataType::Numeric,
        DataType::Float,
        DataType::Real,
        DataType::Double,
        DataType::Serial,
        DataType::Char,
        DataType::Varchar,
        DataType::Text,
        DataType::Date,
        DataType::Time,
        DataType::Timestamp,
        DataType::TimestampTz,
        DataType::Boolean,
        DataType::Binary,
        DataType::VarBinary,
        DataType::Blob,
        DataType::Json,
        DataType::Jsonb,
        DataType::Uuid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::SmallInt => "SMALLINT",
            DataType::Int => "INT",
            DataType::BigInt => "BIGINT",
            DataType::Decimal => "DECIMAL",
            DataType::Numeric => "NUMERIC",
            DataType::Float => "FLOAT",
            DataType::Real => "REAL",
            DataType::Double => "DOUBLE",
            DataType::Serial => "SERIAL",
            DataType::Char => "CHAR",
            DataType::Varchar => "VARCHAR",
            DataType::Text => "TEXT",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::TimestampTz => "TIMESTAMPTZ",
            DataType::Boolean => "BOOLEAN",
            DataType::Binary => "BINARY",
            DataType::VarBinary => "VARBINARY",
            DataType::Blob => "BLOB",
            DataType::Json => "JSON",
            DataType::Jsonb => "JSONB",
            DataType::Uuid => "UUID",
        }
    }

    /// Whether `(length)` applies to this type in generated DDL.
    pub fn takes_length(&self) -> bool {
        matches!(self, DataType::Char | DataType::Varchar)
    }

    /// Whether `(precision,scale)` applies to this type in generated DDL.
    pub fn takes_precision_scale(&self) -> bool {
        matches!(self, DataType::Decimal | DataType::Numeric)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        DataType::ALL
            .iter()
            .find(|t| t.as_str() == upper)
            .copied()
            .ok_or_else(|| format!("unknown data type: {}", s))
    }
}

/// Behavior applied to dependent rows on delete/update of a referenced row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL", alias = "SET_NULL")]
    SetNull,
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[default]
    #[serde(rename = "NO ACTION", alias = "NO_ACTION")]
    NoAction,
    #[serde(rename = "SET DEFAULT", alias = "SET_DEFAULT")]
    SetDefault,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for ReferentialAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('_', " ").as_str() {
            "CASCADE" => Ok(ReferentialAction::Cascade),
            "SET NULL" => Ok(ReferentialAction::SetNull),
            "RESTRICT" => Ok(ReferentialAction::Restrict),
            "NO ACTION" => Ok(ReferentialAction::NoAction),
            "SET DEFAULT" => Ok(ReferentialAction::SetDefault),
            _ => Err(format!("unknown referential action: {}", s)),
        }
    }
}

/// Target dialect for DDL generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[serde(alias = "postgres")]
    Postgresql,
    Mysql,
    Sqlite,
}

impl SqlDialect {
    /// Human-readable name used in the generated header comment.
    pub fn display_name(&self) -> &'static str {
        match self {
            SqlDialect::Postgresql => "PostgreSQL",
            SqlDialect::Mysql => "MySQL",
            SqlDialect::Sqlite => "SQLite",
        }
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(SqlDialect::Postgresql),
            "mysql" => Ok(SqlDialect::Mysql),
            "sqlite" => Ok(SqlDialect::Sqlite),
            _ => Err(format!("unknown SQL dialect: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_round_trips_through_str() {
        for dt in DataType::ALL {
            assert_eq!(dt.as_str().parse::<DataType>().unwrap(), dt);
        }
    }

    #[test]
    fn data_type_count_is_stable() {
        assert_eq!(DataType::ALL.len(), 23);
    }

    #[test]
    fn referential_action_accepts_both_spellings() {
        assert_eq!(
            "SET NULL".parse::<ReferentialAction>().unwrap(),
            ReferentialAction::SetNull
        );
        assert_eq!(
            "set_null".parse::<ReferentialAction>().unwrap(),
            ReferentialAction::SetNull
        );
        let json: ReferentialAction = serde_json::from_str("\"SET_DEFAULT\"").unwrap();
        assert_eq!(json, ReferentialAction::SetDefault);
    }

    #[test]
    fn schema_export_defaults_relationships() {
        let json = serde_json::json!({
            "version": "1.0",
            "exportedAt": 0,
            "project": {
                "id": "p1", "name": "demo",
                "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00Z"
            },
            "tables": [],
            "columns": []
        });
        let export: SchemaExport = serde_json::from_value(json).unwrap();
        assert!(export.relationships.is_empty());
    }
}
