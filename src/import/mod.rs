//! Import codec: accept an external JSON export, validate its shape, then
//! merge its tables/columns/relationships into a destination project under
//! entirely new identities.
//!
//! Missing cross-references are recoverable: the offending row is skipped
//! and a warning recorded, on the theory that a partial import beats an
//! all-or-nothing failure for hand-edited or foreign-tool JSON.

use chrono::Utc;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::{EntityKind, StoreError};
use crate::model::{Column, Position, ReferentialAction, Relationship, Table};
use crate::store::{ImportBatch, SchemaStore};

/// Horizontal gap between the rightmost existing table and the imported
/// grid, and the cell pitch of the grid itself.
const IMPORT_OFFSET_X: f64 = 350.0;
const GRID_SPACING_X: f64 = 320.0;
const GRID_SPACING_Y: f64 = 260.0;
const DEFAULT_START: Position = Position { x: 80.0, y: 80.0 };

#[derive(Debug, Default)]
pub struct ImportReport {
    pub tables_created: usize,
    pub columns_created: usize,
    pub relationships_created: usize,
    pub warnings: Vec<String>,
}

/// Loosely-typed intermediate records. Inbound JSON may use camelCase or
/// snake_case keys; normalization into canonical entities happens after
/// decoding, keeping the compatibility shim out of the core logic.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchemaExport {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, alias = "exported_at")]
    pub exported_at: Option<i64>,
    pub tables: Vec<RawTable>,
    pub columns: Vec<RawColumn>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTable {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawColumn {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "table_id")]
    pub table_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "data_type")]
    pub data_type: Option<String>,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default, alias = "is_primary_key")]
    pub is_primary_key: bool,
    #[serde(default, alias = "is_unique")]
    pub is_unique: bool,
    #[serde(default, alias = "is_auto_increment")]
    pub is_auto_increment: bool,
    #[serde(default, alias = "default_value")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "order_index")]
    pub order_index: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRelationship {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "source_table_id")]
    pub source_table_id: Option<String>,
    #[serde(default, alias = "source_column_id")]
    pub source_column_id: Option<String>,
    #[serde(default, alias = "target_table_id")]
    pub target_table_id: Option<String>,
    #[serde(default, alias = "target_column_id")]
    pub target_column_id: Option<String>,
    #[serde(default, alias = "on_delete")]
    pub on_delete: Option<String>,
    #[serde(default, alias = "on_update")]
    pub on_update: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Shape validation with operator-readable messages. `relationships` is
/// optional for older exports; `version`/`exportedAt` default rather than
/// reject.
pub fn validate_schema_export(value: &Value) -> Result<(), StoreError> {
    let Some(object) = value.as_object() else {
        return Err(StoreError::validation("schema export must be a JSON object"));
    };
    if !object.get("project").map(Value::is_object).unwrap_or(false) {
        return Err(StoreError::validation("schema export requires a project object"));
    }
    if !object.get("tables").map(Value::is_array).unwrap_or(false) {
        return Err(StoreError::validation("schema export requires a tables array"));
    }
    if !object.get("columns").map(Value::is_array).unwrap_or(false) {
        return Err(StoreError::validation("schema export requires a columns array"));
    }
    if let Some(relationships) = object.get("relationships") {
        if !relationships.is_array() {
            return Err(StoreError::validation("relationships must be an array"));
        }
    }
    Ok(())
}

/// BOM-strip, trim, parse, validate, decode. Parser internals never leak;
/// malformed input surfaces the generic invalid-JSON failure.
pub fn parse_schema_export(text: &str) -> Result<RawSchemaExport, StoreError> {
    let text = text.trim_start_matches('\u{feff}').trim();
    let value: Value = serde_json::from_str(text).map_err(|_| StoreError::InvalidJson)?;
    validate_schema_export(&value)?;
    serde_json::from_value(value).map_err(|e| StoreError::validation(e.to_string()))
}

/// Grid width for `n` imported tables.
fn grid_columns(n: usize) -> usize {
    match n {
        0 | 1 => 1,
        2..=4 => 2,
        5..=9 => 3,
        _ => 4,
    }
}

/// Anchor the imported grid to the right of the existing diagram, top
/// aligned with its highest table, so imports never overlap what is
/// already there.
fn grid_origin(existing: &[Table]) -> Position {
    if existing.is_empty() {
        return DEFAULT_START;
    }
    let max_x = existing
        .iter()
        .map(|t| t.position.x)
        .fold(f64::NEG_INFINITY, f64::max);
    let min_y = existing
        .iter()
        .map(|t| t.position.y)
        .fold(f64::INFINITY, f64::min);
    Position::new(max_x + IMPORT_OFFSET_X, min_y)
}

/// Remap a decoded export into an [`ImportBatch`] for `project_id`. Pure;
/// all skip decisions and layout happen here.
pub fn build_import_batch(
    raw: &RawSchemaExport,
    project_id: &str,
    existing_tables: &[Table],
) -> (ImportBatch, ImportReport) {
    let mut batch = ImportBatch::default();
    let mut report = ImportReport::default();
    let now = Utc::now();

    // Old table id → new id; insertion order drives grid placement.
    let mut table_ids: IndexMap<String, String> = IndexMap::new();
    let mut column_ids: IndexMap<String, String> = IndexMap::new();

    let importable: Vec<&RawTable> = raw
        .tables
        .iter()
        .filter(|t| {
            let ok = t.id.is_some() && t.name.is_some();
            if !ok {
                report
                    .warnings
                    .push("skipped table without id or name".to_string());
            }
            ok
        })
        .collect();

    let origin = grid_origin(existing_tables);
    let columns_per_row = grid_columns(importable.len());

    for (index, raw_table) in importable.iter().enumerate() {
        let new_id = Uuid::new_v4().to_string();
        table_ids.insert(raw_table.id.clone().unwrap_or_default(), new_id.clone());
        let position = Position::new(
            origin.x + (index % columns_per_row) as f64 * GRID_SPACING_X,
            origin.y + (index / columns_per_row) as f64 * GRID_SPACING_Y,
        );
        batch.tables.push(Table {
            id: new_id,
            project_id: project_id.to_string(),
            name: raw_table.name.clone().unwrap_or_default(),
            description: raw_table.description.clone(),
            position,
            color: raw_table.color.clone(),
            created_at: now,
            updated_at: now,
        });
    }
    report.tables_created = batch.tables.len();

    let mut per_table_counts: IndexMap<String, i32> = IndexMap::new();
    for raw_column in &raw.columns {
        let Some(table_id) = raw_column
            .table_id
            .as_ref()
            .and_then(|old| table_ids.get(old))
        else {
            let detail = raw_column.name.as_deref().unwrap_or("<unnamed>");
            report.warnings.push(format!(
                "skipped column {}: table reference does not resolve",
                detail
            ));
            continue;
        };
        let Some(name) = raw_column.name.clone() else {
            report.warnings.push("skipped column without name".to_string());
            continue;
        };
        let data_type = match raw_column.data_type.as_deref().map(str::parse) {
            Some(Ok(data_type)) => data_type,
            _ => {
                report.warnings.push(format!(
                    "skipped column {}: unknown data type {:?}",
                    name, raw_column.data_type
                ));
                continue;
            }
        };

        let slot = per_table_counts.entry(table_id.clone()).or_insert(0);
        let order_index = raw_column.order_index.unwrap_or(*slot);
        *slot += 1;

        let new_id = Uuid::new_v4().to_string();
        if let Some(old_id) = &raw_column.id {
            column_ids.insert(old_id.clone(), new_id.clone());
        }
        let is_primary_key = raw_column.is_primary_key;
        batch.columns.push(Column {
            id: new_id,
            table_id: table_id.clone(),
            name,
            data_type,
            length: raw_column.length,
            precision: raw_column.precision,
            scale: raw_column.scale,
            nullable: !is_primary_key && raw_column.nullable,
            is_primary_key,
            is_unique: raw_column.is_unique,
            is_auto_increment: raw_column.is_auto_increment,
            default_value: raw_column.default_value.clone(),
            description: raw_column.description.clone(),
            order_index,
            created_at: now,
            updated_at: now,
        });
    }
    report.columns_created = batch.columns.len();

    for raw_relationship in &raw.relationships {
        let resolved = (
            raw_relationship
                .source_table_id
                .as_ref()
                .and_then(|old| table_ids.get(old)),
            raw_relationship
                .source_column_id
                .as_ref()
                .and_then(|old| column_ids.get(old)),
            raw_relationship
                .target_table_id
                .as_ref()
                .and_then(|old| table_ids.get(old)),
            raw_relationship
                .target_column_id
                .as_ref()
                .and_then(|old| column_ids.get(old)),
        );
        let (Some(source_table), Some(source_column), Some(target_table), Some(target_column)) =
            resolved
        else {
            let detail = raw_relationship.name.as_deref().unwrap_or("<unnamed>");
            report.warnings.push(format!(
                "skipped relationship {}: reference does not resolve",
                detail
            ));
            continue;
        };
        // Imported foreign keys tolerate cosmetic type drift between
        // source tools, so no data type matching here.
        batch.relationships.push(Relationship {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: raw_relationship.name.clone(),
            source_table_id: source_table.clone(),
            source_column_id: source_column.clone(),
            target_table_id: target_table.clone(),
            target_column_id: target_column.clone(),
            on_delete: parse_action(raw_relationship.on_delete.as_deref()),
            on_update: parse_action(raw_relationship.on_update.as_deref()),
            created_at: now,
            updated_at: now,
        });
    }
    report.relationships_created = batch.relationships.len();

    (batch, report)
}

fn parse_action(value: Option<&str>) -> ReferentialAction {
    value
        .and_then(|v| v.parse().ok())
        .unwrap_or(ReferentialAction::NoAction)
}

/// Parse and merge an external JSON export into `project_id`. The batch is
/// applied through the store, so the remote realization does it as a single
/// read-modify-write.
pub async fn import_into_project(
    store: &dyn SchemaStore,
    project_id: &str,
    text: &str,
) -> Result<ImportReport, StoreError> {
    let raw = parse_schema_export(text)?;
    if store.get_project(project_id).await?.is_none() {
        return Err(StoreError::not_found(EntityKind::Project, project_id));
    }
    let existing = store.get_tables_by_project(project_id).await?;
    let (batch, report) = build_import_batch(&raw, project_id, &existing);
    for warning in &report.warnings {
        warn!("{}", warning);
    }
    store.apply_import(project_id, batch).await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_export() -> Value {
        json!({
            "project": {"id": "p-old", "name": "source"},
            "tables": [
                {"id": "t1", "name": "users"},
                {"id": "t2", "name": "orders"}
            ],
            "columns": [
                {"id": "c1", "tableId": "t1", "name": "id", "dataType": "INT",
                 "isPrimaryKey": true, "nullable": true},
                {"id": "c2", "table_id": "t2", "name": "user_id", "data_type": "INT"},
                {"id": "c3", "tableId": "ghost", "name": "lost", "dataType": "TEXT"}
            ],
            "relationships": [
                {"sourceTableId": "t2", "sourceColumnId": "c2",
                 "targetTableId": "t1", "targetColumnId": "c1", "onDelete": "CASCADE"},
                {"sourceTableId": "t2", "sourceColumnId": "c3",
                 "targetTableId": "t1", "targetColumnId": "c1"}
            ]
        })
    }

    #[test]
    fn rejects_non_object_input() {
        assert!(matches!(
            validate_schema_export(&json!([1, 2, 3])),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            validate_schema_export(&json!({"project": {}, "tables": []})),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn malformed_json_is_generic() {
        let err = parse_schema_export("{not json").unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON format");
    }

    #[test]
    fn bom_and_whitespace_are_stripped() {
        let text = format!("\u{feff}  {}  ", minimal_export());
        assert!(parse_schema_export(&text).is_ok());
    }

    #[test]
    fn remap_skips_dangling_rows_with_warnings() {
        let raw = parse_schema_export(&minimal_export().to_string()).unwrap();
        let (batch, report) = build_import_batch(&raw, "p-new", &[]);

        assert_eq!(report.tables_created, 2);
        // The column referencing a ghost table is skipped.
        assert_eq!(report.columns_created, 2);
        // The relationship through the skipped column is skipped too.
        assert_eq!(report.relationships_created, 1);
        assert_eq!(report.warnings.len(), 2);

        // Every id is fresh and internally consistent.
        for column in &batch.columns {
            assert!(batch.tables.iter().any(|t| t.id == column.table_id));
        }
        let fk = &batch.relationships[0];
        assert!(batch.columns.iter().any(|c| c.id == fk.source_column_id));
        assert!(batch.columns.iter().any(|c| c.id == fk.target_column_id));
        assert_eq!(fk.on_delete, ReferentialAction::Cascade);
        assert_eq!(fk.on_update, ReferentialAction::NoAction);
    }

    #[test]
    fn primary_key_import_coerces_nullable() {
        let raw = parse_schema_export(&minimal_export().to_string()).unwrap();
        let (batch, _) = build_import_batch(&raw, "p-new", &[]);
        let pk = batch.columns.iter().find(|c| c.name == "id").unwrap();
        assert!(pk.is_primary_key);
        assert!(!pk.nullable);
    }

    #[test]
    fn grid_width_follows_table_count() {
        assert_eq!(grid_columns(0), 1);
        assert_eq!(grid_columns(1), 1);
        assert_eq!(grid_columns(4), 2);
        assert_eq!(grid_columns(9), 3);
        assert_eq!(grid_columns(10), 4);
    }

    #[test]
    fn imported_grid_lands_right_of_existing_tables() {
        use chrono::Utc;
        let existing = vec![Table {
            id: "t-existing".into(),
            project_id: "p-new".into(),
            name: "existing".into(),
            description: None,
            position: Position::new(500.0, 120.0),
            color: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }];
        let raw = parse_schema_export(&minimal_export().to_string()).unwrap();
        let (batch, _) = build_import_batch(&raw, "p-new", &existing);
        for table in &batch.tables {
            assert!(table.position.x >= 500.0 + IMPORT_OFFSET_X);
            assert!(table.position.y >= 120.0);
        }
        assert_eq!(batch.tables[0].position.y, 120.0);
    }

    #[test]
    fn relationships_key_may_be_absent() {
        let mut value = minimal_export();
        value.as_object_mut().unwrap().remove("relationships");
        let raw = parse_schema_export(&value.to_string()).unwrap();
        assert!(raw.relationships.is_empty());
    }
}
