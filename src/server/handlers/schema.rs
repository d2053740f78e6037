use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::model::SchemaExport;
use crate::server::app::AppState;
use crate::store::SchemaStore;

use super::ApiError;

/// Full snapshot of one project. 404 only when the project itself is
/// missing; an empty graph returns an empty document.
pub async fn get_schema(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SchemaExport>, ApiError> {
    let schema = state.store.export_project(&id).await?;
    Ok(Json(schema))
}

/// Whole-document write: the request body becomes the project's new graph.
/// Client-side temporary ids (anything that is not a UUID) are replaced
/// with fresh UUIDs before persisting, references included.
pub async fn put_schema(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut schema): Json<SchemaExport>,
) -> Result<Json<Value>, ApiError> {
    remap_temp_ids(&mut schema);
    state.store.replace_schema(&id, &schema).await?;
    Ok(Json(json!({ "ok": true })))
}

fn is_temp_id(id: &str) -> bool {
    Uuid::parse_str(id).is_err()
}

fn remap_temp_ids(schema: &mut SchemaExport) {
    let mut table_ids: HashMap<String, String> = HashMap::new();
    let mut column_ids: HashMap<String, String> = HashMap::new();

    for table in &mut schema.tables {
        if is_temp_id(&table.id) {
            let fresh = Uuid::new_v4().to_string();
            table_ids.insert(std::mem::replace(&mut table.id, fresh.clone()), fresh);
        }
    }
    for column in &mut schema.columns {
        if is_temp_id(&column.id) {
            let fresh = Uuid::new_v4().to_string();
            column_ids.insert(std::mem::replace(&mut column.id, fresh.clone()), fresh);
        }
        if let Some(fresh) = table_ids.get(&column.table_id) {
            column.table_id = fresh.clone();
        }
    }
    for relationship in &mut schema.relationships {
        if is_temp_id(&relationship.id) {
            relationship.id = Uuid::new_v4().to_string();
        }
        if let Some(fresh) = table_ids.get(&relationship.source_table_id) {
            relationship.source_table_id = fresh.clone();
        }
        if let Some(fresh) = table_ids.get(&relationship.target_table_id) {
            relationship.target_table_id = fresh.clone();
        }
        if let Some(fresh) = column_ids.get(&relationship.source_column_id) {
            relationship.source_column_id = fresh.clone();
        }
        if let Some(fresh) = column_ids.get(&relationship.target_column_id) {
            relationship.target_column_id = fresh.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::model::*;

    use super::*;

    fn snapshot_with_temp_ids() -> SchemaExport {
        let now = Utc::now();
        let project = Project {
            id: "p1".into(),
            name: "demo".into(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        let table = Table {
            id: "temp-1".into(),
            project_id: "p1".into(),
            name: "users".into(),
            description: None,
            position: Position::default(),
            color: None,
            created_at: now,
            updated_at: now,
        };
        let column = Column {
            id: "temp-2".into(),
            table_id: "temp-1".into(),
            name: "id".into(),
            data_type: DataType::Int,
            length: None,
            precision: None,
            scale: None,
            nullable: false,
            is_primary_key: true,
            is_unique: false,
            is_auto_increment: false,
            default_value: None,
            description: None,
            order_index: 0,
            created_at: now,
            updated_at: now,
        };
        let mut schema = SchemaExport::empty(project);
        schema.tables.push(table);
        schema.columns.push(column);
        schema
    }

    #[test]
    fn temp_ids_are_replaced_and_references_follow() {
        let mut schema = snapshot_with_temp_ids();
        remap_temp_ids(&mut schema);

        let table = &schema.tables[0];
        let column = &schema.columns[0];
        assert!(Uuid::parse_str(&table.id).is_ok());
        assert!(Uuid::parse_str(&column.id).is_ok());
        assert_eq!(column.table_id, table.id);
    }

    #[test]
    fn real_uuids_are_left_alone() {
        let mut schema = snapshot_with_temp_ids();
        let stable = Uuid::new_v4().to_string();
        schema.tables[0].id = stable.clone();
        schema.columns[0].table_id = stable.clone();
        remap_temp_ids(&mut schema);
        assert_eq!(schema.tables[0].id, stable);
        assert_eq!(schema.columns[0].table_id, stable);
    }
}
