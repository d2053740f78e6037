//! Remote store realization against the REST backend. Every mutation is a
//! read-modify-write of the owning project's whole schema document: fetch
//! the current `SchemaExport`, mutate it in memory, write it back. Not safe
//! against concurrent writers to the same project; last writer wins at
//! document granularity.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EntityKind, StoreError};
use crate::model::{
    Column, Position, Project, Relationship, SchemaExport, Table, Viewport,
};

use super::{
    coalesce_moves, ColumnUpdate, ImportBatch, NewColumn, NewRelationship, NewTable,
    ProjectUpdate, RelationshipUpdate, SchemaStore, TableMove, TableUpdate,
};

/// Id → parent lookup cache (table→project, column→table,
/// relationship→project). Populated on every successful schema read, pruned
/// on delete. A miss falls back to scanning all projects' schemas.
#[derive(Default)]
pub struct ParentCache {
    table_project: RwLock<HashMap<String, String>>,
    column_table: RwLock<HashMap<String, String>>,
    relationship_project: RwLock<HashMap<String, String>>,
}

impl ParentCache {
    fn record_schema(&self, schema: &SchemaExport) {
        let mut tables = self.table_project.write().unwrap();
        for table in &schema.tables {
            tables.insert(table.id.clone(), schema.project.id.clone());
        }
        drop(tables);

        let mut columns = self.column_table.write().unwrap();
        for column in &schema.columns {
            columns.insert(column.id.clone(), column.table_id.clone());
        }
        drop(columns);

        let mut relationships = self.relationship_project.write().unwrap();
        for relationship in &schema.relationships {
            relationships.insert(relationship.id.clone(), schema.project.id.clone());
        }
    }

    fn table_project(&self, table_id: &str) -> Option<String> {
        self.table_project.read().unwrap().get(table_id).cloned()
    }

    fn column_table(&self, column_id: &str) -> Option<String> {
        self.column_table.read().unwrap().get(column_id).cloned()
    }

    fn relationship_project(&self, relationship_id: &str) -> Option<String> {
        self.relationship_project
            .read()
            .unwrap()
            .get(relationship_id)
            .cloned()
    }

    /// Drop entries made stale by a rewritten schema document: anything that
    /// pointed into this project but is no longer present.
    fn prune_to_schema(&self, schema: &SchemaExport) {
        let project_id = schema.project.id.as_str();
        let live_tables: HashSet<&str> = schema.tables.iter().map(|t| t.id.as_str()).collect();
        let live_columns: HashSet<&str> = schema.columns.iter().map(|c| c.id.as_str()).collect();
        let live_relationships: HashSet<&str> =
            schema.relationships.iter().map(|r| r.id.as_str()).collect();

        self.table_project.write().unwrap().retain(|id, project| {
            project.as_str() != project_id || live_tables.contains(id.as_str())
        });
        self.column_table.write().unwrap().retain(|id, table| {
            !live_tables.contains(table.as_str()) || live_columns.contains(id.as_str())
        });
        self.relationship_project
            .write()
            .unwrap()
            .retain(|id, project| {
                project.as_str() != project_id || live_relationships.contains(id.as_str())
            });
    }

    fn prune_project(&self, project_id: &str, last_schema: Option<&SchemaExport>) {
        self.table_project
            .write()
            .unwrap()
            .retain(|_, project| project.as_str() != project_id);
        self.relationship_project
            .write()
            .unwrap()
            .retain(|_, project| project.as_str() != project_id);
        if let Some(schema) = last_schema {
            let dead: HashSet<&str> = schema.columns.iter().map(|c| c.id.as_str()).collect();
            self.column_table
                .write()
                .unwrap()
                .retain(|id, _| !dead.contains(id.as_str()));
        }
    }
}

pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    cache: ParentCache,
    // Layout state stays session-local in remote mode; it is not part of
    // the schema document.
    viewports: RwLock<HashMap<String, Viewport>>,
}

impl RemoteStore {
    pub fn new(base_url: String) -> Self {
        Self::with_cache(base_url, ParentCache::default())
    }

    pub fn with_cache(base_url: String, cache: ParentCache) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            viewports: RwLock::new(HashMap::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    async fn error_from_response(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("error")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            Err(_) => None,
        };
        StoreError::Http {
            status,
            message: message.unwrap_or_else(|| format!("Request failed with status {}", status)),
        }
    }

    async fn fetch_schema(&self, project_id: &str) -> Result<Option<SchemaExport>, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("/projects/{}/schema", project_id)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        let schema: SchemaExport = response.json().await?;
        self.cache.record_schema(&schema);
        Ok(Some(schema))
    }

    async fn require_schema(&self, project_id: &str) -> Result<SchemaExport, StoreError> {
        self.fetch_schema(project_id)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Project, project_id))
    }

    async fn put_schema(&self, schema: &SchemaExport) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.url(&format!("/projects/{}/schema", schema.project.id)))
            .json(schema)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        self.cache.record_schema(schema);
        self.cache.prune_to_schema(schema);
        Ok(())
    }

    /// The read-modify-write cycle every mutation goes through.
    async fn with_schema<R>(
        &self,
        project_id: &str,
        mutate: impl FnOnce(&mut SchemaExport) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut schema = self.require_schema(project_id).await?;
        let result = mutate(&mut schema)?;
        let now = Utc::now();
        schema.project.updated_at = now;
        schema.exported_at = now.timestamp_millis();
        self.put_schema(&schema).await?;
        Ok(result)
    }

    /// Resolve a table's owning project, scanning every project's schema on
    /// a cache miss (cold start).
    async fn schema_containing_table(&self, table_id: &str) -> Result<SchemaExport, StoreError> {
        if let Some(project_id) = self.cache.table_project(table_id) {
            if let Some(schema) = self.fetch_schema(&project_id).await? {
                if schema.tables.iter().any(|t| t.id == table_id) {
                    return Ok(schema);
                }
            }
        }
        debug!(table_id, "parent cache miss, scanning all projects");
        for project in self.get_projects().await? {
            if let Some(schema) = self.fetch_schema(&project.id).await? {
                if schema.tables.iter().any(|t| t.id == table_id) {
                    return Ok(schema);
                }
            }
        }
        Err(StoreError::not_found(EntityKind::Table, table_id))
    }

    async fn schema_containing_column(&self, column_id: &str) -> Result<SchemaExport, StoreError> {
        if let Some(table_id) = self.cache.column_table(column_id) {
            if let Ok(schema) = self.schema_containing_table(&table_id).await {
                if schema.columns.iter().any(|c| c.id == column_id) {
                    return Ok(schema);
                }
            }
        }
        debug!(column_id, "parent cache miss, scanning all projects");
        for project in self.get_projects().await? {
            if let Some(schema) = self.fetch_schema(&project.id).await? {
                if schema.columns.iter().any(|c| c.id == column_id) {
                    return Ok(schema);
                }
            }
        }
        Err(StoreError::not_found(EntityKind::Column, column_id))
    }

    async fn schema_containing_relationship(
        &self,
        relationship_id: &str,
    ) -> Result<Option<SchemaExport>, StoreError> {
        if let Some(project_id) = self.cache.relationship_project(relationship_id) {
            if let Some(schema) = self.fetch_schema(&project_id).await? {
                if schema.relationships.iter().any(|r| r.id == relationship_id) {
                    return Ok(Some(schema));
                }
            }
        }
        for project in self.get_projects().await? {
            if let Some(schema) = self.fetch_schema(&project.id).await? {
                if schema.relationships.iter().any(|r| r.id == relationship_id) {
                    return Ok(Some(schema));
                }
            }
        }
        Ok(None)
    }
}

/// Remove a table plus its columns and every relationship touching the table
/// or one of its columns from a schema document.
fn remove_table_from_schema(schema: &mut SchemaExport, table_id: &str) {
    let column_ids: Vec<String> = schema
        .columns
        .iter()
        .filter(|c| c.table_id == table_id)
        .map(|c| c.id.clone())
        .collect();
    schema.relationships.retain(|r| {
        r.source_table_id != table_id
            && r.target_table_id != table_id
            && !column_ids.contains(&r.source_column_id)
            && !column_ids.contains(&r.target_column_id)
    });
    schema.columns.retain(|c| c.table_id != table_id);
    schema.tables.retain(|t| t.id != table_id);
}

#[async_trait]
impl SchemaStore for RemoteStore {
    async fn create_project(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Project, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::validation("project name must not be blank"));
        }
        let response = self
            .client
            .post(self.url("/projects"))
            .json(&serde_json::json!({ "name": name, "description": description }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn get_projects(&self) -> Result<Vec<Project>, StoreError> {
        let response = self.client.get(self.url("/projects")).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("/projects/{}", id)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(Some(response.json().await?))
    }

    async fn update_project(
        &self,
        id: &str,
        update: ProjectUpdate,
    ) -> Result<Project, StoreError> {
        let mut body = serde_json::Map::new();
        if let Some(name) = update.name {
            body.insert("name".into(), serde_json::Value::String(name));
        }
        if let Some(description) = update.description {
            body.insert(
                "description".into(),
                description
                    .map(serde_json::Value::String)
                    .unwrap_or(serde_json::Value::Null),
            );
        }
        let response = self
            .client
            .patch(self.url(&format!("/projects/{}", id)))
            .json(&serde_json::Value::Object(body))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(EntityKind::Project, id));
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn delete_project(&self, id: &str) -> Result<(), StoreError> {
        let last_schema = self.fetch_schema(id).await?;
        let response = self
            .client
            .delete(self.url(&format!("/projects/{}", id)))
            .send()
            .await?;
        // Double delete is a no-op, matching the local realization.
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(Self::error_from_response(response).await);
        }
        self.cache.prune_project(id, last_schema.as_ref());
        self.viewports.write().unwrap().remove(id);
        Ok(())
    }

    async fn create_table(&self, new: NewTable) -> Result<Table, StoreError> {
        let now = Utc::now();
        let table = Table {
            id: Self::new_id(),
            project_id: new.project_id.clone(),
            name: new.name,
            description: new.description,
            position: new.position,
            color: new.color,
            created_at: now,
            updated_at: now,
        };
        let created = table.clone();
        self.with_schema(&new.project_id, move |schema| {
            schema.tables.push(table);
            Ok(())
        })
        .await?;
        Ok(created)
    }

    async fn get_table(&self, id: &str) -> Result<Option<Table>, StoreError> {
        match self.schema_containing_table(id).await {
            Ok(schema) => Ok(schema.tables.into_iter().find(|t| t.id == id)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_tables_by_project(&self, project_id: &str) -> Result<Vec<Table>, StoreError> {
        Ok(self
            .fetch_schema(project_id)
            .await?
            .map(|s| s.tables)
            .unwrap_or_default())
    }

    async fn update_table(&self, id: &str, update: TableUpdate) -> Result<Table, StoreError> {
        let schema = self.schema_containing_table(id).await?;
        let project_id = schema.project.id.clone();
        let id = id.to_string();
        self.with_schema(&project_id, move |schema| {
            let table = schema
                .tables
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Table, id.as_str()))?;
            if let Some(name) = update.name {
                table.name = name;
            }
            if let Some(description) = update.description {
                table.description = description;
            }
            if let Some(position) = update.position {
                table.position = position;
            }
            if let Some(color) = update.color {
                table.color = color;
            }
            table.updated_at = Utc::now();
            Ok(table.clone())
        })
        .await
    }

    async fn move_tables(&self, moves: &[TableMove]) -> Result<(), StoreError> {
        let coalesced = coalesce_moves(moves);

        // Group by owning project so continuous drags cost one write per
        // affected project, not one per table.
        let mut by_project: indexmap::IndexMap<String, Vec<(String, Position)>> =
            indexmap::IndexMap::new();
        for (id, position) in coalesced {
            let schema = self.schema_containing_table(&id).await?;
            by_project
                .entry(schema.project.id)
                .or_default()
                .push((id, position));
        }

        for (project_id, batch) in by_project {
            self.with_schema(&project_id, move |schema| {
                for (id, position) in batch {
                    if let Some(table) = schema.tables.iter_mut().find(|t| t.id == id) {
                        table.position = position;
                        table.updated_at = Utc::now();
                    }
                }
                Ok(())
            })
            .await?;
        }
        Ok(())
    }

    async fn delete_table(&self, id: &str) -> Result<(), StoreError> {
        let schema = match self.schema_containing_table(id).await {
            Ok(schema) => schema,
            Err(StoreError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };
        let project_id = schema.project.id.clone();
        let id = id.to_string();
        self.with_schema(&project_id, move |schema| {
            remove_table_from_schema(schema, &id);
            Ok(())
        })
        .await
    }

    async fn duplicate_table(
        &self,
        id: &str,
        position: Option<Position>,
    ) -> Result<Table, StoreError> {
        let schema = self.schema_containing_table(id).await?;
        let project_id = schema.project.id.clone();
        let id = id.to_string();
        self.with_schema(&project_id, move |schema| {
            let source = schema
                .tables
                .iter()
                .find(|t| t.id == id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Table, id.as_str()))?
                .clone();
            let now = Utc::now();
            let copy = Table {
                id: Self::new_id(),
                project_id: source.project_id.clone(),
                name: format!("{}_copy", source.name),
                description: source.description.clone(),
                position: position.unwrap_or_else(|| source.position.offset(50.0, 50.0)),
                color: source.color.clone(),
                created_at: now,
                updated_at: now,
            };
            let cloned_columns: Vec<Column> = schema
                .columns
                .iter()
                .filter(|c| c.table_id == id)
                .map(|c| {
                    let mut cloned = c.clone();
                    cloned.id = Self::new_id();
                    cloned.table_id = copy.id.clone();
                    cloned.created_at = now;
                    cloned.updated_at = now;
                    cloned
                })
                .collect();
            schema.tables.push(copy.clone());
            schema.columns.extend(cloned_columns);
            Ok(copy)
        })
        .await
    }

    async fn is_table_name_unique(
        &self,
        project_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let tables = self.get_tables_by_project(project_id).await?;
        Ok(tables
            .iter()
            .all(|t| t.name != name || Some(t.id.as_str()) == exclude_id))
    }

    async fn create_column(&self, new: NewColumn) -> Result<Column, StoreError> {
        let schema = self.schema_containing_table(&new.table_id).await?;
        let project_id = schema.project.id.clone();
        self.with_schema(&project_id, move |schema| {
            if !schema.tables.iter().any(|t| t.id == new.table_id) {
                return Err(StoreError::not_found(EntityKind::Table, new.table_id));
            }
            let order_index = new.order_index.unwrap_or_else(|| {
                schema
                    .columns
                    .iter()
                    .filter(|c| c.table_id == new.table_id)
                    .map(|c| c.order_index + 1)
                    .max()
                    .unwrap_or(0)
            });
            let now = Utc::now();
            let column = Column {
                id: Self::new_id(),
                table_id: new.table_id,
                name: new.name,
                data_type: new.data_type,
                length: new.length,
                precision: new.precision,
                scale: new.scale,
                nullable: !new.is_primary_key && new.nullable,
                is_primary_key: new.is_primary_key,
                is_unique: new.is_unique,
                is_auto_increment: new.is_auto_increment,
                default_value: new.default_value,
                description: new.description,
                order_index,
                created_at: now,
                updated_at: now,
            };
            schema.columns.push(column.clone());
            Ok(column)
        })
        .await
    }

    async fn get_column(&self, id: &str) -> Result<Option<Column>, StoreError> {
        match self.schema_containing_column(id).await {
            Ok(schema) => Ok(schema.columns.into_iter().find(|c| c.id == id)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_columns_by_table(&self, table_id: &str) -> Result<Vec<Column>, StoreError> {
        let schema = match self.schema_containing_table(table_id).await {
            Ok(schema) => schema,
            Err(StoreError::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut columns: Vec<Column> = schema
            .columns
            .into_iter()
            .filter(|c| c.table_id == table_id)
            .collect();
        columns.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(columns)
    }

    async fn update_column(&self, id: &str, update: ColumnUpdate) -> Result<Column, StoreError> {
        let schema = self.schema_containing_column(id).await?;
        let project_id = schema.project.id.clone();
        let id = id.to_string();
        self.with_schema(&project_id, move |schema| {
            let column = schema
                .columns
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Column, id.as_str()))?;
            if let Some(name) = update.name {
                column.name = name;
            }
            if let Some(data_type) = update.data_type {
                column.data_type = data_type;
            }
            if let Some(length) = update.length {
                column.length = length;
            }
            if let Some(precision) = update.precision {
                column.precision = precision;
            }
            if let Some(scale) = update.scale {
                column.scale = scale;
            }
            if let Some(nullable) = update.nullable {
                column.nullable = nullable;
            }
            if let Some(is_primary_key) = update.is_primary_key {
                column.is_primary_key = is_primary_key;
            }
            if let Some(is_unique) = update.is_unique {
                column.is_unique = is_unique;
            }
            if let Some(is_auto_increment) = update.is_auto_increment {
                column.is_auto_increment = is_auto_increment;
            }
            if let Some(default_value) = update.default_value {
                column.default_value = default_value;
            }
            if let Some(description) = update.description {
                column.description = description;
            }
            if column.is_primary_key {
                column.nullable = false;
            }
            column.updated_at = Utc::now();
            Ok(column.clone())
        })
        .await
    }

    async fn delete_column(&self, id: &str) -> Result<(), StoreError> {
        let schema = match self.schema_containing_column(id).await {
            Ok(schema) => schema,
            Err(StoreError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };
        let project_id = schema.project.id.clone();
        let id = id.to_string();
        self.with_schema(&project_id, move |schema| {
            schema
                .relationships
                .retain(|r| r.source_column_id != id && r.target_column_id != id);
            schema.columns.retain(|c| c.id != id);
            Ok(())
        })
        .await
    }

    async fn reorder_columns(
        &self,
        table_id: &str,
        ordered_ids: &[String],
    ) -> Result<(), StoreError> {
        let schema = self.schema_containing_table(table_id).await?;
        let project_id = schema.project.id.clone();
        let table_id = table_id.to_string();
        let ordered_ids = ordered_ids.to_vec();
        self.with_schema(&project_id, move |schema| {
            for (index, id) in ordered_ids.iter().enumerate() {
                if let Some(column) = schema
                    .columns
                    .iter_mut()
                    .find(|c| &c.id == id && c.table_id == table_id)
                {
                    column.order_index = index as i32;
                    column.updated_at = Utc::now();
                }
            }
            Ok(())
        })
        .await
    }

    async fn is_column_name_unique(
        &self,
        table_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let columns = self.get_columns_by_table(table_id).await?;
        Ok(columns
            .iter()
            .all(|c| c.name != name || Some(c.id.as_str()) == exclude_id))
    }

    async fn create_relationship(
        &self,
        new: NewRelationship,
        validate_data_types: bool,
    ) -> Result<Relationship, StoreError> {
        let schema = self.schema_containing_column(&new.source_column_id).await?;
        let target_schema = self.schema_containing_column(&new.target_column_id).await?;
        if target_schema.project.id != schema.project.id {
            return Err(StoreError::validation(
                "relationship columns must belong to the same project",
            ));
        }
        let project_id = schema.project.id.clone();
        self.with_schema(&project_id, move |schema| {
            let source = schema
                .columns
                .iter()
                .find(|c| c.id == new.source_column_id)
                .ok_or_else(|| {
                    StoreError::not_found(EntityKind::Column, new.source_column_id.as_str())
                })?
                .clone();
            let target = schema
                .columns
                .iter()
                .find(|c| c.id == new.target_column_id)
                .ok_or_else(|| {
                    StoreError::not_found(EntityKind::Column, new.target_column_id.as_str())
                })?
                .clone();
            if validate_data_types && source.data_type != target.data_type {
                return Err(StoreError::validation(format!(
                    "data type mismatch: {} is {} but {} is {}",
                    source.name, source.data_type, target.name, target.data_type
                )));
            }
            let now = Utc::now();
            let relationship = Relationship {
                id: Self::new_id(),
                project_id: schema.project.id.clone(),
                name: new.name,
                source_table_id: source.table_id,
                source_column_id: new.source_column_id,
                target_table_id: target.table_id,
                target_column_id: new.target_column_id,
                on_delete: new.on_delete,
                on_update: new.on_update,
                created_at: now,
                updated_at: now,
            };
            schema.relationships.push(relationship.clone());
            Ok(relationship)
        })
        .await
    }

    async fn get_relationship(&self, id: &str) -> Result<Option<Relationship>, StoreError> {
        Ok(self
            .schema_containing_relationship(id)
            .await?
            .and_then(|s| s.relationships.into_iter().find(|r| r.id == id)))
    }

    async fn get_relationships_by_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<Relationship>, StoreError> {
        Ok(self
            .fetch_schema(project_id)
            .await?
            .map(|s| s.relationships)
            .unwrap_or_default())
    }

    async fn update_relationship(
        &self,
        id: &str,
        update: RelationshipUpdate,
    ) -> Result<Relationship, StoreError> {
        let schema = self
            .schema_containing_relationship(id)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Relationship, id))?;
        let project_id = schema.project.id.clone();
        let id = id.to_string();
        self.with_schema(&project_id, move |schema| {
            let relationship = schema
                .relationships
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| StoreError::not_found(EntityKind::Relationship, id.as_str()))?;
            if let Some(name) = update.name {
                relationship.name = name;
            }
            if let Some(on_delete) = update.on_delete {
                relationship.on_delete = on_delete;
            }
            if let Some(on_update) = update.on_update {
                relationship.on_update = on_update;
            }
            relationship.updated_at = Utc::now();
            Ok(relationship.clone())
        })
        .await
    }

    async fn delete_relationship(&self, id: &str) -> Result<(), StoreError> {
        let Some(schema) = self.schema_containing_relationship(id).await? else {
            return Ok(());
        };
        let project_id = schema.project.id.clone();
        let id = id.to_string();
        self.with_schema(&project_id, move |schema| {
            schema.relationships.retain(|r| r.id != id);
            Ok(())
        })
        .await
    }

    async fn get_viewport(&self, project_id: &str) -> Result<Option<Viewport>, StoreError> {
        Ok(self.viewports.read().unwrap().get(project_id).cloned())
    }

    async fn save_viewport(
        &self,
        project_id: &str,
        viewport: Viewport,
    ) -> Result<(), StoreError> {
        self.viewports
            .write()
            .unwrap()
            .insert(project_id.to_string(), viewport);
        Ok(())
    }

    async fn export_project(&self, project_id: &str) -> Result<SchemaExport, StoreError> {
        let mut schema = self.require_schema(project_id).await?;
        schema.exported_at = Utc::now().timestamp_millis();
        schema
            .columns
            .sort_by(|a, b| a.order_index.cmp(&b.order_index).then(a.created_at.cmp(&b.created_at)));
        Ok(schema)
    }

    async fn apply_import(
        &self,
        project_id: &str,
        batch: ImportBatch,
    ) -> Result<(), StoreError> {
        // One read-modify-write of the whole destination document; the
        // project row itself is upserted by the schema PUT.
        if self.get_project(project_id).await?.is_none() {
            return Err(StoreError::not_found(EntityKind::Project, project_id));
        }
        let imported = batch.tables.len();
        self.with_schema(project_id, move |schema| {
            schema.tables.extend(batch.tables);
            schema.columns.extend(batch.columns);
            schema.relationships.extend(batch.relationships);
            Ok(())
        })
        .await?;
        debug!(project_id, tables = imported, "merged imported schema");
        Ok(())
    }
}
