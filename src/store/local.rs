//! Embedded store realization backed by SQLite through sea-orm, one table
//! per entity kind. Cascades are explicit O(n) sweeps over the owning
//! project's collections; graphs are expected to stay in the tens to low
//! hundreds of rows.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::database::entities::{
    projects, relationships, schema_columns, schema_tables, viewports,
    projects::Entity as Projects, relationships::Entity as Relationships,
    schema_columns::Entity as SchemaColumns, schema_tables::Entity as SchemaTables,
    viewports::Entity as Viewports,
};
use crate::error::{EntityKind, StoreError};
use crate::model::{
    Column, Position, Project, Relationship, SchemaExport, Table, Viewport, EXPORT_VERSION,
};

use super::{
    coalesce_moves, ColumnUpdate, ImportBatch, NewColumn, NewRelationship, NewTable,
    ProjectUpdate, RelationshipUpdate, SchemaStore, TableMove, TableUpdate,
};

pub struct LocalStore {
    db: DatabaseConnection,
}

impl LocalStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    async fn require_project(&self, id: &str) -> Result<projects::Model, StoreError> {
        Projects::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Project, id))
    }

    async fn require_table(&self, id: &str) -> Result<schema_tables::Model, StoreError> {
        SchemaTables::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Table, id))
    }

    async fn require_column(&self, id: &str) -> Result<schema_columns::Model, StoreError> {
        SchemaColumns::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Column, id))
    }

    /// Refresh a project's `updated_at` so freshness queries reflect nested
    /// edits.
    async fn touch_project(&self, id: &str) -> Result<(), StoreError> {
        if let Some(project) = Projects::find_by_id(id).one(&self.db).await? {
            let mut active: projects::ActiveModel = project.into();
            active.updated_at = Set(Utc::now());
            active.update(&self.db).await?;
        }
        Ok(())
    }

    /// Touch a table and propagate upward to its project.
    async fn touch_table(&self, id: &str) -> Result<(), StoreError> {
        if let Some(table) = SchemaTables::find_by_id(id).one(&self.db).await? {
            let project_id = table.project_id.clone();
            let mut active: schema_tables::ActiveModel = table.into();
            active.updated_at = Set(Utc::now());
            active.update(&self.db).await?;
            self.touch_project(&project_id).await?;
        }
        Ok(())
    }

    async fn next_order_index(&self, table_id: &str) -> Result<i32, StoreError> {
        let columns = SchemaColumns::find()
            .filter(schema_columns::Column::TableId.eq(table_id))
            .all(&self.db)
            .await?;
        Ok(columns.iter().map(|c| c.order_index + 1).max().unwrap_or(0))
    }

    async fn columns_of_table(
        &self,
        table_id: &str,
    ) -> Result<Vec<schema_columns::Model>, StoreError> {
        Ok(SchemaColumns::find()
            .filter(schema_columns::Column::TableId.eq(table_id))
            .order_by_asc(schema_columns::Column::OrderIndex)
            .order_by_asc(schema_columns::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    fn column_active_model(id: String, new: &NewColumn, order_index: i32) -> schema_columns::ActiveModel {
        let now = Utc::now();
        // Primary key columns are never nullable, whatever the caller said.
        let nullable = if new.is_primary_key { false } else { new.nullable };
        schema_columns::ActiveModel {
            id: Set(id),
            table_id: Set(new.table_id.clone()),
            name: Set(new.name.clone()),
            data_type: Set(new.data_type.as_str().to_string()),
            length: Set(new.length.map(|v| v as i32)),
            precision: Set(new.precision.map(|v| v as i32)),
            scale: Set(new.scale.map(|v| v as i32)),
            nullable: Set(nullable),
            is_primary_key: Set(new.is_primary_key),
            is_unique: Set(new.is_unique),
            is_auto_increment: Set(new.is_auto_increment),
            default_value: Set(new.default_value.clone()),
            description: Set(new.description.clone()),
            order_index: Set(order_index),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    /// Replace a project's entire graph with the supplied document: upsert
    /// the project row, wipe its tables, columns, and relationships, then
    /// reinsert from the snapshot. The REST backend's whole-document PUT
    /// lands here.
    pub async fn replace_schema(
        &self,
        project_id: &str,
        schema: &SchemaExport,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        match Projects::find_by_id(project_id).one(&self.db).await? {
            Some(existing) => {
                let mut active: projects::ActiveModel = existing.into();
                active.name = Set(schema.project.name.clone());
                active.description = Set(schema.project.description.clone());
                active.updated_at = Set(now);
                active.update(&self.db).await?;
            }
            None => {
                let model = projects::ActiveModel {
                    id: Set(project_id.to_string()),
                    name: Set(schema.project.name.clone()),
                    description: Set(schema.project.description.clone()),
                    created_at: Set(schema.project.created_at),
                    updated_at: Set(now),
                };
                model.insert(&self.db).await?;
            }
        }

        let table_ids: Vec<String> = SchemaTables::find()
            .filter(schema_tables::Column::ProjectId.eq(project_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        Relationships::delete_many()
            .filter(relationships::Column::ProjectId.eq(project_id))
            .exec(&self.db)
            .await?;
        if !table_ids.is_empty() {
            SchemaColumns::delete_many()
                .filter(schema_columns::Column::TableId.is_in(table_ids))
                .exec(&self.db)
                .await?;
        }
        SchemaTables::delete_many()
            .filter(schema_tables::Column::ProjectId.eq(project_id))
            .exec(&self.db)
            .await?;

        let batch = ImportBatch {
            tables: schema.tables.clone(),
            columns: schema.columns.clone(),
            relationships: schema.relationships.clone(),
        };
        self.apply_import(project_id, batch).await?;
        debug!(project_id, tables = schema.tables.len(), "replaced project schema");
        Ok(())
    }
}

fn project_from_model(m: projects::Model) -> Project {
    Project {
        id: m.id,
        name: m.name,
        description: m.description,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn table_from_model(m: schema_tables::Model) -> Table {
    Table {
        id: m.id,
        project_id: m.project_id,
        name: m.name,
        description: m.description,
        position: Position::new(m.position_x, m.position_y),
        color: m.color,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn column_from_model(m: schema_columns::Model) -> Result<Column, StoreError> {
    let data_type = m
        .data_type
        .parse()
        .map_err(|e: String| StoreError::validation(e))?;
    Ok(Column {
        id: m.id,
        table_id: m.table_id,
        name: m.name,
        data_type,
        length: m.length.map(|v| v as u32),
        precision: m.precision.map(|v| v as u32),
        scale: m.scale.map(|v| v as u32),
        nullable: m.nullable,
        is_primary_key: m.is_primary_key,
        is_unique: m.is_unique,
        is_auto_increment: m.is_auto_increment,
        default_value: m.default_value,
        description: m.description,
        order_index: m.order_index,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn relationship_from_model(m: relationships::Model) -> Result<Relationship, StoreError> {
    let on_delete = m
        .on_delete
        .parse()
        .map_err(|e: String| StoreError::validation(e))?;
    let on_update = m
        .on_update
        .parse()
        .map_err(|e: String| StoreError::validation(e))?;
    Ok(Relationship {
        id: m.id,
        project_id: m.project_id,
        name: m.name,
        source_table_id: m.source_table_id,
        source_column_id: m.source_column_id,
        target_table_id: m.target_table_id,
        target_column_id: m.target_column_id,
        on_delete,
        on_update,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

#[async_trait]
impl SchemaStore for LocalStore {
    async fn create_project(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Project, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::validation("project name must not be blank"));
        }
        let now = Utc::now();
        let project = projects::ActiveModel {
            id: Set(Self::new_id()),
            name: Set(name.to_string()),
            description: Set(description),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(project_from_model(project.insert(&self.db).await?))
    }

    async fn get_projects(&self) -> Result<Vec<Project>, StoreError> {
        let models = Projects::find()
            .order_by_desc(projects::Column::UpdatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(project_from_model).collect())
    }

    async fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        Ok(Projects::find_by_id(id)
            .one(&self.db)
            .await?
            .map(project_from_model))
    }

    async fn update_project(
        &self,
        id: &str,
        update: ProjectUpdate,
    ) -> Result<Project, StoreError> {
        let project = self.require_project(id).await?;
        let mut active: projects::ActiveModel = project.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }
        active.updated_at = Set(Utc::now());
        Ok(project_from_model(active.update(&self.db).await?))
    }

    async fn delete_project(&self, id: &str) -> Result<(), StoreError> {
        if Projects::find_by_id(id).one(&self.db).await?.is_none() {
            return Ok(());
        }
        let table_ids: Vec<String> = SchemaTables::find()
            .filter(schema_tables::Column::ProjectId.eq(id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        Relationships::delete_many()
            .filter(relationships::Column::ProjectId.eq(id))
            .exec(&self.db)
            .await?;
        if !table_ids.is_empty() {
            SchemaColumns::delete_many()
                .filter(schema_columns::Column::TableId.is_in(table_ids))
                .exec(&self.db)
                .await?;
        }
        SchemaTables::delete_many()
            .filter(schema_tables::Column::ProjectId.eq(id))
            .exec(&self.db)
            .await?;
        Viewports::delete_many()
            .filter(viewports::Column::ProjectId.eq(id))
            .exec(&self.db)
            .await?;
        Projects::delete_by_id(id).exec(&self.db).await?;
        debug!(project_id = id, "deleted project and cascaded children");
        Ok(())
    }

    async fn create_table(&self, new: NewTable) -> Result<Table, StoreError> {
        self.require_project(&new.project_id).await?;
        let now = Utc::now();
        let table = schema_tables::ActiveModel {
            id: Set(Self::new_id()),
            project_id: Set(new.project_id.clone()),
            name: Set(new.name),
            description: Set(new.description),
            position_x: Set(new.position.x),
            position_y: Set(new.position.y),
            color: Set(new.color),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let inserted = table.insert(&self.db).await?;
        self.touch_project(&new.project_id).await?;
        Ok(table_from_model(inserted))
    }

    async fn get_table(&self, id: &str) -> Result<Option<Table>, StoreError> {
        Ok(SchemaTables::find_by_id(id)
            .one(&self.db)
            .await?
            .map(table_from_model))
    }

    async fn get_tables_by_project(&self, project_id: &str) -> Result<Vec<Table>, StoreError> {
        let models = SchemaTables::find()
            .filter(schema_tables::Column::ProjectId.eq(project_id))
            .order_by_asc(schema_tables::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(table_from_model).collect())
    }

    async fn update_table(&self, id: &str, update: TableUpdate) -> Result<Table, StoreError> {
        let table = self.require_table(id).await?;
        let project_id = table.project_id.clone();
        let mut active: schema_tables::ActiveModel = table.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }
        if let Some(position) = update.position {
            active.position_x = Set(position.x);
            active.position_y = Set(position.y);
        }
        if let Some(color) = update.color {
            active.color = Set(color);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;
        self.touch_project(&project_id).await?;
        Ok(table_from_model(updated))
    }

    async fn move_tables(&self, moves: &[TableMove]) -> Result<(), StoreError> {
        let coalesced = coalesce_moves(moves);
        let mut touched_projects: Vec<String> = Vec::new();
        for (id, position) in &coalesced {
            let Some(table) = SchemaTables::find_by_id(id.as_str()).one(&self.db).await? else {
                return Err(StoreError::not_found(EntityKind::Table, id.as_str()));
            };
            let project_id = table.project_id.clone();
            let mut active: schema_tables::ActiveModel = table.into();
            active.position_x = Set(position.x);
            active.position_y = Set(position.y);
            active.updated_at = Set(Utc::now());
            active.update(&self.db).await?;
            if !touched_projects.contains(&project_id) {
                touched_projects.push(project_id);
            }
        }
        // One freshness touch per affected project, not per move.
        for project_id in touched_projects {
            self.touch_project(&project_id).await?;
        }
        Ok(())
    }

    async fn delete_table(&self, id: &str) -> Result<(), StoreError> {
        let Some(table) = SchemaTables::find_by_id(id).one(&self.db).await? else {
            return Ok(());
        };
        let project_id = table.project_id.clone();
        let column_ids: Vec<String> = self
            .columns_of_table(id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        // Sweep the project's relationships for anything touching this table
        // or its columns.
        let project_relationships = Relationships::find()
            .filter(relationships::Column::ProjectId.eq(&project_id))
            .all(&self.db)
            .await?;
        for rel in project_relationships {
            let touches = rel.source_table_id == id
                || rel.target_table_id == id
                || column_ids.contains(&rel.source_column_id)
                || column_ids.contains(&rel.target_column_id);
            if touches {
                Relationships::delete_by_id(rel.id.clone()).exec(&self.db).await?;
            }
        }

        SchemaColumns::delete_many()
            .filter(schema_columns::Column::TableId.eq(id))
            .exec(&self.db)
            .await?;
        SchemaTables::delete_by_id(id).exec(&self.db).await?;
        self.touch_project(&project_id).await?;
        Ok(())
    }

    async fn duplicate_table(
        &self,
        id: &str,
        position: Option<Position>,
    ) -> Result<Table, StoreError> {
        let source = self.require_table(id).await?;
        let now = Utc::now();
        let position = position
            .unwrap_or_else(|| Position::new(source.position_x, source.position_y).offset(50.0, 50.0));

        let copy = schema_tables::ActiveModel {
            id: Set(Self::new_id()),
            project_id: Set(source.project_id.clone()),
            name: Set(format!("{}_copy", source.name)),
            description: Set(source.description.clone()),
            position_x: Set(position.x),
            position_y: Set(position.y),
            color: Set(source.color.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let copy = copy.insert(&self.db).await?;

        for column in self.columns_of_table(id).await? {
            let cloned = schema_columns::ActiveModel {
                id: Set(Self::new_id()),
                table_id: Set(copy.id.clone()),
                name: Set(column.name),
                data_type: Set(column.data_type),
                length: Set(column.length),
                precision: Set(column.precision),
                scale: Set(column.scale),
                nullable: Set(column.nullable),
                is_primary_key: Set(column.is_primary_key),
                is_unique: Set(column.is_unique),
                is_auto_increment: Set(column.is_auto_increment),
                default_value: Set(column.default_value),
                description: Set(column.description),
                order_index: Set(column.order_index),
                created_at: Set(now),
                updated_at: Set(now),
            };
            cloned.insert(&self.db).await?;
        }

        self.touch_project(&source.project_id).await?;
        Ok(table_from_model(copy))
    }

    async fn is_table_name_unique(
        &self,
        project_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let tables = SchemaTables::find()
            .filter(schema_tables::Column::ProjectId.eq(project_id))
            .filter(schema_tables::Column::Name.eq(name))
            .all(&self.db)
            .await?;
        Ok(tables.iter().all(|t| Some(t.id.as_str()) == exclude_id))
    }

    async fn create_column(&self, new: NewColumn) -> Result<Column, StoreError> {
        let table = self.require_table(&new.table_id).await?;
        let order_index = match new.order_index {
            Some(index) => index,
            None => self.next_order_index(&new.table_id).await?,
        };
        let column = Self::column_active_model(Self::new_id(), &new, order_index);
        let inserted = column.insert(&self.db).await?;
        self.touch_table(&table.id).await?;
        column_from_model(inserted)
    }

    async fn get_column(&self, id: &str) -> Result<Option<Column>, StoreError> {
        match SchemaColumns::find_by_id(id).one(&self.db).await? {
            Some(model) => Ok(Some(column_from_model(model)?)),
            None => Ok(None),
        }
    }

    async fn get_columns_by_table(&self, table_id: &str) -> Result<Vec<Column>, StoreError> {
        self.columns_of_table(table_id)
            .await?
            .into_iter()
            .map(column_from_model)
            .collect()
    }

    async fn update_column(&self, id: &str, update: ColumnUpdate) -> Result<Column, StoreError> {
        let column = self.require_column(id).await?;
        let table_id = column.table_id.clone();

        let is_primary_key = update.is_primary_key.unwrap_or(column.is_primary_key);
        let mut nullable = update.nullable.unwrap_or(column.nullable);
        if is_primary_key {
            nullable = false;
        }

        let mut active: schema_columns::ActiveModel = column.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(data_type) = update.data_type {
            active.data_type = Set(data_type.as_str().to_string());
        }
        if let Some(length) = update.length {
            active.length = Set(length.map(|v| v as i32));
        }
        if let Some(precision) = update.precision {
            active.precision = Set(precision.map(|v| v as i32));
        }
        if let Some(scale) = update.scale {
            active.scale = Set(scale.map(|v| v as i32));
        }
        if let Some(default_value) = update.default_value {
            active.default_value = Set(default_value);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }
        if let Some(is_unique) = update.is_unique {
            active.is_unique = Set(is_unique);
        }
        if let Some(is_auto_increment) = update.is_auto_increment {
            active.is_auto_increment = Set(is_auto_increment);
        }
        active.is_primary_key = Set(is_primary_key);
        active.nullable = Set(nullable);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        self.touch_table(&table_id).await?;
        column_from_model(updated)
    }

    async fn delete_column(&self, id: &str) -> Result<(), StoreError> {
        let Some(column) = SchemaColumns::find_by_id(id).one(&self.db).await? else {
            return Ok(());
        };
        let table_id = column.table_id.clone();

        Relationships::delete_many()
            .filter(
                relationships::Column::SourceColumnId
                    .eq(id)
                    .or(relationships::Column::TargetColumnId.eq(id)),
            )
            .exec(&self.db)
            .await?;
        SchemaColumns::delete_by_id(id).exec(&self.db).await?;
        self.touch_table(&table_id).await?;
        Ok(())
    }

    async fn reorder_columns(
        &self,
        table_id: &str,
        ordered_ids: &[String],
    ) -> Result<(), StoreError> {
        self.require_table(table_id).await?;
        let columns = self.columns_of_table(table_id).await?;
        for (index, id) in ordered_ids.iter().enumerate() {
            let Some(column) = columns.iter().find(|c| &c.id == id) else {
                // Ids from other tables (or stale ids) are ignored; absent
                // columns keep their prior index.
                continue;
            };
            let mut active: schema_columns::ActiveModel = column.clone().into();
            active.order_index = Set(index as i32);
            active.updated_at = Set(Utc::now());
            active.update(&self.db).await?;
        }
        self.touch_table(table_id).await?;
        Ok(())
    }

    async fn is_column_name_unique(
        &self,
        table_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let columns = SchemaColumns::find()
            .filter(schema_columns::Column::TableId.eq(table_id))
            .filter(schema_columns::Column::Name.eq(name))
            .all(&self.db)
            .await?;
        Ok(columns.iter().all(|c| Some(c.id.as_str()) == exclude_id))
    }

    async fn create_relationship(
        &self,
        new: NewRelationship,
        validate_data_types: bool,
    ) -> Result<Relationship, StoreError> {
        let source_column = self.require_column(&new.source_column_id).await?;
        let target_column = self.require_column(&new.target_column_id).await?;
        let source_table = self.require_table(&source_column.table_id).await?;
        let target_table = self.require_table(&target_column.table_id).await?;

        if source_table.project_id != target_table.project_id {
            return Err(StoreError::validation(
                "relationship columns must belong to the same project",
            ));
        }
        if validate_data_types && source_column.data_type != target_column.data_type {
            return Err(StoreError::validation(format!(
                "data type mismatch: {} is {} but {} is {}",
                source_column.name,
                source_column.data_type,
                target_column.name,
                target_column.data_type
            )));
        }

        let now = Utc::now();
        let relationship = relationships::ActiveModel {
            id: Set(Self::new_id()),
            project_id: Set(source_table.project_id.clone()),
            name: Set(new.name),
            source_table_id: Set(source_table.id),
            source_column_id: Set(new.source_column_id),
            target_table_id: Set(target_table.id),
            target_column_id: Set(new.target_column_id),
            on_delete: Set(new.on_delete.as_sql().to_string()),
            on_update: Set(new.on_update.as_sql().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let inserted = relationship.insert(&self.db).await?;
        self.touch_project(&source_table.project_id).await?;
        relationship_from_model(inserted)
    }

    async fn get_relationship(&self, id: &str) -> Result<Option<Relationship>, StoreError> {
        match Relationships::find_by_id(id).one(&self.db).await? {
            Some(model) => Ok(Some(relationship_from_model(model)?)),
            None => Ok(None),
        }
    }

    async fn get_relationships_by_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<Relationship>, StoreError> {
        let models = Relationships::find()
            .filter(relationships::Column::ProjectId.eq(project_id))
            .order_by_asc(relationships::Column::CreatedAt)
            .all(&self.db)
            .await?;
        models.into_iter().map(relationship_from_model).collect()
    }

    async fn update_relationship(
        &self,
        id: &str,
        update: RelationshipUpdate,
    ) -> Result<Relationship, StoreError> {
        let relationship = Relationships::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::not_found(EntityKind::Relationship, id))?;
        let project_id = relationship.project_id.clone();
        let mut active: relationships::ActiveModel = relationship.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(on_delete) = update.on_delete {
            active.on_delete = Set(on_delete.as_sql().to_string());
        }
        if let Some(on_update) = update.on_update {
            active.on_update = Set(on_update.as_sql().to_string());
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;
        self.touch_project(&project_id).await?;
        relationship_from_model(updated)
    }

    async fn delete_relationship(&self, id: &str) -> Result<(), StoreError> {
        let Some(relationship) = Relationships::find_by_id(id).one(&self.db).await? else {
            return Ok(());
        };
        let project_id = relationship.project_id.clone();
        Relationships::delete_by_id(id).exec(&self.db).await?;
        self.touch_project(&project_id).await?;
        Ok(())
    }

    async fn get_viewport(&self, project_id: &str) -> Result<Option<Viewport>, StoreError> {
        Ok(Viewports::find_by_id(project_id)
            .one(&self.db)
            .await?
            .map(|m| Viewport {
                zoom: m.zoom,
                offset_x: m.offset_x,
                offset_y: m.offset_y,
                updated_at: m.updated_at,
            }))
    }

    async fn save_viewport(
        &self,
        project_id: &str,
        viewport: Viewport,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        match Viewports::find_by_id(project_id).one(&self.db).await? {
            Some(existing) => {
                let mut active: viewports::ActiveModel = existing.into();
                active.zoom = Set(viewport.zoom);
                active.offset_x = Set(viewport.offset_x);
                active.offset_y = Set(viewport.offset_y);
                active.updated_at = Set(now);
                active.update(&self.db).await?;
            }
            None => {
                self.require_project(project_id).await?;
                let model = viewports::ActiveModel {
                    project_id: Set(project_id.to_string()),
                    zoom: Set(viewport.zoom),
                    offset_x: Set(viewport.offset_x),
                    offset_y: Set(viewport.offset_y),
                    updated_at: Set(now),
                };
                model.insert(&self.db).await?;
            }
        }
        Ok(())
    }

    async fn export_project(&self, project_id: &str) -> Result<SchemaExport, StoreError> {
        let project = project_from_model(self.require_project(project_id).await?);
        let tables = self.get_tables_by_project(project_id).await?;

        let mut columns = Vec::new();
        for table in &tables {
            columns.extend(self.get_columns_by_table(&table.id).await?);
        }
        let relationships = self.get_relationships_by_project(project_id).await?;

        Ok(SchemaExport {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now().timestamp_millis(),
            project,
            tables,
            columns,
            relationships,
        })
    }

    async fn apply_import(
        &self,
        project_id: &str,
        batch: ImportBatch,
    ) -> Result<(), StoreError> {
        self.require_project(project_id).await?;

        for table in batch.tables {
            let model = schema_tables::ActiveModel {
                id: Set(table.id),
                project_id: Set(project_id.to_string()),
                name: Set(table.name),
                description: Set(table.description),
                position_x: Set(table.position.x),
                position_y: Set(table.position.y),
                color: Set(table.color),
                created_at: Set(table.created_at),
                updated_at: Set(table.updated_at),
            };
            model.insert(&self.db).await?;
        }
        for column in batch.columns {
            let model = schema_columns::ActiveModel {
                id: Set(column.id),
                table_id: Set(column.table_id),
                name: Set(column.name),
                data_type: Set(column.data_type.as_str().to_string()),
                length: Set(column.length.map(|v| v as i32)),
                precision: Set(column.precision.map(|v| v as i32)),
                scale: Set(column.scale.map(|v| v as i32)),
                nullable: Set(column.nullable),
                is_primary_key: Set(column.is_primary_key),
                is_unique: Set(column.is_unique),
                is_auto_increment: Set(column.is_auto_increment),
                default_value: Set(column.default_value),
                description: Set(column.description),
                order_index: Set(column.order_index),
                created_at: Set(column.created_at),
                updated_at: Set(column.updated_at),
            };
            model.insert(&self.db).await?;
        }
        for relationship in batch.relationships {
            let model = relationships::ActiveModel {
                id: Set(relationship.id),
                project_id: Set(project_id.to_string()),
                name: Set(relationship.name),
                source_table_id: Set(relationship.source_table_id),
                source_column_id: Set(relationship.source_column_id),
                target_table_id: Set(relationship.target_table_id),
                target_column_id: Set(relationship.target_column_id),
                on_delete: Set(relationship.on_delete.as_sql().to_string()),
                on_update: Set(relationship.on_update.as_sql().to_string()),
                created_at: Set(relationship.created_at),
                updated_at: Set(relationship.updated_at),
            };
            model.insert(&self.db).await?;
        }

        self.touch_project(project_id).await?;
        Ok(())
    }
}
