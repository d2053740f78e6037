//! Consistency-preserving store over the Project/Table/Column/Relationship
//! graph.
//!
//! Two interchangeable realizations implement [`SchemaStore`]: a local
//! embedded SQLite store ([`local::LocalStore`]) and a remote REST-backed
//! store ([`remote::RemoteStore`]) that persists each project's schema as a
//! single document per write. Callers select one through
//! [`open_store`] based on the runtime configuration; behavior is identical
//! for every operation.

pub mod local;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::config::{Config, StorageMode};
use crate::error::StoreError;
use crate::model::{
    Column, DataType, Position, Project, ReferentialAction, Relationship, SchemaExport, Table,
    Viewport,
};

#[derive(Clone, Debug)]
pub struct NewTable {
    pub project_id: String,
    pub name: String,
    pub description: Option<String>,
    pub position: Position,
    pub color: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewColumn {
    pub table_id: String,
    pub name: String,
    pub data_type: DataType,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub is_auto_increment: bool,
    pub default_value: Option<String>,
    pub description: Option<String>,
    /// When absent, the column is appended after the table's current columns.
    pub order_index: Option<i32>,
}

impl NewColumn {
    /// A nullable, unconstrained column of the given type.
    pub fn plain(table_id: impl Into<String>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            table_id: table_id.into(),
            name: name.into(),
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
            order_index: None,
        }
    }
}

/// The two columns pin the two tables and the owning project; the store
/// resolves those transitively.
#[derive(Clone, Debug)]
pub struct NewRelationship {
    pub name: Option<String>,
    pub source_column_id: String,
    pub target_column_id: String,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

/// Partial update. `None` leaves a field untouched; the inner `Option`
/// distinguishes "clear" from "keep" for optional fields.
#[derive(Clone, Debug, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct TableUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub position: Option<Position>,
    pub color: Option<Option<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct ColumnUpdate {
    pub name: Option<String>,
    pub data_type: Option<DataType>,
    pub length: Option<Option<u32>>,
    pub precision: Option<Option<u32>>,
    pub scale: Option<Option<u32>>,
    pub nullable: Option<bool>,
    pub is_primary_key: Option<bool>,
    pub is_unique: Option<bool>,
    pub is_auto_increment: Option<bool>,
    pub default_value: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct RelationshipUpdate {
    pub name: Option<Option<String>>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

#[derive(Clone, Debug)]
pub struct TableMove {
    pub id: String,
    pub position: Position,
}

/// Fully remapped entities ready to be spliced into a destination project.
/// Produced by the import codec; ids are fresh and internally consistent.
#[derive(Clone, Debug, Default)]
pub struct ImportBatch {
    pub tables: Vec<Table>,
    pub columns: Vec<Column>,
    pub relationships: Vec<Relationship>,
}

/// CRUD + structural operations over the four-entity graph. Implementations
/// must hold the cascade and primary-key invariants on every mutation and be
/// behaviorally equivalent to each other.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    // Projects
    async fn create_project(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Project, StoreError>;
    async fn get_projects(&self) -> Result<Vec<Project>, StoreError>;
    async fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError>;
    async fn update_project(&self, id: &str, update: ProjectUpdate)
        -> Result<Project, StoreError>;
    /// Cascades tables, columns, relationships, and viewport state.
    /// Deleting an absent project is a no-op.
    async fn delete_project(&self, id: &str) -> Result<(), StoreError>;

    // Tables
    async fn create_table(&self, new: NewTable) -> Result<Table, StoreError>;
    async fn get_table(&self, id: &str) -> Result<Option<Table>, StoreError>;
    /// Creation order; empty when the project is missing or has no tables.
    async fn get_tables_by_project(&self, project_id: &str) -> Result<Vec<Table>, StoreError>;
    async fn update_table(&self, id: &str, update: TableUpdate) -> Result<Table, StoreError>;
    /// Batched position updates. Multiple moves of the same id coalesce to
    /// the last entry; writes are grouped per owning project.
    async fn move_tables(&self, moves: &[TableMove]) -> Result<(), StoreError>;
    async fn delete_table(&self, id: &str) -> Result<(), StoreError>;
    /// Clones the table and its columns under fresh ids; relationships are
    /// never cloned. Name becomes `<original>_copy`; default placement is
    /// offset (+50,+50) from the source.
    async fn duplicate_table(
        &self,
        id: &str,
        position: Option<Position>,
    ) -> Result<Table, StoreError>;
    async fn is_table_name_unique(
        &self,
        project_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, StoreError>;

    // Columns
    async fn create_column(&self, new: NewColumn) -> Result<Column, StoreError>;
    async fn get_column(&self, id: &str) -> Result<Option<Column>, StoreError>;
    /// Sorted by `order_index`, insertion order breaking ties.
    async fn get_columns_by_table(&self, table_id: &str) -> Result<Vec<Column>, StoreError>;
    async fn update_column(&self, id: &str, update: ColumnUpdate) -> Result<Column, StoreError>;
    async fn delete_column(&self, id: &str) -> Result<(), StoreError>;
    /// Partial reorder: listed ids get their list position as `order_index`;
    /// columns absent from the list keep their prior index.
    async fn reorder_columns(
        &self,
        table_id: &str,
        ordered_ids: &[String],
    ) -> Result<(), StoreError>;
    async fn is_column_name_unique(
        &self,
        table_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, StoreError>;

    // Relationships
    /// `validate_data_types=false` is reserved for import flows tolerating
    /// heterogeneous sources.
    async fn create_relationship(
        &self,
        new: NewRelationship,
        validate_data_types: bool,
    ) -> Result<Relationship, StoreError>;
    async fn get_relationship(&self, id: &str) -> Result<Option<Relationship>, StoreError>;
    async fn get_relationships_by_project(
        &self,
        project_id: &str,
    ) -> Result<Vec<Relationship>, StoreError>;
    async fn update_relationship(
        &self,
        id: &str,
        update: RelationshipUpdate,
    ) -> Result<Relationship, StoreError>;
    /// No-op when the relationship is already absent.
    async fn delete_relationship(&self, id: &str) -> Result<(), StoreError>;

    // Viewport
    async fn get_viewport(&self, project_id: &str) -> Result<Option<Viewport>, StoreError>;
    async fn save_viewport(&self, project_id: &str, viewport: Viewport)
        -> Result<(), StoreError>;

    // Snapshots
    async fn export_project(&self, project_id: &str) -> Result<SchemaExport, StoreError>;
    /// Applies an import batch to the destination project. The remote
    /// realization performs this as a single read-modify-write of the whole
    /// document.
    async fn apply_import(&self, project_id: &str, batch: ImportBatch) -> Result<(), StoreError>;

    async fn move_table(&self, id: &str, position: Position) -> Result<(), StoreError> {
        self.move_tables(&[TableMove {
            id: id.to_string(),
            position,
        }])
        .await
    }
}

/// Collapse a move batch to one position per table id, last write winning,
/// preserving first-seen order.
pub(crate) fn coalesce_moves(moves: &[TableMove]) -> IndexMap<String, Position> {
    let mut coalesced = IndexMap::new();
    for m in moves {
        coalesced.insert(m.id.clone(), m.position);
    }
    coalesced
}

/// Resolve the configured store realization.
pub async fn open_store(config: &Config) -> Result<Arc<dyn SchemaStore>, StoreError> {
    match config.mode {
        StorageMode::Local => {
            let url = crate::database::get_database_url(config.database.as_deref());
            let db = crate::database::establish_connection(&url).await?;
            crate::database::setup_database(&db).await?;
            Ok(Arc::new(local::LocalStore::new(db)))
        }
        StorageMode::Remote => Ok(Arc::new(remote::RemoteStore::new(
            config.api.base_url.clone(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_batches_coalesce_to_last_entry() {
        let moves = vec![
            TableMove {
                id: "a".into(),
                position: Position::new(1.0, 1.0),
            },
            TableMove {
                id: "b".into(),
                position: Position::new(2.0, 2.0),
            },
            TableMove {
                id: "a".into(),
                position: Position::new(9.0, 9.0),
            },
        ];
        let coalesced = coalesce_moves(&moves);
        assert_eq!(coalesced.len(), 2);
        assert_eq!(coalesced["a"], Position::new(9.0, 9.0));
        assert_eq!(coalesced["b"], Position::new(2.0, 2.0));
    }
}
