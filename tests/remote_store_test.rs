//! Behavioral tests for the REST-backed store realization, driven against a
//! live in-process backend. The same scenarios covered for the embedded
//! store must come out identically here.

use anyhow::Result;
use sea_orm::Database;
use tempfile::NamedTempFile;

use schemaforge::database::setup_database;
use schemaforge::error::StoreError;
use schemaforge::model::{DataType, Position, ReferentialAction};
use schemaforge::server::app::create_app;
use schemaforge::store::remote::RemoteStore;
use schemaforge::store::{NewColumn, NewRelationship, NewTable, SchemaStore, TableMove};

/// Boot the backend on an ephemeral port and point a remote store at it.
/// The base URL comes back too so tests can open further stores against the
/// same server.
async fn setup_remote_store() -> Result<(RemoteStore, String, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    let app = create_app(db, Some("*"), None).await?;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((RemoteStore::new(base_url.clone()), base_url, temp_file))
}

fn new_table(project_id: &str, name: &str) -> NewTable {
    NewTable {
        project_id: project_id.to_string(),
        name: name.to_string(),
        description: None,
        position: Position::default(),
        color: None,
    }
}

#[tokio::test]
async fn test_remote_crud_round_trip() -> Result<()> {
    let (store, _base_url, _temp_file) = setup_remote_store().await?;

    let project = store.create_project("Remote", Some("over REST".into())).await?;
    assert_eq!(project.name, "Remote");

    let table = store.create_table(new_table(&project.id, "users")).await?;

    // PK coercion holds across the wire too.
    let mut pk = NewColumn::plain(&table.id, "id", DataType::Int);
    pk.is_primary_key = true;
    pk.nullable = true;
    let pk = store.create_column(pk).await?;
    assert!(!pk.nullable);

    let renamed = store
        .update_table(
            &table.id,
            schemaforge::store::TableUpdate {
                name: Some("people".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(renamed.name, "people");

    let tables = store.get_tables_by_project(&project.id).await?;
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "people");

    store.delete_column(&pk.id).await?;
    assert!(store.get_column(&pk.id).await?.is_none());

    store.delete_project(&project.id).await?;
    assert!(store.get_project(&project.id).await?.is_none());
    // Double delete is a silent no-op.
    store.delete_project(&project.id).await?;
    Ok(())
}

#[tokio::test]
async fn test_remote_delete_table_cascades() -> Result<()> {
    let (store, _base_url, _temp_file) = setup_remote_store().await?;

    let project = store.create_project("Shop", None).await?;
    let users = store.create_table(new_table(&project.id, "users")).await?;
    let orders = store.create_table(new_table(&project.id, "orders")).await?;

    let users_id = store
        .create_column(NewColumn::plain(&users.id, "id", DataType::Int))
        .await?;
    let user_id = store
        .create_column(NewColumn::plain(&orders.id, "user_id", DataType::Int))
        .await?;

    store
        .create_relationship(
            NewRelationship {
                name: None,
                source_column_id: user_id.id.clone(),
                target_column_id: users_id.id.clone(),
                on_delete: ReferentialAction::Cascade,
                on_update: ReferentialAction::NoAction,
            },
            true,
        )
        .await?;

    store.delete_table(&users.id).await?;

    assert!(store.get_table(&users.id).await?.is_none());
    assert!(store.get_column(&users_id.id).await?.is_none());
    assert!(store.get_table(&orders.id).await?.is_some());
    assert!(store
        .get_relationships_by_project(&project.id)
        .await?
        .is_empty());
    Ok(())
}

#[tokio::test]
async fn test_remote_cold_cache_falls_back_to_full_scan() -> Result<()> {
    let (store, base_url, _temp_file) = setup_remote_store().await?;

    let project = store.create_project("Seeded", None).await?;
    let table = store.create_table(new_table(&project.id, "users")).await?;
    let column = store
        .create_column(NewColumn::plain(&table.id, "id", DataType::Int))
        .await?;

    // A brand-new store has an empty parent cache; lookups by bare id must
    // still resolve by scanning the projects on the backend.
    let cold = RemoteStore::new(base_url);
    let found_table = cold.get_table(&table.id).await?.expect("table via scan");
    assert_eq!(found_table.name, "users");
    let found_column = cold.get_column(&column.id).await?.expect("column via scan");
    assert_eq!(found_column.table_id, table.id);

    assert!(cold.get_table("no-such-table").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_remote_move_tables_spans_projects() -> Result<()> {
    let (store, _base_url, _temp_file) = setup_remote_store().await?;

    let first = store.create_project("First", None).await?;
    let second = store.create_project("Second", None).await?;
    let a = store.create_table(new_table(&first.id, "a")).await?;
    let b = store.create_table(new_table(&second.id, "b")).await?;

    // One batch across both projects, with a repeated id whose last entry
    // must win.
    store
        .move_tables(&[
            TableMove {
                id: a.id.clone(),
                position: Position::new(10.0, 10.0),
            },
            TableMove {
                id: b.id.clone(),
                position: Position::new(20.0, 20.0),
            },
            TableMove {
                id: a.id.clone(),
                position: Position::new(99.0, 42.0),
            },
        ])
        .await?;

    let a = store.get_table(&a.id).await?.unwrap();
    let b = store.get_table(&b.id).await?.unwrap();
    assert_eq!(a.position, Position::new(99.0, 42.0));
    assert_eq!(b.position, Position::new(20.0, 20.0));
    Ok(())
}

#[tokio::test]
async fn test_remote_cross_project_relationship_is_rejected() -> Result<()> {
    let (store, _base_url, _temp_file) = setup_remote_store().await?;

    let first = store.create_project("First", None).await?;
    let second = store.create_project("Second", None).await?;
    let left = store.create_table(new_table(&first.id, "left")).await?;
    let right = store.create_table(new_table(&second.id, "right")).await?;

    let source = store
        .create_column(NewColumn::plain(&left.id, "ref", DataType::Int))
        .await?;
    let target = store
        .create_column(NewColumn::plain(&right.id, "id", DataType::Int))
        .await?;

    let err = store
        .create_relationship(
            NewRelationship {
                name: None,
                source_column_id: source.id,
                target_column_id: target.id,
                on_delete: ReferentialAction::NoAction,
                on_update: ReferentialAction::NoAction,
            },
            true,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn test_remote_export_matches_written_state() -> Result<()> {
    let (store, _base_url, _temp_file) = setup_remote_store().await?;

    let project = store.create_project("Snapshot", None).await?;
    let table = store.create_table(new_table(&project.id, "t")).await?;
    store
        .create_column(NewColumn::plain(&table.id, "b", DataType::Text))
        .await?;
    store
        .create_column(NewColumn::plain(&table.id, "a", DataType::Text))
        .await?;

    let schema = store.export_project(&project.id).await?;
    assert_eq!(schema.project.id, project.id);
    assert_eq!(schema.tables.len(), 1);
    // Columns come back in order_index order.
    let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a"]);
    Ok(())
}
