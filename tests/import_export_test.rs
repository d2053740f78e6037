//! End-to-end export/import tests: JSON round trips between projects and
//! DDL generation from live store snapshots.

use anyhow::Result;
use sea_orm::Database;
use tempfile::NamedTempFile;

use schemaforge::database::setup_database;
use schemaforge::error::StoreError;
use schemaforge::export::{generate_sql, to_json};
use schemaforge::import::import_into_project;
use schemaforge::model::{DataType, Position, ReferentialAction, SqlDialect};
use schemaforge::store::local::LocalStore;
use schemaforge::store::{NewColumn, NewRelationship, NewTable, SchemaStore};

async fn setup_test_store() -> Result<(LocalStore, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((LocalStore::new(db), temp_file))
}

/// Seed a project with users/orders and a CASCADE foreign key, returning
/// its id.
async fn seed_shop(store: &LocalStore) -> Result<String> {
    let project = store.create_project("Shop", None).await?;
    let users = store
        .create_table(NewTable {
            project_id: project.id.clone(),
            name: "users".to_string(),
            description: None,
            position: Position::new(100.0, 100.0),
            color: None,
        })
        .await?;
    let orders = store
        .create_table(NewTable {
            project_id: project.id.clone(),
            name: "orders".to_string(),
            description: None,
            position: Position::new(500.0, 100.0),
            color: None,
        })
        .await?;

    let mut users_id = NewColumn::plain(&users.id, "id", DataType::Int);
    users_id.is_primary_key = true;
    let users_id = store.create_column(users_id).await?;

    let mut email = NewColumn::plain(&users.id, "email", DataType::Varchar);
    email.length = Some(255);
    email.nullable = false;
    email.is_unique = true;
    store.create_column(email).await?;

    let user_id = store
        .create_column(NewColumn::plain(&orders.id, "user_id", DataType::Int))
        .await?;

    store
        .create_relationship(
            NewRelationship {
                name: None,
                source_column_id: user_id.id,
                target_column_id: users_id.id,
                on_delete: ReferentialAction::Cascade,
                on_update: ReferentialAction::NoAction,
            },
            true,
        )
        .await?;

    Ok(project.id)
}

#[tokio::test]
async fn test_json_roundtrip_into_fresh_project() -> Result<()> {
    let (store, _temp_file) = setup_test_store().await?;
    let source_id = seed_shop(&store).await?;

    let exported = store.export_project(&source_id).await?;
    let json = to_json::render(&exported).unwrap();

    let destination = store.create_project("Copy of Shop", None).await?;
    let report = import_into_project(&store, &destination.id, &json).await?;

    assert_eq!(report.tables_created, 2);
    assert_eq!(report.columns_created, 3);
    assert_eq!(report.relationships_created, 1);
    assert!(report.warnings.is_empty());

    // Same structure, entirely new identities.
    let copy = store.export_project(&destination.id).await?;
    let mut source_names: Vec<&str> = exported.tables.iter().map(|t| t.name.as_str()).collect();
    let mut copy_names: Vec<&str> = copy.tables.iter().map(|t| t.name.as_str()).collect();
    source_names.sort();
    copy_names.sort();
    assert_eq!(source_names, copy_names);

    for table in &copy.tables {
        assert!(exported.tables.iter().all(|t| t.id != table.id));
        assert_eq!(table.project_id, destination.id);
    }

    let fk = &copy.relationships[0];
    assert_eq!(fk.on_delete, ReferentialAction::Cascade);
    assert!(copy.columns.iter().any(|c| c.id == fk.source_column_id));

    // The primary key survived with its NOT NULL coercion.
    let pk = copy
        .columns
        .iter()
        .find(|c| c.is_primary_key)
        .expect("primary key imported");
    assert!(!pk.nullable);
    Ok(())
}

#[tokio::test]
async fn test_import_rejects_malformed_json() -> Result<()> {
    let (store, _temp_file) = setup_test_store().await?;
    let project = store.create_project("Target", None).await?;

    let err = import_into_project(&store, &project.id, "{truncated")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid JSON format");

    let err = import_into_project(&store, &project.id, "[1, 2, 3]")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn test_import_into_missing_project_is_not_found() -> Result<()> {
    let (store, _temp_file) = setup_test_store().await?;
    let document = r#"{"project": {"id": "x", "name": "x"}, "tables": [], "columns": []}"#;

    let err = import_into_project(&store, "no-such-project", document)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_imported_tables_land_beside_existing_ones() -> Result<()> {
    let (store, _temp_file) = setup_test_store().await?;
    let source_id = seed_shop(&store).await?;
    let json = to_json::render(&store.export_project(&source_id).await?).unwrap();

    // Import into the same project: new tables must not overlap the old.
    import_into_project(&store, &source_id, &json).await?;

    let tables = store.get_tables_by_project(&source_id).await?;
    assert_eq!(tables.len(), 4);
    let imported: Vec<_> = tables.iter().skip(2).collect();
    for table in imported {
        // Existing rightmost table sits at x=500.
        assert!(table.position.x > 500.0);
    }
    Ok(())
}

#[tokio::test]
async fn test_ddl_generation_from_store_snapshot() -> Result<()> {
    let (store, _temp_file) = setup_test_store().await?;
    let project_id = seed_shop(&store).await?;
    let schema = store.export_project(&project_id).await?;

    let postgres = generate_sql(&schema, SqlDialect::Postgresql);
    assert!(postgres.contains("-- PostgreSQL schema for Shop"));
    assert_eq!(postgres.matches("CREATE TABLE").count(), 2);
    assert!(postgres.contains("FOREIGN KEY"));

    let mysql = generate_sql(&schema, SqlDialect::Mysql);
    assert!(mysql.contains("`users`"));

    let sqlite = generate_sql(&schema, SqlDialect::Sqlite);
    assert!(!sqlite.contains("ALTER TABLE"));
    Ok(())
}
