//! REST API integration tests for the schema backend.

use anyhow::Result;
use axum::http::StatusCode;
use axum_test::TestServer;
use sea_orm::Database;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use uuid::Uuid;

use schemaforge::database::setup_database;
use schemaforge::server::app::create_app;

/// Create a test server over a temp-file database. The `NamedTempFile` is
/// returned so the database file outlives the server's connection pool.
async fn setup_test_server(admin_secret: Option<&str>) -> Result<(TestServer, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    let app = create_app(db, Some("*"), admin_secret.map(str::to_string)).await?;
    let server = TestServer::new(app)?;

    Ok((server, temp_file))
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let (server, _db_file) = setup_test_server(None).await?;

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["service"], "schemaforge-server");
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_projects_crud_api() -> Result<()> {
    let (server, _db_file) = setup_test_server(None).await?;

    let response = server
        .post("/projects")
        .json(&json!({
            "name": "Test Project",
            "description": "Created via API test"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let project: Value = response.json();
    let project_id = project["id"].as_str().unwrap().to_string();
    assert!(Uuid::parse_str(&project_id).is_ok());
    assert_eq!(project["name"], "Test Project");
    assert_eq!(project["description"], "Created via API test");

    let response = server.get("/projects").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let projects: Vec<Value> = response.json();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["id"].as_str().unwrap(), project_id);

    let response = server.get(&format!("/projects/{}", project_id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // PATCH with explicit null clears the description; omitting it keeps it.
    let response = server
        .patch(&format!("/projects/{}", project_id))
        .json(&json!({ "name": "Renamed" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let updated: Value = response.json();
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["description"], "Created via API test");

    let response = server
        .patch(&format!("/projects/{}", project_id))
        .json(&json!({ "description": null }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let cleared: Value = response.json();
    assert!(cleared.get("description").is_none() || cleared["description"].is_null());

    let response = server.delete(&format!("/projects/{}", project_id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server.get(&format!("/projects/{}", project_id)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_blank_project_name_is_bad_request() -> Result<()> {
    let (server, _db_file) = setup_test_server(None).await?;
    let response = server
        .post("/projects")
        .json(&json!({ "name": "   " }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_schema_roundtrip_with_temp_ids() -> Result<()> {
    let (server, _db_file) = setup_test_server(None).await?;

    let response = server
        .post("/projects")
        .json(&json!({ "name": "Designer" }))
        .await;
    let project: Value = response.json();
    let project_id = project["id"].as_str().unwrap().to_string();

    // Empty project still has a schema document.
    let response = server.get(&format!("/projects/{}/schema", project_id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let schema: Value = response.json();
    assert_eq!(schema["tables"].as_array().unwrap().len(), 0);

    // Whole-document PUT with client-side temporary ids.
    let now = "2024-01-01T00:00:00Z";
    let document = json!({
        "version": "1.0",
        "exportedAt": 1704067200000i64,
        "project": {
            "id": project_id,
            "name": "Designer",
            "createdAt": now,
            "updatedAt": now
        },
        "tables": [{
            "id": "temp-table-1",
            "projectId": project_id,
            "name": "users",
            "position": { "x": 100.0, "y": 200.0 },
            "createdAt": now,
            "updatedAt": now
        }],
        "columns": [{
            "id": "temp-col-1",
            "tableId": "temp-table-1",
            "name": "id",
            "dataType": "INT",
            "nullable": false,
            "isPrimaryKey": true,
            "isUnique": false,
            "isAutoIncrement": false,
            "orderIndex": 0,
            "createdAt": now,
            "updatedAt": now
        }],
        "relationships": []
    });

    let response = server
        .put(&format!("/projects/{}/schema", project_id))
        .json(&document)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["ok"], true);

    // Temporary ids were replaced with real UUIDs, references intact.
    let response = server.get(&format!("/projects/{}/schema", project_id)).await;
    let schema: Value = response.json();
    let table = &schema["tables"][0];
    let column = &schema["columns"][0];
    let table_id = table["id"].as_str().unwrap();
    assert!(Uuid::parse_str(table_id).is_ok());
    assert_eq!(column["tableId"].as_str().unwrap(), table_id);
    assert_eq!(table["position"]["x"], 100.0);

    // 404 for a schema of a project that does not exist.
    let response = server.get("/projects/does-not-exist/schema").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_admin_init_requires_secret() -> Result<()> {
    let (server, _db_file) = setup_test_server(Some("s3cret")).await?;

    let response = server.post("/admin/db/init").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .post("/admin/db/init")
        .add_header(
            axum::http::HeaderName::from_static("x-admin-secret"),
            axum::http::HeaderValue::from_static("wrong"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .post("/admin/db/init")
        .add_header(
            axum::http::HeaderName::from_static("x-admin-secret"),
            axum::http::HeaderValue::from_static("s3cret"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["ok"], true);
    Ok(())
}

#[tokio::test]
async fn test_admin_init_disabled_without_configured_secret() -> Result<()> {
    let (server, _db_file) = setup_test_server(None).await?;
    let response = server
        .post("/admin/db/init")
        .add_header(
            axum::http::HeaderName::from_static("x-admin-secret"),
            axum::http::HeaderValue::from_static("anything"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}
