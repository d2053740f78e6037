use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::store::local::LocalStore;

use super::handlers::{admin, health, projects, schema};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub store: Arc<LocalStore>,
    pub admin_secret: Option<String>,
}

pub async fn create_app(
    db: DatabaseConnection,
    cors_origin: Option<&str>,
    admin_secret: Option<String>,
) -> Result<Router> {
    let state = AppState {
        store: Arc::new(LocalStore::new(db.clone())),
        db,
        admin_secret,
    };

    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/projects", get(projects::list_projects))
        .route("/projects", post(projects::create_project))
        .route("/projects/:id", get(projects::get_project))
        .route("/projects/:id", patch(projects::update_project))
        .route("/projects/:id", delete(projects::delete_project))
        .route("/projects/:id/schema", get(schema::get_schema))
        .route("/projects/:id/schema", put(schema::put_schema))
        .route("/admin/db/init", post(admin::init_database))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}
