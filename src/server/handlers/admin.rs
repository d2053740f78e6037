use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use tracing::info;

use crate::database::migrations::Migrator;
use crate::server::app::AppState;

const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Run migrations on demand. Only usable when an admin secret is configured
/// and the caller presents it.
pub async fn init_database(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized" })),
        )
    };

    let Some(expected) = state.admin_secret.as_deref() else {
        return Err(unauthorized());
    };
    let presented = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected) {
        return Err(unauthorized());
    }

    Migrator::up(&state.db, None).await.map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
    })?;
    info!("database initialized via admin endpoint");

    Ok(Json(json!({ "ok": true })))
}
