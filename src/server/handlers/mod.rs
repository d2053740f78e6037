pub mod admin;
pub mod health;
pub mod projects;
pub mod schema;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tracing::error;

use crate::error::StoreError;

/// Uniform error body for every endpoint: `{"error": "<message>"}` with a
/// status derived from the failure class.
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::Validation(_) | StoreError::InvalidJson => StatusCode::BAD_REQUEST,
            StoreError::Http { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            StoreError::Database(_) | StoreError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Deserialize a field that distinguishes "absent" (outer `None`) from
/// explicit `null` (inner `None`). Pair with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
