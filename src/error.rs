use thiserror::Error;

/// Failures surfaced by the store and codec. Import integrity problems are
/// not errors; they are collected as warnings on the import report.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("Invalid JSON format")]
    InvalidJson,

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Table,
    Column,
    Relationship,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Project => "project",
            EntityKind::Table => "table",
            EntityKind::Column => "column",
            EntityKind::Relationship => "relationship",
        };
        f.write_str(name)
    }
}
