use thiserror::Error;

use crate::model::entity::ModuleKind;

pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("sqlx migrate error: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),
    #[error("json error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("access to this resource is forbidden")]
    Forbidden,
    #[error("parent resource not found")]
    ParentNotFound,
    #[error("parent module must be of kind `{expected}`")]
    KindMismatch { expected: ModuleKind },
    #[error("resource already exists")]
    Conflict,
}

impl DatabaseError {
    /// Maps postgres unique violations to [`DatabaseError::Conflict`].
    pub fn from_insert(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict,
            _ => Self::SqlxError(error),
        }
    }
}
