//! Error type for the persistence layer.

use larder_core::error::LarderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("surrealdb error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("malformed row: {0}")]
    Data(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for LarderError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LarderError::NotFound { entity, id },
            other => LarderError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_survives_conversion() {
        let err: LarderError = DbError::NotFound {
            entity: "pantry".into(),
            id: "abc".into(),
        }
        .into();
        assert!(matches!(err, LarderError::NotFound { .. }));
    }

    #[test]
    fn other_failures_collapse_into_database() {
        let err: LarderError = DbError::Migration("bad ddl".into()).into();
        assert!(matches!(err, LarderError::Database(_)));
    }
}
