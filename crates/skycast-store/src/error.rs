//! Store-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Bad input: out-of-range coordinates, missing required fields,
    /// duplicate coordinate pair.
    #[error("{0}")]
    Validation(String),

    /// Underlying database failure or a structurally invalid reference.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    /// Stable machine-readable label, matching the wire field `type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Persistence(_) => "persistence",
        }
    }

    /// HTTP status the API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Persistence(_) => 500,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Validation(
                    "A location with these coordinates already exists".to_string(),
                )
            }
            _ => StoreError::Persistence(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Persistence(err.to_string())
    }
}
