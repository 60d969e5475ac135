//! Sync-specific error types.

use thiserror::Error;

use skycast_provider::ProviderError;
use skycast_store::StoreError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Location not found: {0}")]
    LocationNotFound(i64),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Stable machine-readable label, matching the wire field `type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LocationNotFound(_) => "not_found",
            Self::Provider(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }

    /// HTTP status the API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::LocationNotFound(_) => 404,
            Self::Provider(e) => e.status_code(),
            Self::Store(e) => e.status_code(),
        }
    }
}
