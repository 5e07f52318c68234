use domains::DomainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[cfg(feature = "db-sqlite")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "db-sqlite")]
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("malformed document: {0}")]
    Corrupt(String),

    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(domain) => domain,
            other => {
                tracing::error!(error = %other, "storage failure");
                DomainError::storage(other)
            }
        }
    }
}
