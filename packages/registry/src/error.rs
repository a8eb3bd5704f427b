use sea_orm::DbErr;
use thiserror::Error;

/// Errors surfaced by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The addressed record does not exist or belongs to another user.
    #[error("not found: {0}")]
    NotFound(String),

    /// Referential integrity or input constraint failure.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Storage engine failure, propagated as-is.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
