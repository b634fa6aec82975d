//! Error types for orion-rank

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the ranking service
#[derive(Error, Debug)]
pub enum Error {
    /// Errors raised by orion-common (config, settings, row decoding)
    #[error(transparent)]
    Common(#[from] orion_common::Error),

    /// Database connection or query errors; the enclosing transaction is rolled back
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Tier value that is not one of liked/ok/disliked
    #[error("Invalid tier: {0}")]
    InvalidTier(String),

    /// List entry missing or owned by another user
    #[error("List entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Invalid request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// External catalog request failed
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// External catalog not configured
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),
}

/// Convenience Result type using the orion-rank Error
pub type Result<T> = std::result::Result<T, Error>;
