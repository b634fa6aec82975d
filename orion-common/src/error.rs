//! Errors raised by storage, config and model decoding

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The root folder or the database directory could not be created
    #[error("Cannot create folder {}: {source}", path.display())]
    Folder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file unreadable or not valid TOML
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Film not found: {0}")]
    FilmNotFound(Uuid),

    /// Tier name outside `liked`, `ok`, `disliked`
    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    /// A stored value that does not decode, e.g. a malformed UUID
    #[error("Malformed value in column {column}: {detail}")]
    CorruptRow { column: &'static str, detail: String },
}

impl Error {
    pub fn folder(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Folder {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(column: &'static str, detail: impl std::fmt::Display) -> Self {
        Error::CorruptRow {
            column,
            detail: detail.to_string(),
        }
    }
}
