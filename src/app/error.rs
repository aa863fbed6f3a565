use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by document, export and settings I/O.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// No home directory to place the settings file in.
    #[error("no configuration directory available")]
    NoConfigDir,
}

pub type Result<T> = std::result::Result<T, MapError>;
