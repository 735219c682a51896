//! Error types.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum EnvBurdenError {
    #[error("{table}: expected column '{column}' is missing")]
    SchemaDrift { table: String, column: String },
    #[error("{table}: {count} duplicate key(s) found, e.g. ({example})")]
    DuplicateKey {
        table: String,
        count: usize,
        example: String,
    },
    #[error("Failed to retrieve data from '{url}' (status {status})")]
    FetchFailed { url: String, status: u16 },
    #[error("No input files found in '{0}'")]
    MissingInput(PathBuf),
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Wrapped polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
    #[error("Wrapped serde JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Wrapped HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EnvBurdenError {
    pub(crate) fn io<P: Into<PathBuf>>(path: P) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| EnvBurdenError::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, EnvBurdenError>;
