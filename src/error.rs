//! Error types for the ingestion boundary and the dashboard store.
//!
//! Aggregation and query answering are total functions and have no error
//! type of their own.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown module: {0} (expected manpower, equipment, progress or cost)")]
pub struct UnknownModule(pub String);

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file exceeds the {limit_mb}MB limit ({size} bytes)")]
    FileTooLarge { size: u64, limit_mb: u64 },

    #[error("file is empty or missing headers")]
    EmptyFile,

    #[error(transparent)]
    UnknownModule(#[from] UnknownModule),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Workbook(String),
}

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stored spec at {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
