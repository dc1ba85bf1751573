// src/error/types.rs
use crate::domain::{DomainError, PostId, TaskKind};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Post not found: {0}")]
    PostNotFound(PostId),

    #[error("Resource not found")]
    NotFound,

    /// A second task start while one is active. Surfaced to the caller, never retried here.
    #[error("Another task is running: {running}")]
    TaskAlreadyRunning { running: TaskKind },

    /// A scan or reindex holds the task slot.
    #[error("A {operation} is in progress")]
    OperationInProgress { operation: &'static str },

    /// Batch-level failure: the whole scan is aborted.
    #[error("Source directory unavailable: {path:?} ({reason})")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<chrono::ParseError> for AppError {
    fn from(err: chrono::ParseError) -> Self {
        AppError::Other(format!("Date parse error: {}", err))
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::Pool(err.to_string())
    }
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        AppError::Other(format!("Directory walk error: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
