//! Error types for the navigation service.
//!
//! Structured errors via thiserror, with paths and node ids carried in the
//! variants so the tool layer can build actionable messages.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for graph and cache operations.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Parsing errors. The raw text is not carried here; the tool layer
    /// re-reads the file for the fallback response.
    #[error("Failed to parse '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    #[error("Failed to persist cache record for '{path}': {reason}")]
    CachePersist { path: PathBuf, reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("{0}")]
    General(String),
}

impl GraphError {
    /// Short machine-readable tag used in the `{error, type}` tool payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            GraphError::FileRead { .. } => "file_read",
            GraphError::FileWrite { .. } => "file_write",
            GraphError::FileNotFound { .. } => "file_not_found",
            GraphError::Parse { .. } => "parse_failed",
            GraphError::NodeNotFound { .. } => "node_not_found",
            GraphError::CachePersist { .. } => "cache_persist",
            GraphError::Config { .. } => "config",
            GraphError::General(_) => "internal_error",
        }
    }
}

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
