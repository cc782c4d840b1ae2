//! Crate-wide error type.
//!
//! Library seams (walker, hasher, reader, indexer) return `Result<T, UIndexError>`;
//! the CLI binaries wrap these in `anyhow::Context` for the single-line stderr
//! diagnostic required by the error handling design.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UIndexError {
    #[error("failed to stat walk root {path}: {source}")]
    RootStat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported checksum algorithm: {0}")]
    UnknownAlgo(String),

    #[error("malformed byte size: {0}")]
    BadByteSize(String),

    #[error("malformed algo key: {0}")]
    BadAlgoKey(String),

    #[error("{flag_a} and {flag_b} cannot be used together")]
    MutuallyExclusive { flag_a: &'static str, flag_b: &'static str },

    #[error("--out is required for this operation")]
    MissingOut,

    #[error("referenced output file does not exist: {0}")]
    MissingReferencedOut(PathBuf),

    #[error("a worker thread failed: {0}")]
    Worker(String),

    #[error("walk cancelled: downstream consumer stopped early")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, UIndexError>;

/// Process exit codes for CLI-boundary failure categories.
pub mod exit_code {
    pub const OK: i32 = 0;
    pub const MUTUALLY_EXCLUSIVE_FLAGS: i32 = 1;
    pub const MISSING_OUT: i32 = 2;
    pub const MISSING_REFERENCED_OUT: i32 = 3;
}
