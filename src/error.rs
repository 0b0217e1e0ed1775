//! Error types for the needle index
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using NeedleMapError
pub type Result<T> = std::result::Result<T, NeedleMapError>;

/// Unified error type for needle index operations
#[derive(Debug, Error)]
pub enum NeedleMapError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Index Log Errors
    // -------------------------------------------------------------------------
    #[error("Malformed index record: expected 16 bytes, got {len}")]
    MalformedRecord { len: usize },

    #[error("Index read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("Index append failed: {0}")]
    Append(#[source] std::io::Error),

    #[error("Index append was short: wrote {written} of 16 bytes")]
    ShortAppend { written: usize },

    #[error("Failed to remove index file: {0}")]
    Destroy(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Needle Map Errors
    // -------------------------------------------------------------------------
    #[error("Offset 0 is reserved for tombstones (key {key})")]
    ZeroOffset { key: u64 },

    #[error("Needle map is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl NeedleMapError {
    /// True for failures to durably append a record
    pub fn is_append_error(&self) -> bool {
        matches!(self, Self::Append(_) | Self::ShortAppend { .. })
    }
}
