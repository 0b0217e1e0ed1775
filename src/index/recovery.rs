//! Index Verification
//!
//! Read-only diagnostic scan of an index log. Useful for inspecting a
//! file owned by a running needle map, since it only uses positional reads.

use std::fs::File;
use std::path::Path;

use crate::config::DEFAULT_ROWS_PER_CHUNK;
use crate::error::Result;

use super::{IndexRecords, ReadAt};

/// Inspects index logs without modifying them
pub struct IndexRecovery;

/// Result of a verification scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of complete records in the log
    pub records: u64,

    /// Records with a non-zero offset
    pub live_records: u64,

    /// Records with a zero offset
    pub tombstones: u64,

    /// Largest key seen in any record
    pub max_key: u64,

    /// Bytes of a torn final record that replay would ignore
    pub trailing_bytes: usize,

    /// Whether the log ends with a partial record
    pub was_truncated: bool,
}

impl IndexRecovery {
    /// Verify an index file on disk
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let file = File::open(path)?;
        Self::verify_source(&file, DEFAULT_ROWS_PER_CHUNK)
    }

    /// Verify any positional read source
    pub fn verify_source<R: ReadAt + ?Sized>(
        source: &R,
        rows_per_chunk: usize,
    ) -> Result<RecoveryResult> {
        let mut result = RecoveryResult::default();
        let mut records = IndexRecords::new(source, rows_per_chunk);

        for record in records.by_ref() {
            let record = record?;
            result.records += 1;
            result.max_key = result.max_key.max(record.key);
            if record.is_tombstone() {
                result.tombstones += 1;
            } else {
                result.live_records += 1;
            }
        }

        result.trailing_bytes = records.trailing_bytes();
        result.was_truncated = result.trailing_bytes > 0;
        Ok(result)
    }
}
