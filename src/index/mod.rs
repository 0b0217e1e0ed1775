//! Index Log Module
//!
//! Persists the key → location mapping as an append-only log of
//! fixed-size records, so the in-memory map can be rebuilt on restart.
//!
//! ## Responsibilities
//! - Encode/decode 16-byte index records
//! - Append one record per Put/Delete
//! - Scan the whole log in file order with positional reads
//! - Tolerate a single torn record at the tail
//!
//! ## File Format
//! No header, no footer, no checksum. End of file is the only delimiter.
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Record 1                                 │
//! │ ┌──────────┬─────────────┬─────────────┐ │
//! │ │ Key (8)  │ Offset (4)  │ Size (4)    │ │
//! │ └──────────┴─────────────┴─────────────┘ │
//! ├──────────────────────────────────────────┤
//! │ Record 2                                 │
//! │ ┌──────────┬─────────────┬─────────────┐ │
//! │ │ Key (8)  │ Offset (4)  │ Size (4)    │ │
//! │ └──────────┴─────────────┴─────────────┘ │
//! └──────────────────────────────────────────┘
//! ```
//! All integers are big-endian. Offset is in padding units; an offset of
//! zero marks a tombstone.

mod record;
mod writer;
mod reader;
mod recovery;

pub use record::{IndexRecord, RECORD_SIZE};
pub use writer::{append_record, IndexWriter};
pub use reader::{walk_index_file, IndexReader, IndexRecords, ReadAt};
pub use recovery::{IndexRecovery, RecoveryResult};
