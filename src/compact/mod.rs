//! Compact Map Module
//!
//! Memory-dense in-memory index from needle key to location.
//!
//! ## Responsibilities
//! - Insert-or-update returning the previous size
//! - Point lookups with no mutation
//! - Delete returning the removed size (absent keys are a no-op)
//!
//! ## Data Structure Choice
//! A general-purpose map spends a heap allocation or several words of
//! bookkeeping per entry, which does not scale to 10^8+ small needles.
//! Instead entries live in contiguous 16-byte slots:
//! - Keys are spread over 2^shard_bits independent open-addressing shards,
//!   so growth rehashes one shard at a time and probe runs stay short
//! - Linear probing within a shard, power-of-two capacity
//! - Occupancy tracked in a side bitset (1 bit per slot), so every key and
//!   every location value remains storable
//! - Deletion uses backward-shift, leaving no dead slots behind

mod table;

pub use table::CompactMap;

/// Location of a needle in the data file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NeedleValue {
    /// Offset in padding units
    pub offset: u32,

    /// Raw byte length
    pub size: u32,
}

impl NeedleValue {
    pub fn new(offset: u32, size: u32) -> Self {
        Self { offset, size }
    }

    /// Byte address in the data file
    pub fn actual_offset(&self, padding_size: u64) -> u64 {
        u64::from(self.offset) * padding_size
    }

    /// A zero offset never points at needle data
    pub fn is_tombstone(&self) -> bool {
        self.offset == 0
    }
}
