//! Index record definitions
//!
//! Defines the fixed 16-byte wire layout of one key → location mapping.

use bytes::{Buf, BufMut};

use crate::error::{NeedleMapError, Result};

/// Size in bytes of one encoded record
pub const RECORD_SIZE: usize = 16;

/// A single entry in the index log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexRecord {
    /// Needle key
    pub key: u64,

    /// Location in padding units; 0 marks a tombstone
    pub offset: u32,

    /// Raw byte length of the needle
    pub size: u32,
}

impl IndexRecord {
    pub fn new(key: u64, offset: u32, size: u32) -> Self {
        Self { key, offset, size }
    }

    /// A deletion marker for `key`, as the writer emits it
    pub fn tombstone(key: u64) -> Self {
        Self::new(key, 0, 0)
    }

    /// True when this record deletes its key, whatever the size field says
    pub fn is_tombstone(&self) -> bool {
        self.offset == 0
    }

    /// Encode into the 16-byte big-endian layout
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        let mut buf = &mut bytes[..];
        buf.put_u64(self.key);
        buf.put_u32(self.offset);
        buf.put_u32(self.size);
        bytes
    }

    /// Decode from exactly 16 bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(NeedleMapError::MalformedRecord { len: bytes.len() });
        }
        let mut buf = bytes;
        Ok(Self {
            key: buf.get_u64(),
            offset: buf.get_u32(),
            size: buf.get_u32(),
        })
    }
}
