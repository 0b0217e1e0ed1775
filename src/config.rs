//! Configuration for the needle index
//!
//! Centralized configuration with sensible defaults.

use crate::error::{NeedleMapError, Result};

/// Default padding unit in bytes; stored offsets are multiples of this
pub const DEFAULT_PADDING_SIZE: u64 = 8;

/// Default number of 16-byte records fetched per positional read
pub const DEFAULT_ROWS_PER_CHUNK: usize = 1024;

/// Largest accepted shard exponent (65536 shards)
pub const MAX_SHARD_BITS: u32 = 16;

/// Main configuration for a needle map instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Size of one padding unit in the data file.
    /// Byte address of a needle = stored offset * padding_size
    pub padding_size: u64,

    // -------------------------------------------------------------------------
    // Index Log Configuration
    // -------------------------------------------------------------------------
    /// Records read per chunk during replay (chunk = rows * 16 bytes)
    pub rows_per_chunk: usize,

    /// Sync strategy: whether to fsync after each append
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Compact Map Configuration
    // -------------------------------------------------------------------------
    /// log2 of the number of open-addressing shards
    pub shard_bits: u32,

    /// Initial slot count of each shard (rounded up to a power of two)
    pub initial_shard_capacity: usize,
}

/// Index log sync strategy
///
/// Both strategies issue exactly one write per record; neither batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync (data only) after every append
    EveryWrite,

    /// Leave flushing to the operating system
    OsBuffered,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            padding_size: DEFAULT_PADDING_SIZE,
            rows_per_chunk: DEFAULT_ROWS_PER_CHUNK,
            sync_strategy: SyncStrategy::EveryWrite,
            shard_bits: 4,
            initial_shard_capacity: 16,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject values the index cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.padding_size == 0 {
            return Err(NeedleMapError::Config("padding_size must be non-zero".into()));
        }
        if self.rows_per_chunk == 0 {
            return Err(NeedleMapError::Config("rows_per_chunk must be non-zero".into()));
        }
        if self.shard_bits > MAX_SHARD_BITS {
            return Err(NeedleMapError::Config(format!(
                "shard_bits must be at most {}, got {}",
                MAX_SHARD_BITS, self.shard_bits
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the padding unit size (in bytes)
    pub fn padding_size(mut self, size: u64) -> Self {
        self.config.padding_size = size;
        self
    }

    /// Set how many records are read per chunk during replay
    pub fn rows_per_chunk(mut self, rows: usize) -> Self {
        self.config.rows_per_chunk = rows;
        self
    }

    /// Set the index log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set log2 of the compact map shard count
    pub fn shard_bits(mut self, bits: u32) -> Self {
        self.config.shard_bits = bits;
        self
    }

    /// Set the initial slot count of each shard
    pub fn initial_shard_capacity(mut self, slots: usize) -> Self {
        self.config.initial_shard_capacity = slots;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
