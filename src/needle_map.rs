//! Needle Map Module
//!
//! Coordinates the compact map and the index log.
//!
//! ## Responsibilities
//! - Put/Get/Delete against the compact map, appending one record per mutation
//! - Aggregate counters for space accounting
//! - Rebuild the map and counters on load by replaying the log in order
//!
//! ## Consistency
//! Mutations hit the compact map before the append. A failed append leaves
//! the map ahead of the log until the map is reloaded; the log is the
//! source of truth across restarts.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::compact::{CompactMap, NeedleValue};
use crate::config::Config;
use crate::error::{NeedleMapError, Result};
use crate::index::{walk_index_file, IndexRecord, IndexWriter};

/// Aggregate counters derived from every record ever observed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapMetrics {
    /// Largest key in any record, put or tombstone
    pub maximum_file_key: u64,

    /// Records observed, puts and tombstones
    pub file_counter: u64,

    /// Sum of the size field over all records
    pub file_byte_counter: u64,

    /// Overwrites plus every tombstone, including no-op deletes
    pub deletion_counter: u64,

    /// Sizes removed by overwrites and deletes
    pub deletion_byte_counter: u64,
}

impl MapMetrics {
    fn observe(&mut self, key: u64, size: u32) {
        self.maximum_file_key = self.maximum_file_key.max(key);
        self.file_counter += 1;
        self.file_byte_counter += u64::from(size);
    }

    fn log_put(&mut self, key: u64, old_size: u32, new_size: u32) {
        self.observe(key, new_size);
        if old_size > 0 {
            self.deletion_counter += 1;
            self.deletion_byte_counter += u64::from(old_size);
        }
    }

    fn log_delete(&mut self, key: u64, record_size: u32, deleted_size: u32) {
        self.observe(key, record_size);
        self.deletion_counter += 1;
        self.deletion_byte_counter += u64::from(deleted_size);
    }
}

/// The in-memory needle index backed by an append-only log
///
/// Not internally synchronized: Put/Delete must be serialized by the caller.
pub struct NeedleMap {
    /// Compact key → location map
    map: CompactMap,

    /// Appender for the index log; `None` once closed
    writer: Option<IndexWriter>,

    /// Path of the index log, needed by destroy
    index_path: PathBuf,

    /// Aggregate counters
    metrics: MapMetrics,

    config: Config,
}

impl NeedleMap {
    /// Open or create the index file at `path` and replay it
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        Self::load(file, path, config)
    }

    /// An empty map over `file`, without replaying it
    pub fn new(file: File, path: impl Into<PathBuf>, config: Config) -> Result<Self> {
        config.validate()?;
        let writer = IndexWriter::new(file, config.sync_strategy)?;
        Ok(Self {
            map: CompactMap::from_config(&config),
            writer: Some(writer),
            index_path: path.into(),
            metrics: MapMetrics::default(),
            config,
        })
    }

    /// Rebuild the map and counters by replaying every record of `file` in order
    pub fn load(file: File, path: impl Into<PathBuf>, config: Config) -> Result<Self> {
        let mut nm = Self::new(file, path, config)?;
        let rows = nm.config.rows_per_chunk;
        let padding = nm.config.padding_size;

        let Self {
            map,
            writer,
            metrics,
            ..
        } = &mut nm;
        let file = match writer {
            Some(writer) => writer.file(),
            None => return Err(NeedleMapError::Closed),
        };

        walk_index_file(file, rows, |record| {
            Self::apply(map, metrics, record, padding);
            Ok(())
        })?;

        tracing::debug!(
            path = %nm.index_path.display(),
            max_file_key = nm.metrics.maximum_file_key,
            records = nm.metrics.file_counter,
            live = nm.map.len(),
            "loaded needle map"
        );
        Ok(nm)
    }

    /// One step of the replay fold
    fn apply(map: &mut CompactMap, metrics: &mut MapMetrics, record: IndexRecord, padding: u64) {
        let IndexRecord { key, offset, size } = record;
        if record.is_tombstone() {
            let old_size = map.delete(key);
            tracing::trace!(key, size, old_size, "removing key");
            metrics.log_delete(key, size, old_size);
        } else {
            let old_size = map.set(key, NeedleValue::new(offset, size));
            tracing::trace!(
                key,
                offset = u64::from(offset) * padding,
                size,
                old_size,
                "reading key"
            );
            metrics.log_put(key, old_size, size);
        }
    }

    fn writer_mut(&mut self) -> Result<&mut IndexWriter> {
        self.writer.as_mut().ok_or(NeedleMapError::Closed)
    }

    /// Record a needle location. An overwrite counts as a deletion of the
    /// previous version.
    ///
    /// Offset 0 is reserved for tombstones and is rejected with
    /// `ZeroOffset`; such a record would replay as a delete.
    pub fn put(&mut self, key: u64, offset: u32, size: u32) -> Result<()> {
        if offset == 0 {
            return Err(NeedleMapError::ZeroOffset { key });
        }
        if self.writer.is_none() {
            return Err(NeedleMapError::Closed);
        }
        let old_size = self.map.set(key, NeedleValue::new(offset, size));
        self.metrics.log_put(key, old_size, size);
        self.writer_mut()?
            .append(&IndexRecord::new(key, offset, size))
    }

    /// Look up a needle location
    pub fn get(&self, key: u64) -> Option<NeedleValue> {
        self.map.get(key)
    }

    /// Remove a key and append a tombstone. Deleting an absent key is not
    /// an error and still counts as a deletion event.
    pub fn delete(&mut self, key: u64) -> Result<()> {
        if self.writer.is_none() {
            return Err(NeedleMapError::Closed);
        }
        let deleted = self.map.delete(key);
        self.metrics.log_delete(key, 0, deleted);
        self.writer_mut()?.append(&IndexRecord::tombstone(key))
    }

    /// Release the log handle. Idempotent.
    pub fn close(&mut self) {
        self.writer = None;
    }

    /// Close and remove the index file. Irreversible.
    pub fn destroy(mut self) -> Result<()> {
        self.close();
        fs::remove_file(&self.index_path).map_err(NeedleMapError::Destroy)?;
        tracing::debug!(path = %self.index_path.display(), "destroyed needle index");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Sum of sizes over every record
    pub fn content_size(&self) -> u64 {
        self.metrics.file_byte_counter
    }

    /// Sum of sizes removed by overwrites and deletes
    pub fn deleted_size(&self) -> u64 {
        self.metrics.deletion_byte_counter
    }

    /// Number of records observed
    pub fn file_count(&self) -> u64 {
        self.metrics.file_counter
    }

    /// Number of deletion events
    pub fn deleted_count(&self) -> u64 {
        self.metrics.deletion_counter
    }

    /// Largest key ever observed
    pub fn max_file_key(&self) -> u64 {
        self.metrics.maximum_file_key
    }

    /// Snapshot of all five counters
    pub fn metrics(&self) -> MapMetrics {
        self.metrics
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Visit live entries in ascending key order
    pub fn visit<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(u64, NeedleValue) -> Result<()>,
    {
        self.map.ascending_visit(f)
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Byte size of one padding unit
    pub fn padding_size(&self) -> u64 {
        self.config.padding_size
    }
}

impl std::fmt::Debug for NeedleMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeedleMap")
            .field("index_path", &self.index_path)
            .field("map", &self.map)
            .field("metrics", &self.metrics)
            .field("closed", &self.writer.is_none())
            .finish()
    }
}
