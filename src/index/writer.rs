//! Index Writer
//!
//! Handles appending records to the index log file.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::SyncStrategy;
use crate::error::{NeedleMapError, Result};

use super::{IndexRecord, RECORD_SIZE};

/// Append one encoded record with a single write call.
///
/// No buffering: the record either reaches the writer in full or the call
/// fails with `Append` / `ShortAppend`.
pub fn append_record<W: Write>(writer: &mut W, record: &IndexRecord) -> Result<()> {
    let bytes = record.encode();
    let written = loop {
        match writer.write(&bytes) {
            Ok(n) => break n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(NeedleMapError::Append(e)),
        }
    };
    if written != RECORD_SIZE {
        return Err(NeedleMapError::ShortAppend { written });
    }
    Ok(())
}

/// Appends records to the end of an index log file
#[derive(Debug)]
pub struct IndexWriter {
    file: File,
    sync_strategy: SyncStrategy,
    appended: u64,
}

impl IndexWriter {
    /// Open or create an index file for appending
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        Self::new(file, sync_strategy)
    }

    /// Wrap an already-open handle; the cursor is moved to end of file
    pub fn new(mut file: File, sync_strategy: SyncStrategy) -> Result<Self> {
        file.seek(SeekFrom::End(0))?;
        Ok(Self {
            file,
            sync_strategy,
            appended: 0,
        })
    }

    /// Append a record, syncing afterwards if configured to
    pub fn append(&mut self, record: &IndexRecord) -> Result<()> {
        append_record(&mut self.file, record)?;
        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.file.sync_data().map_err(NeedleMapError::Append)?;
        }
        self.appended += 1;
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    /// Records appended through this writer since it was opened
    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}
