//! Index Reader
//!
//! Scans an index log from byte 0 in fixed-size chunks using positional
//! reads, so a scan never touches the file cursor used by the appender.

use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;

use crate::config::DEFAULT_ROWS_PER_CHUNK;
use crate::error::{NeedleMapError, Result};

use super::{IndexRecord, RECORD_SIZE};

/// Positional read source.
///
/// Implementations must not depend on or move any shared cursor.
pub trait ReadAt {
    /// Read into `buf` starting at `offset`; `Ok(0)` means end of file
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

impl ReadAt for File {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        FileExt::read_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        FileExt::seek_read(self, buf, offset)
    }
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.len());
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

/// Walk every complete record in file order, stopping at the first error
/// returned by `f`.
pub fn walk_index_file<R, F>(source: &R, rows_per_chunk: usize, mut f: F) -> Result<()>
where
    R: ReadAt + ?Sized,
    F: FnMut(IndexRecord) -> Result<()>,
{
    IndexRecords::new(source, rows_per_chunk).try_for_each(|record| f(record?))
}

/// Reads records from an index source
pub struct IndexReader<R> {
    source: R,
    rows_per_chunk: usize,
}

impl IndexReader<File> {
    /// Open an index file read-only
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: ReadAt> IndexReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_rows_per_chunk(source, DEFAULT_ROWS_PER_CHUNK)
    }

    pub fn with_rows_per_chunk(source: R, rows_per_chunk: usize) -> Self {
        Self {
            source,
            rows_per_chunk: rows_per_chunk.max(1),
        }
    }

    /// Start a fresh scan from byte 0
    pub fn records(&self) -> IndexRecords<'_, R> {
        IndexRecords::new(&self.source, self.rows_per_chunk)
    }

    /// Fold `f` over every record, see [`walk_index_file`]
    pub fn walk<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(IndexRecord) -> Result<()>,
    {
        walk_index_file(&self.source, self.rows_per_chunk, f)
    }
}

/// Lazy iterator over the records of one scan.
///
/// Yields `Err` at most once (on a read failure) and then ends.
pub struct IndexRecords<'a, R: ?Sized> {
    source: &'a R,
    chunk: Vec<u8>,
    filled: usize,
    pos: usize,
    file_offset: u64,
    eof: bool,
    done: bool,
    trailing_bytes: usize,
}

impl<'a, R: ReadAt + ?Sized> IndexRecords<'a, R> {
    pub fn new(source: &'a R, rows_per_chunk: usize) -> Self {
        Self {
            source,
            chunk: vec![0u8; rows_per_chunk.max(1) * RECORD_SIZE],
            filled: 0,
            pos: 0,
            file_offset: 0,
            eof: false,
            done: false,
            trailing_bytes: 0,
        }
    }

    /// Bytes of an incomplete final record dropped at end of file
    pub fn trailing_bytes(&self) -> usize {
        self.trailing_bytes
    }

    /// Fill the chunk buffer until it is full or the source hits EOF
    fn fill_chunk(&mut self) -> Result<()> {
        self.filled = 0;
        self.pos = 0;
        while self.filled < self.chunk.len() {
            match self
                .source
                .read_at(&mut self.chunk[self.filled..], self.file_offset)
            {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => {
                    self.filled += n;
                    self.file_offset += n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(NeedleMapError::Read(e)),
            }
        }
        tracing::trace!(
            file_offset = self.file_offset,
            count = self.filled,
            eof = self.eof,
            "read index chunk"
        );
        Ok(())
    }
}

impl<'a, R: ReadAt + ?Sized> Iterator for IndexRecords<'a, R> {
    type Item = Result<IndexRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if self.pos + RECORD_SIZE <= self.filled {
                let record = IndexRecord::decode(&self.chunk[self.pos..self.pos + RECORD_SIZE]);
                self.pos += RECORD_SIZE;
                return Some(record);
            }

            if self.eof {
                self.trailing_bytes = self.filled - self.pos;
                if self.trailing_bytes > 0 {
                    tracing::warn!(
                        trailing_bytes = self.trailing_bytes,
                        "discarding partial record at end of index"
                    );
                }
                self.done = true;
                return None;
            }

            if let Err(e) = self.fill_chunk() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}
