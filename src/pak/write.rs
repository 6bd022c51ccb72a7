#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::pak::error::{PakError, PakResult};
use crate::pak::format::{ArchiveHeader, SubResourceHeader};
use crate::pak::hash::djb2;
use crate::pak::io::copy_exact;
use crate::pak::table::{IdPolicy, LookupTable, LookupTableBuilder};

/// Where and what a single `pack_entry` call wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedEntry {
    pub id: u32,
    /// Absolute offset of the entry's sub-resource header.
    pub offset: u64,
    pub size: u64,
}

/// Two-phase archive builder.
///
/// [`ArchiveWriter::begin`] writes a blank header (entry count 0),
/// [`ArchiveWriter::pack_entry`] appends records strictly sequentially, and
/// [`ArchiveWriter::finish`] seeks back once to patch the real count. `finish`
/// consumes the writer, so the header is patched exactly once and never
/// before the last entry.
pub struct ArchiveWriter<W: Write + Seek> {
    out: W,
    start: u64,
    pos: u64,
    count: u64,
    table: LookupTableBuilder,
    poisoned: bool,
}

impl ArchiveWriter<BufWriter<File>> {
    /// Creates (or truncates) `path` and writes the blank header.
    pub fn create(path: &Path, policy: IdPolicy) -> PakResult<Self> {
        let file = File::create(path).map_err(PakError::at(path))?;
        Self::begin(BufWriter::new(file), policy)
    }

    /// Finishes the archive and closes the file.
    pub fn close(self) -> PakResult<LookupTable> {
        let (out, table) = self.finish()?;
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(table)
    }
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn begin(mut out: W, policy: IdPolicy) -> PakResult<Self> {
        let start = out.stream_position()?;
        ArchiveHeader::new(0).write_to(&mut out)?;
        Ok(Self {
            out,
            start,
            pos: start + ArchiveHeader::SIZE,
            count: 0,
            table: LookupTableBuilder::new(policy),
            poisoned: false,
        })
    }

    /// Appends one record: sub-header, NUL-terminated `name`, then exactly
    /// `size` bytes streamed from `src`.
    ///
    /// The id is the djb2 hash of `name`. If `src` ends before `size` bytes
    /// the archive is left inconsistent and the writer refuses further use.
    pub fn pack_entry(&mut self, name: &str, src: &mut dyn Read, size: u64) -> PakResult<PackedEntry> {
        if self.poisoned {
            return Err(PakError::Invalid("writer failed earlier; archive is incomplete".into()));
        }
        let res = self.pack_entry_inner(name, src, size);
        if res.is_err() {
            self.poisoned = true;
        }
        res
    }

    fn pack_entry_inner(&mut self, name: &str, src: &mut dyn Read, size: u64) -> PakResult<PackedEntry> {
        let name_bytes = name.as_bytes();
        if name_bytes.contains(&0) {
            return Err(PakError::Invalid(format!("name contains NUL: {name:?}")));
        }
        let name_len = u16::try_from(name_bytes.len() + 1)
            .map_err(|_| PakError::Invalid(format!("path too long: {name}")))?;

        let id = djb2(name_bytes);
        let offset = self.pos;
        // Record first: a rejected row must not leave bytes behind.
        self.table.record(name, id, offset)?;

        let header = SubResourceHeader::new(id, size, name_len);
        header.write_to(&mut self.out)?;
        self.out.write_all(name_bytes)?;
        self.out.write_all(&[0])?;

        let copied = copy_exact(src, &mut self.out, size)?;
        if copied != size {
            return Err(PakError::Truncated {
                path: PathBuf::from(name),
                expected: size,
                copied,
            });
        }

        self.pos += header.record_len();
        self.count += 1;
        debug!(name, id, offset, size, "packed entry");

        Ok(PackedEntry { id, offset, size })
    }

    /// Opens `path`, and packs it under its own path string.
    pub fn pack_file(&mut self, path: &Path, size: u64) -> PakResult<PackedEntry> {
        let name = path
            .to_str()
            .ok_or_else(|| PakError::Invalid(format!("path is not utf8: {}", path.display())))?;
        let mut f = File::open(path).map_err(PakError::at(path))?;
        self.pack_entry(name, &mut f, size)
    }

    /// Patches the header with the final entry count and flushes.
    ///
    /// The stream is left just after the header, not at end of file.
    pub fn finish(mut self) -> PakResult<(W, LookupTable)> {
        if self.poisoned {
            return Err(PakError::Invalid("writer failed earlier; archive is incomplete".into()));
        }
        self.out.seek(SeekFrom::Start(self.start))?;
        ArchiveHeader::new(self.count).write_to(&mut self.out)?;
        self.out.flush()?;
        let table = self.table.finish(self.count)?;
        Ok((self.out, table))
    }
}
