#![forbid(unsafe_code)]

use std::io::{Read, Write};

use crate::pak::error::{PakError, PakResult};
use crate::pak::io::{
    read_exact, read_u16, read_u32, read_u64, read_u8, write_u16, write_u32, write_u64, write_u8,
    write_zeros,
};

/// Archive header magic.
pub const MAGIC: [u8; 8] = *b"SRCDATA\0";

/// Sub-resource header magic.
pub const SUB_MAGIC: [u8; 8] = *b"SUBDATA\0";

/// Current archive format version.
pub const VERSION: u32 = 1;

/// Archive header layout (little-endian, 24 bytes):
/// - [MAGIC 8]
/// - [u32 version]
/// - [pad 4]
/// - [u64 entry_count]
///
/// The padding keeps the layout identical to the natural 64-bit C layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub magic: [u8; 8],
    pub version: u32,
    pub entry_count: u64,
}

impl ArchiveHeader {
    pub const SIZE: u64 = 24;

    pub fn new(entry_count: u64) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            entry_count,
        }
    }

    /// True iff magic and version are the ones this build writes.
    pub fn validate(&self) -> bool {
        self.magic == MAGIC && self.version == VERSION
    }

    pub fn ensure_valid(&self) -> PakResult<()> {
        if self.magic != MAGIC {
            return Err(PakError::BadMagic {
                what: "archive",
                expected: MAGIC,
                found: self.magic,
            });
        }
        if self.version != VERSION {
            return Err(PakError::BadVersion {
                expected: VERSION,
                found: self.version,
            });
        }
        Ok(())
    }

    pub fn write_to(&self, w: &mut dyn Write) -> PakResult<()> {
        w.write_all(&self.magic)?;
        write_u32(w, self.version)?;
        write_zeros(w, 4)?;
        write_u64(w, self.entry_count)?;
        Ok(())
    }

    pub fn read_from(r: &mut dyn Read) -> PakResult<Self> {
        let magic = read_exact::<8>(r)?;
        let version = read_u32(r)?;
        let _pad = read_exact::<4>(r)?;
        let entry_count = read_u64(r)?;
        Ok(Self {
            magic,
            version,
            entry_count,
        })
    }
}

/// Sub-resource header layout (little-endian, 32 bytes):
/// - [SUB_MAGIC 8]
/// - [u32 id]
/// - [pad 4]
/// - [u64 resource_size]
/// - [u16 name_len] (includes the NUL terminator)
/// - [u8 flags]
/// - [pad 5]
///
/// followed by `name_len` name bytes and `resource_size` payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubResourceHeader {
    pub magic: [u8; 8],
    pub id: u32,
    pub resource_size: u64,
    pub name_len: u16,
    pub flags: u8,
}

impl SubResourceHeader {
    pub const SIZE: u64 = 32;

    pub fn new(id: u32, resource_size: u64, name_len: u16) -> Self {
        Self {
            magic: SUB_MAGIC,
            id,
            resource_size,
            name_len,
            flags: 0,
        }
    }

    pub fn validate(&self) -> bool {
        self.magic == SUB_MAGIC
    }

    pub fn ensure_valid(&self) -> PakResult<()> {
        if !self.validate() {
            return Err(PakError::BadMagic {
                what: "sub-resource",
                expected: SUB_MAGIC,
                found: self.magic,
            });
        }
        Ok(())
    }

    /// Total bytes this record occupies, header included.
    pub fn record_len(&self) -> u64 {
        Self::SIZE + u64::from(self.name_len) + self.resource_size
    }

    pub fn write_to(&self, w: &mut dyn Write) -> PakResult<()> {
        w.write_all(&self.magic)?;
        write_u32(w, self.id)?;
        write_zeros(w, 4)?;
        write_u64(w, self.resource_size)?;
        write_u16(w, self.name_len)?;
        write_u8(w, self.flags)?;
        write_zeros(w, 5)?;
        Ok(())
    }

    pub fn read_from(r: &mut dyn Read) -> PakResult<Self> {
        let magic = read_exact::<8>(r)?;
        let id = read_u32(r)?;
        let _pad = read_exact::<4>(r)?;
        let resource_size = read_u64(r)?;
        let name_len = read_u16(r)?;
        let flags = read_u8(r)?;
        let _pad = read_exact::<5>(r)?;
        Ok(Self {
            magic,
            id,
            resource_size,
            name_len,
            flags,
        })
    }
}

/// Public view of an archive entry (listings, verification, bindings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Absolute offset of the entry's sub-resource header.
    pub offset: u64,
    pub id: u32,
    /// Stored name, terminator stripped.
    pub name: String,
    pub size: u64,
    pub flags: u8,
}

impl EntryInfo {
    /// Absolute offset of the first payload byte.
    pub fn payload_offset(&self) -> PakResult<u64> {
        self.offset
            .checked_add(SubResourceHeader::SIZE + self.name.len() as u64 + 1)
            .ok_or_else(|| self.out_of_range())
    }

    /// Absolute offset one past the last payload byte.
    pub fn end_offset(&self) -> PakResult<u64> {
        self.payload_offset()?
            .checked_add(self.size)
            .ok_or_else(|| self.out_of_range())
    }

    fn out_of_range(&self) -> PakError {
        PakError::Invalid(format!(
            "entry {} at offset {} declares size {} past any stream end",
            self.name, self.offset, self.size
        ))
    }
}
