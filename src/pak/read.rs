#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::pak::error::{PakError, PakResult};
use crate::pak::format::{ArchiveHeader, EntryInfo, SubResourceHeader};
use crate::pak::io::copy_exact;

/// Random-access reader over a finished archive.
///
/// Offsets are absolute stream positions, exactly as the writer recorded
/// them into the lookup table.
pub struct ArchiveReader<R: Read + Seek> {
    inner: R,
    start: u64,
    len: u64,
    header: ArchiveHeader,
}

impl ArchiveReader<BufReader<File>> {
    pub fn open_file(path: &Path) -> PakResult<Self> {
        let f = File::open(path).map_err(PakError::at(path))?;
        Self::open(BufReader::new(f))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Reads and validates the archive header at the current position.
    ///
    /// Rejects headers with a foreign magic or version, and headers whose
    /// entry count was never patched (count 0 with records following).
    pub fn open(mut inner: R) -> PakResult<Self> {
        let start = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(start))?;

        let header = ArchiveHeader::read_from(&mut inner)?;
        header.ensure_valid()?;
        if header.entry_count == 0 && len > start + ArchiveHeader::SIZE {
            return Err(PakError::Unfinalized);
        }

        Ok(Self {
            inner,
            start,
            len,
            header,
        })
    }

    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    pub fn entry_count(&self) -> u64 {
        self.header.entry_count
    }

    /// Offset of the first sub-resource header.
    pub fn first_entry_offset(&self) -> u64 {
        self.start + ArchiveHeader::SIZE
    }

    /// Offset one past the last byte of the stream.
    pub fn end_offset(&self) -> u64 {
        self.len
    }

    pub fn position(&mut self) -> PakResult<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Re-reads the archive header without validating it.
    pub fn read_header(&mut self) -> PakResult<ArchiveHeader> {
        self.inner.seek(SeekFrom::Start(self.start))?;
        ArchiveHeader::read_from(&mut self.inner)
    }

    /// Jumps to an entry offset taken from a lookup table.
    pub fn seek_to_entry(&mut self, offset: u64) -> PakResult<()> {
        let fits = offset
            .checked_add(SubResourceHeader::SIZE)
            .is_some_and(|end| end <= self.len);
        if offset < self.first_entry_offset() || !fits {
            return Err(PakError::Invalid(format!(
                "entry offset {offset} outside archive ({} bytes)",
                self.len
            )));
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Reads a sub-resource header at the current position without
    /// validating it.
    pub fn read_sub_header(&mut self) -> PakResult<SubResourceHeader> {
        SubResourceHeader::read_from(&mut self.inner)
    }

    /// Reads the NUL-terminated name following `sub`.
    pub fn read_name(&mut self, sub: &SubResourceHeader) -> PakResult<String> {
        if sub.name_len == 0 {
            return Err(PakError::Invalid(format!("entry {} has an empty name field", sub.id)));
        }
        let mut buf = vec![0u8; usize::from(sub.name_len)];
        self.inner.read_exact(&mut buf)?;
        if buf.pop() != Some(0) {
            return Err(PakError::Invalid(format!("name of entry {} is not NUL-terminated", sub.id)));
        }
        String::from_utf8(buf)
            .map_err(|_| PakError::Invalid(format!("name of entry {} is not utf8", sub.id)))
    }

    /// End offset of `info`'s payload, checked against the stream length.
    fn payload_end(&self, info: &EntryInfo) -> PakResult<u64> {
        let end = info.end_offset()?;
        if end > self.len {
            return Err(PakError::Truncated {
                path: PathBuf::from(&info.name),
                expected: info.size,
                copied: self.len.saturating_sub(info.payload_offset()?),
            });
        }
        Ok(end)
    }

    /// Streams the payload following the name into `dst`.
    pub fn copy_payload(&mut self, info: &EntryInfo, dst: &mut dyn Write) -> PakResult<u64> {
        self.payload_end(info)?;
        let copied = copy_exact(&mut self.inner, dst, info.size)?;
        if copied != info.size {
            return Err(PakError::Truncated {
                path: PathBuf::from(&info.name),
                expected: info.size,
                copied,
            });
        }
        Ok(copied)
    }

    pub fn read_payload(&mut self, info: &EntryInfo) -> PakResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(info.size.min(1 << 20) as usize);
        self.copy_payload(info, &mut buf)?;
        Ok(buf)
    }

    /// Seeks past the payload, failing if it would run off the end.
    pub fn skip_payload(&mut self, info: &EntryInfo) -> PakResult<()> {
        let end = self.payload_end(info)?;
        self.inner.seek(SeekFrom::Start(end))?;
        Ok(())
    }

    /// Reads and validates the sub-header and name at the current position,
    /// leaving the stream at the first payload byte.
    pub fn read_entry_info(&mut self) -> PakResult<EntryInfo> {
        let offset = self.inner.stream_position()?;
        let sub = self.read_sub_header()?;
        sub.ensure_valid()?;
        let name = self.read_name(&sub)?;
        Ok(EntryInfo {
            offset,
            id: sub.id,
            name,
            size: sub.resource_size,
            flags: sub.flags,
        })
    }

    /// Random access: seek to `offset`, validate, and read the whole entry.
    pub fn read_entry_at(&mut self, offset: u64) -> PakResult<(EntryInfo, Vec<u8>)> {
        self.seek_to_entry(offset)?;
        let info = self.read_entry_info()?;
        let data = self.read_payload(&info)?;
        Ok((info, data))
    }

    /// Sequential scan over all entries from the first one.
    ///
    /// Payloads are skipped; the iterator stops after the first error.
    pub fn entries(&mut self) -> Entries<'_, R> {
        Entries {
            next: self.first_entry_offset(),
            remaining: self.header.entry_count,
            reader: self,
            failed: false,
        }
    }
}

pub struct Entries<'a, R: Read + Seek> {
    reader: &'a mut ArchiveReader<R>,
    next: u64,
    remaining: u64,
    failed: bool,
}

impl<R: Read + Seek> Entries<'_, R> {
    fn step(&mut self) -> PakResult<EntryInfo> {
        self.reader.seek_to_entry(self.next)?;
        let info = self.reader.read_entry_info()?;
        self.reader.skip_payload(&info)?;
        // end_offset is checked, so the next record always lies past this one
        self.next = info.end_offset()?;
        Ok(info)
    }
}

impl<R: Read + Seek> Iterator for Entries<'_, R> {
    type Item = PakResult<EntryInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let res = self.step();
        if res.is_err() {
            self.failed = true;
        }
        Some(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pak::format::MAGIC;
    use crate::pak::hash::djb2;
    use crate::pak::table::{IdPolicy, LookupTable};
    use crate::pak::write::ArchiveWriter;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn build(entries: &[(String, Vec<u8>)]) -> (Vec<u8>, LookupTable) {
        let mut w = ArchiveWriter::begin(Cursor::new(Vec::new()), IdPolicy::Warn).unwrap();
        for (name, data) in entries {
            w.pack_entry(name, &mut data.as_slice(), data.len() as u64)
                .unwrap();
        }
        let (out, table) = w.finish().unwrap();
        (out.into_inner(), table)
    }

    fn sample() -> Vec<(String, Vec<u8>)> {
        vec![
            ("res/a.txt".into(), b"abc".to_vec()),
            ("res/sub/b.txt".into(), Vec::new()),
            ("res/c.bin".into(), (0..=255u8).cycle().take(70_000).collect()),
        ]
    }

    #[test]
    fn sequential_scan_round_trips() {
        let input = sample();
        let (bytes, _) = build(&input);

        let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(r.entry_count(), 3);
        let infos: Vec<EntryInfo> = r.entries().collect::<PakResult<_>>().unwrap();
        let got: Vec<(String, u64)> = infos.iter().map(|e| (e.name.clone(), e.size)).collect();
        let want: Vec<(String, u64)> = input
            .iter()
            .map(|(n, d)| (n.clone(), d.len() as u64))
            .collect();
        assert_eq!(got, want);
        assert_eq!(r.position().unwrap(), r.end_offset());

        for (info, (_, data)) in infos.iter().zip(&input) {
            let (again, payload) = r.read_entry_at(info.offset).unwrap();
            assert_eq!(&again, info);
            assert_eq!(&payload, data);
        }
    }

    #[test]
    fn table_offsets_point_at_valid_entries() {
        let (bytes, table) = build(&sample());
        let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        for row in table.entries().iter().rev() {
            r.seek_to_entry(row.offset).unwrap();
            let sub = r.read_sub_header().unwrap();
            assert!(sub.validate());
            assert_eq!(sub.id, row.id);
            assert_eq!(r.read_name(&sub).unwrap(), row.name);
        }
    }

    #[test]
    fn ids_match_path_hash() {
        let (bytes, _) = build(&sample());
        let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        for info in r.entries() {
            let info = info.unwrap();
            assert_eq!(info.id, djb2(info.name.as_bytes()));
            assert_eq!(info.flags, 0);
        }
    }

    #[test]
    fn rejects_foreign_magic() {
        let (mut bytes, _) = build(&sample());
        bytes[0] = b'X';
        let err = ArchiveReader::open(Cursor::new(bytes)).err().unwrap();
        assert!(matches!(err, PakError::BadMagic { what: "archive", .. }));
        assert!(err.to_string().contains("XRCDATA"));
    }

    #[test]
    fn rejects_other_version() {
        let (mut bytes, _) = build(&sample());
        bytes[8..12].copy_from_slice(&2u32.to_le_bytes());
        let err = ArchiveReader::open(Cursor::new(bytes)).err().unwrap();
        assert!(matches!(err, PakError::BadVersion { found: 2, .. }));
    }

    #[test]
    fn rejects_unpatched_header() {
        let (mut bytes, _) = build(&sample());
        bytes[16..24].copy_from_slice(&0u64.to_le_bytes());
        let err = ArchiveReader::open(Cursor::new(bytes)).err().unwrap();
        assert!(matches!(err, PakError::Unfinalized));
    }

    #[test]
    fn empty_archive_opens() {
        let (bytes, _) = build(&[]);
        let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(r.entries().count(), 0);
        assert_eq!(&r.read_header().unwrap().magic, &MAGIC);
    }

    #[test]
    fn corrupt_sub_magic_stops_scan() {
        let (mut bytes, table) = build(&sample());
        let second = table.entries()[1].offset as usize;
        bytes[second] = b'X';
        let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        let results: Vec<_> = r.entries().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(PakError::BadMagic {
                what: "sub-resource",
                ..
            })
        ));
    }

    #[test]
    fn missing_terminator_is_rejected() {
        let (mut bytes, table) = build(&sample());
        let first = table.entries()[0].offset as usize;
        let term = first + SubResourceHeader::SIZE as usize + "res/a.txt".len();
        bytes[term] = b'!';
        let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        let err = r.read_entry_at(first as u64).unwrap_err();
        assert!(err.to_string().contains("NUL"));
    }

    #[test]
    fn truncated_archive_is_detected() {
        let (mut bytes, _) = build(&sample());
        bytes.truncate(bytes.len() - 10);
        let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        let err = r.entries().find_map(Result::err).unwrap();
        assert!(matches!(err, PakError::Truncated { .. }));
    }

    #[test]
    fn seek_outside_archive_fails() {
        let (bytes, _) = build(&sample());
        let len = bytes.len() as u64;
        let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        assert!(r.seek_to_entry(0).is_err());
        assert!(r.seek_to_entry(len).is_err());
        assert!(r.seek_to_entry(len - SubResourceHeader::SIZE + 1).is_err());
        assert!(r.seek_to_entry(u64::MAX - 4).is_err());
        assert!(r.seek_to_entry(u64::MAX).is_err());
    }

    /// Overwrites the `resource_size` field of the record at `at`.
    fn set_size(bytes: &mut [u8], at: usize, size: u64) {
        bytes[at + 16..at + 24].copy_from_slice(&size.to_le_bytes());
    }

    #[test]
    fn huge_resource_size_fails_the_scan() {
        let (mut bytes, table) = build(&sample());
        let first = table.entries()[0].offset as usize;
        set_size(&mut bytes, first, u64::MAX);
        let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();

        let results: Vec<_> = r.entries().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(PakError::Invalid(_))));

        assert!(r.read_entry_at(first as u64).is_err());
    }

    #[test]
    fn resource_size_past_end_is_truncation() {
        let (mut bytes, table) = build(&sample());
        let len = bytes.len() as u64;
        let first = table.entries()[0].offset as usize;
        set_size(&mut bytes, first, len);
        let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();

        let err = r.entries().find_map(Result::err).unwrap();
        assert!(matches!(err, PakError::Truncated { expected, .. } if expected == len));

        let err = r.read_entry_at(first as u64).unwrap_err();
        assert!(matches!(err, PakError::Truncated { .. }));
    }

    #[test]
    fn empty_name_field_is_rejected() {
        let (mut bytes, table) = build(&sample());
        let first = table.entries()[0].offset as usize;
        bytes[first + 24..first + 26].copy_from_slice(&0u16.to_le_bytes());
        let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();

        r.seek_to_entry(first as u64).unwrap();
        let sub = r.read_sub_header().unwrap();
        assert_eq!(sub.name_len, 0);
        let err = r.read_name(&sub).unwrap_err();
        assert!(err.to_string().contains("empty name"));
        assert!(r.entries().next().unwrap().is_err());
    }

    proptest! {
        #[test]
        fn packed_payloads_read_back(
            files in proptest::collection::vec(
                ("[a-z]{1,12}", proptest::collection::vec(any::<u8>(), 0..512)),
                0..8,
            )
        ) {
            let input: Vec<(String, Vec<u8>)> = files
                .into_iter()
                .enumerate()
                .map(|(i, (n, d))| (format!("res/{i}/{n}.bin"), d))
                .collect();
            let (bytes, table) = build(&input);
            let mut r = ArchiveReader::open(Cursor::new(bytes)).unwrap();
            prop_assert_eq!(r.entry_count(), input.len() as u64);
            for (row, (name, data)) in table.entries().iter().zip(&input) {
                let (info, payload) = r.read_entry_at(row.offset).unwrap();
                prop_assert_eq!(&info.name, name);
                prop_assert_eq!(&payload, data);
            }
        }
    }
}
