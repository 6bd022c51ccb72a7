#![forbid(unsafe_code)]

use std::io::{ErrorKind, Read, Write};

use crate::pak::error::PakResult;

/// Size of the transfer buffer used when streaming payloads.
pub const COPY_BUF_LEN: usize = 64 * 1024;

pub fn write_u8(w: &mut dyn Write, v: u8) -> PakResult<()> {
    w.write_all(&[v])?;
    Ok(())
}

pub fn write_u16(w: &mut dyn Write, v: u16) -> PakResult<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn write_u32(w: &mut dyn Write, v: u32) -> PakResult<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn write_u64(w: &mut dyn Write, v: u64) -> PakResult<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub fn write_zeros(w: &mut dyn Write, n: usize) -> PakResult<()> {
    const ZEROS: [u8; 8] = [0; 8];
    w.write_all(&ZEROS[..n])?;
    Ok(())
}

pub fn read_exact<const N: usize>(r: &mut dyn Read) -> PakResult<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u8(r: &mut dyn Read) -> PakResult<u8> {
    Ok(read_exact::<1>(r)?[0])
}

pub fn read_u16(r: &mut dyn Read) -> PakResult<u16> {
    Ok(u16::from_le_bytes(read_exact::<2>(r)?))
}

pub fn read_u32(r: &mut dyn Read) -> PakResult<u32> {
    Ok(u32::from_le_bytes(read_exact::<4>(r)?))
}

pub fn read_u64(r: &mut dyn Read) -> PakResult<u64> {
    Ok(u64::from_le_bytes(read_exact::<8>(r)?))
}

/// Streams up to `len` bytes from `src` into `dst` through a fixed buffer.
///
/// Returns the number of bytes actually copied. Stops early only when `src`
/// reports end of input, so a result smaller than `len` means truncation.
pub fn copy_exact(src: &mut dyn Read, dst: &mut dyn Write, len: u64) -> std::io::Result<u64> {
    let mut buf = vec![0u8; COPY_BUF_LEN];
    let mut remaining = len;
    while remaining != 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = match src.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        dst.write_all(&buf[..n])?;
        remaining -= n as u64;
    }
    Ok(len - remaining)
}

/// Renders a magic tag for error messages, trailing NULs dropped and other
/// non-printable bytes escaped.
pub fn escape_magic(magic: &[u8; 8]) -> String {
    let end = magic.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    magic[..end]
        .iter()
        .flat_map(|&b| std::ascii::escape_default(b))
        .map(char::from)
        .collect()
}
