#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use crate::pak::config::{resolve_table_name, BindingLang, PackConfig};
use crate::pak::error::{PakError, PakResult};
use crate::pak::format::EntryInfo;
use crate::pak::hash::djb2;
use crate::pak::read::ArchiveReader;
use crate::pak::table::{IdPolicy, LookupTable};
use crate::pak::walk::walk;
use crate::pak::write::ArchiveWriter;

/// Result of a successful [`pack`] run.
#[derive(Debug)]
pub struct PackSummary {
    pub entry_count: u64,
    pub archive_len: u64,
    pub table: LookupTable,
}

/// Packs every regular file under `cfg.target_dir` into `cfg.output`, then
/// writes bindings if requested.
///
/// On failure the partially written archive is left in place; its header
/// still declares zero entries, so readers reject it.
pub fn pack(cfg: &PackConfig) -> PakResult<PackSummary> {
    if !cfg.target_dir.is_dir() {
        return Err(PakError::Invalid(format!(
            "target is not a directory: {}",
            cfg.target_dir.display()
        )));
    }

    let mut writer = ArchiveWriter::create(&cfg.output, cfg.id_policy)?;
    let output_abs = cfg.output.canonicalize().map_err(PakError::at(&cfg.output))?;

    for item in walk(&cfg.target_dir) {
        let item = item?;
        if item.is_dir {
            debug!(path = %item.path.display(), "found directory");
            continue;
        }
        if !item.is_file {
            debug!(path = %item.path.display(), "skipping non-regular file");
            continue;
        }
        if item.path.file_name() == output_abs.file_name()
            && item.path.canonicalize().ok().as_deref() == Some(output_abs.as_path())
        {
            warn!(path = %item.path.display(), "skipping the archive being written");
            continue;
        }

        info!(path = %item.path.display(), size = item.size, "packing");
        let entry = writer.pack_file(&item.path, item.size)?;
        debug!(id = entry.id, offset = entry.offset, "id assigned");
    }

    let table = writer.close()?;
    let archive_len = std::fs::metadata(&cfg.output)
        .map_err(PakError::at(&cfg.output))?
        .len();
    info!("Packaged {} files", table.len());

    if let Some(path) = &cfg.bindings {
        write_bindings(&table, path, cfg.lang, &cfg.table_name())?;
    }

    Ok(PackSummary {
        entry_count: table.len() as u64,
        archive_len,
        table,
    })
}

/// Renders `table` to `path` with the emitter for `lang`.
pub fn write_bindings(table: &LookupTable, path: &Path, lang: BindingLang, table_name: &str) -> PakResult<()> {
    let emitter = lang.emitter(table_name);
    let f = File::create(path).map_err(PakError::at(path))?;
    let mut out = BufWriter::new(f);
    emitter.emit(table, &mut out)?;
    out.flush().map_err(PakError::at(path))?;
    info!(path = %path.display(), entries = table.len(), "wrote bindings");
    Ok(())
}

/// Sequentially scans an archive (without extracting payloads).
pub fn entries(archive: &Path) -> PakResult<Vec<EntryInfo>> {
    let mut r = ArchiveReader::open_file(archive)?;
    let out = r.entries().collect::<PakResult<Vec<_>>>()?;
    Ok(out)
}

pub fn list(archive: &Path, verbose: bool) -> PakResult<()> {
    let mut r = ArchiveReader::open_file(archive)?;
    let infos = r.entries().collect::<PakResult<Vec<_>>>()?;

    for e in &infos {
        if verbose {
            r.seek_to_entry(e.offset)?;
            r.read_entry_info()?;
            let mut hasher = blake3::Hasher::new();
            r.copy_payload(e, &mut hasher)?;
            println!(
                "{}  id=0x{:08x} off={} size={} blake3={}",
                e.name,
                e.id,
                e.offset,
                e.size,
                hasher.finalize().to_hex()
            );
        } else {
            println!("{}", e.name);
        }
    }
    Ok(())
}

/// Full integrity sweep: header, every record, ids, bounds, no trailing
/// bytes. Returns the number of entries.
pub fn verify(archive: &Path) -> PakResult<u64> {
    let mut r = ArchiveReader::open_file(archive)?;
    let infos = r.entries().collect::<PakResult<Vec<_>>>()?;

    for e in &infos {
        let expected = djb2(e.name.as_bytes());
        if e.id != expected {
            return Err(PakError::Invalid(format!(
                "id mismatch for {}: stored 0x{:08x}, path hashes to 0x{expected:08x}",
                e.name, e.id
            )));
        }
        if e.flags != 0 {
            warn!(name = %e.name, flags = e.flags, "reserved flags are set");
        }
    }

    let end = match infos.last() {
        Some(last) => last.end_offset()?,
        None => r.first_entry_offset(),
    };
    if end != r.end_offset() {
        return Err(PakError::Invalid(format!(
            "{} trailing bytes after the last entry",
            r.end_offset().saturating_sub(end)
        )));
    }

    println!("ok: {} entries", infos.len());
    Ok(infos.len() as u64)
}

/// Maps a stored name onto a path below `root`, dropping root, prefix and
/// parent components so extraction cannot escape `root`.
fn extract_path(root: &Path, name: &str) -> PakResult<PathBuf> {
    let rel: PathBuf = Path::new(name)
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s),
            _ => None,
        })
        .collect();
    if rel.as_os_str().is_empty() {
        return Err(PakError::Invalid(format!("cannot extract entry named {name:?}")));
    }
    Ok(root.join(rel))
}

pub fn extract(archive: &Path, output: &Path, filter: &[String]) -> PakResult<u64> {
    let mut r = ArchiveReader::open_file(archive)?;
    let infos = r.entries().collect::<PakResult<Vec<_>>>()?;
    std::fs::create_dir_all(output).map_err(PakError::at(output))?;

    let mut written = 0;
    for e in &infos {
        if !filter.is_empty() && !filter.iter().any(|s| e.name.contains(s.as_str())) {
            continue;
        }

        let out_path = extract_path(output, &e.name)?;
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(PakError::at(parent))?;
        }

        r.seek_to_entry(e.offset)?;
        r.read_entry_info()?;
        let f = File::create(&out_path).map_err(PakError::at(&out_path))?;
        let mut out = BufWriter::new(f);
        r.copy_payload(e, &mut out)?;
        out.flush().map_err(PakError::at(&out_path))?;
        debug!(name = %e.name, path = %out_path.display(), "extracted");
        written += 1;
    }

    info!("Extracted {written} files");
    Ok(written)
}

/// Regenerates bindings for an existing archive.
pub fn bindings(archive: &Path, output: &Path, lang: BindingLang, table_name: Option<&str>) -> PakResult<()> {
    let infos = entries(archive)?;
    let table = LookupTable::from_entries(&infos, IdPolicy::Warn)?;
    write_bindings(&table, output, lang, &resolve_table_name(table_name, archive))
}
