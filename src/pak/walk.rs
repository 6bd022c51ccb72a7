#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::pak::error::{PakError, PakResult};

/// Directories whose name starts with this are not descended into.
pub const SKIP_PREFIX: char = '.';

/// One item discovered by [`walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkItem {
    pub path: PathBuf,
    pub size: u64,
    pub is_dir: bool,
    pub is_file: bool,
}

fn is_skipped_dir(ent: &DirEntry) -> bool {
    ent.depth() > 0
        && ent.file_type().is_dir()
        && ent
            .file_name()
            .to_str()
            .is_some_and(|s| s.starts_with(SKIP_PREFIX))
}

/// Depth-first walk of `root`, siblings in file-name order.
///
/// The root itself is not yielded. Symlinks are not followed.
pub fn walk(root: &Path) -> impl Iterator<Item = PakResult<WalkItem>> {
    WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|ent| !is_skipped_dir(ent))
        .map(|ent| {
            let ent = ent.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                let msg = e.to_string();
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other(msg));
                PakError::IoAt { path, source: io }
            })?;
            let ft = ent.file_type();
            let size = if ft.is_file() {
                ent.metadata()
                    .map_err(|e| {
                        let msg = e.to_string();
                        PakError::IoAt {
                            path: ent.path().to_path_buf(),
                            source: e.into_io_error().unwrap_or_else(|| std::io::Error::other(msg)),
                        }
                    })?
                    .len()
            } else {
                0
            };
            Ok(WalkItem {
                path: ent.into_path(),
                size,
                is_dir: ft.is_dir(),
                is_file: ft.is_file(),
            })
        })
}
