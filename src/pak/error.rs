#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

use crate::pak::io::escape_magic;

#[derive(Debug, Error)]
pub enum PakError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("io: {}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "bad {what} magic: expected \"{}\", found \"{}\"",
        escape_magic(expected),
        escape_magic(found)
    )]
    BadMagic {
        what: &'static str,
        expected: [u8; 8],
        found: [u8; 8],
    },

    #[error("unsupported archive version: expected {expected}, found {found}")]
    BadVersion { expected: u32, found: u32 },

    #[error("archive header was never finalized (entry count is 0 but entries follow)")]
    Unfinalized,

    #[error("truncated payload for {}: expected {expected} bytes, got {copied}", path.display())]
    Truncated {
        path: PathBuf,
        expected: u64,
        copied: u64,
    },

    #[error("invalid archive: {0}")]
    Invalid(String),
}

impl PakError {
    /// Wraps an io error with the path it happened on.
    pub fn at(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> PakError {
        let path = path.into();
        move |source| PakError::IoAt { path, source }
    }
}

pub type PakResult<T> = Result<T, PakError>;
