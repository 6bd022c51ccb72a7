#![forbid(unsafe_code)]

mod bindings;
mod config;
mod error;
mod format;
mod hash;
mod io;
mod ops;
mod read;
mod table;
mod walk;
mod write;

pub use bindings::{BindingEmitter, CHeaderEmitter, RustModuleEmitter};
pub use config::{BindingLang, PackConfig, DEFAULT_OUTPUT};
pub use error::{PakError, PakResult};
pub use format::{ArchiveHeader, EntryInfo, SubResourceHeader, MAGIC, SUB_MAGIC, VERSION};
pub use hash::djb2;
pub use read::{ArchiveReader, Entries};
pub use table::{sanitize_name, IdPolicy, LookupEntry, LookupTable, LookupTableBuilder};
pub use walk::{walk, WalkItem};
pub use write::{ArchiveWriter, PackedEntry};

pub use ops::{bindings, entries, extract, list, pack, verify, write_bindings, PackSummary};
