#![forbid(unsafe_code)]

use std::path::PathBuf;

use crate::pak::bindings::{BindingEmitter, CHeaderEmitter, RustModuleEmitter};
use crate::pak::table::IdPolicy;

/// Output file used when none is given.
pub const DEFAULT_OUTPUT: &str = "compiled.src";

/// Language of the generated lookup-table bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BindingLang {
    /// Single-header C library.
    #[default]
    C,
    /// Rust module with constant tables.
    Rust,
}

impl BindingLang {
    pub fn emitter(self, table_name: &str) -> Box<dyn BindingEmitter> {
        match self {
            BindingLang::C => Box::new(CHeaderEmitter::new(table_name)),
            BindingLang::Rust => Box::new(RustModuleEmitter::new(table_name)),
        }
    }
}

/// Everything a pack run needs, passed explicitly instead of living in
/// process globals.
#[derive(Debug, Clone)]
pub struct PackConfig {
    pub target_dir: PathBuf,
    pub output: PathBuf,
    /// Where to write bindings; none are generated when unset.
    pub bindings: Option<PathBuf>,
    pub lang: BindingLang,
    /// Name used for generated symbols. Defaults to the output file stem.
    pub table_name: Option<String>,
    pub id_policy: IdPolicy,
}

impl PackConfig {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            bindings: None,
            lang: BindingLang::default(),
            table_name: None,
            id_policy: IdPolicy::default(),
        }
    }

    pub fn table_name(&self) -> String {
        resolve_table_name(self.table_name.as_deref(), &self.output)
    }
}

/// Explicit name if given, otherwise the archive's file stem, otherwise
/// `"resources"`.
pub fn resolve_table_name(explicit: Option<&str>, archive: &std::path::Path) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| {
            archive
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "resources".to_string())
}
