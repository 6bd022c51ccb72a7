#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use crate::pak::error::{PakError, PakResult};
use crate::pak::format::EntryInfo;

/// What to do when two different names hash to the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// Keep both entries and log a warning.
    #[default]
    Warn,
    /// Fail the build.
    Deny,
}

/// One row of the lookup table handed to binding emitters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntry {
    /// Name as stored in the archive.
    pub name: String,
    /// Constant-friendly form of the file stem, see [`sanitize_name`].
    pub sanitized: String,
    pub id: u32,
    pub offset: u64,
}

/// Frozen, ordered lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    entries: Vec<LookupEntry>,
}

impl LookupTable {
    /// Builds a table from a sequential scan of an existing archive.
    pub fn from_entries(entries: &[EntryInfo], policy: IdPolicy) -> PakResult<Self> {
        let mut builder = LookupTableBuilder::new(policy);
        for e in entries {
            builder.record(&e.name, e.id, e.offset)?;
        }
        builder.finish(entries.len() as u64)
    }

    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn offset_of(&self, index: usize) -> Option<u64> {
        self.entries.get(index).map(|e| e.offset)
    }

    pub fn index_of_id(&self, id: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

/// Accumulates `(name, id, offset)` rows in entry order.
#[derive(Debug, Default)]
pub struct LookupTableBuilder {
    policy: IdPolicy,
    entries: Vec<LookupEntry>,
    by_id: HashMap<u32, Vec<usize>>,
}

impl LookupTableBuilder {
    pub fn new(policy: IdPolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    pub fn record(&mut self, name: &str, id: u32, offset: u64) -> PakResult<()> {
        if let Some(last) = self.entries.last() {
            if offset <= last.offset {
                return Err(PakError::Invalid(format!(
                    "entry offset {offset} for {name} does not follow {} ({})",
                    last.offset, last.name
                )));
            }
        }

        let holders = self.by_id.entry(id).or_default();
        if holders.iter().any(|&i| self.entries[i].name == name) {
            return Err(PakError::Invalid(format!("entry recorded twice: {name}")));
        }
        if let Some(&first) = holders.first() {
            let other = &self.entries[first].name;
            match self.policy {
                IdPolicy::Warn => {
                    warn!(id, first = %other, second = %name, "resource id collision");
                }
                IdPolicy::Deny => {
                    return Err(PakError::Invalid(format!(
                        "resource id collision: {other} and {name} both hash to {id}"
                    )));
                }
            }
        }
        holders.push(self.entries.len());

        self.entries.push(LookupEntry {
            name: name.to_string(),
            sanitized: sanitize_name(name),
            id,
            offset,
        });
        Ok(())
    }

    pub fn finish(self, total_count: u64) -> PakResult<LookupTable> {
        if total_count != self.entries.len() as u64 {
            return Err(PakError::Invalid(format!(
                "lookup table has {} entries, archive declares {total_count}",
                self.entries.len()
            )));
        }
        Ok(LookupTable {
            entries: self.entries,
        })
    }
}

/// Turns a resource path into a constant-style token.
///
/// Takes the file stem, uppercases it, maps `-` and `.` to `_`, turns
/// parentheses into spaces and then trims and collapses whitespace:
/// `"dir/My-File (v2).txt"` becomes `"MY_FILE V2"`.
pub fn sanitize_name(path: &str) -> String {
    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    let mapped: String = stem
        .chars()
        .flat_map(char::to_uppercase)
        .map(|c| match c {
            '-' | '.' => '_',
            '(' | ')' => ' ',
            c => c,
        })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}
