#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::io::Write;

use crate::pak::error::PakResult;
use crate::pak::table::{LookupEntry, LookupTable};

/// Renders a lookup table as source code for some consumer language.
pub trait BindingEmitter {
    /// Conventional file extension of the generated source.
    fn extension(&self) -> &'static str;

    fn emit(&self, table: &LookupTable, out: &mut dyn Write) -> PakResult<()>;
}

/// Maps a sanitized resource name to an identifier: ASCII letters, digits and
/// `_` are kept, everything else becomes `_`.
fn ident_part(sanitized: &str) -> String {
    let s: String = sanitized
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if s.is_empty() {
        "RESOURCE".to_string()
    } else {
        s
    }
}

/// One unique identifier per entry, in table order. Clashes get `_2`, `_3`...
fn unique_idents(entries: &[LookupEntry], reserved: &[&str], leading_digit_ok: bool) -> Vec<String> {
    let mut seen: HashSet<String> = reserved.iter().map(|s| s.to_string()).collect();
    entries
        .iter()
        .map(|e| {
            let mut base = ident_part(&e.sanitized);
            if !leading_digit_ok && base.starts_with(|c: char| c.is_ascii_digit()) {
                base.insert(0, '_');
            }
            let mut candidate = base.clone();
            let mut n = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}

fn c_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            b'?' => out.push_str("\\?"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => out.push_str(&format!("\\{b:03o}")),
        }
    }
    out
}

/// Single-header C library with an id enumeration and name, id and offset
/// tables. Define `SRC_RESOURCE_<TABLE>_IMPLEMENTATION` in exactly one
/// translation unit.
pub struct CHeaderEmitter {
    lower: String,
    upper: String,
}

impl CHeaderEmitter {
    pub fn new(table_name: &str) -> Self {
        let upper = ident_part(&table_name.to_uppercase());
        Self {
            lower: upper.to_lowercase(),
            upper,
        }
    }
}

impl BindingEmitter for CHeaderEmitter {
    fn extension(&self) -> &'static str {
        "h"
    }

    fn emit(&self, table: &LookupTable, out: &mut dyn Write) -> PakResult<()> {
        let (lo, up) = (&self.lower, &self.upper);
        let entries = table.entries();
        let count = format!("SRC_{up}_COUNT");
        let idents = unique_idents(entries, &["COUNT"], true);

        writeln!(out, "/* Generated by srcpak. Do not edit. */")?;
        writeln!(out, "#ifndef SRC_RESOURCE_{up}_H")?;
        writeln!(out, "#define SRC_RESOURCE_{up}_H")?;
        writeln!(out)?;
        writeln!(out, "#include <stddef.h>")?;
        writeln!(out, "#include <stdint.h>")?;
        writeln!(out)?;
        writeln!(out, "#ifdef __cplusplus")?;
        writeln!(out, "extern \"C\" {{")?;
        writeln!(out, "#endif")?;
        writeln!(out)?;
        writeln!(out, "typedef enum SRC_RESOURCE_{up}_ID {{")?;
        for (i, ident) in idents.iter().enumerate() {
            writeln!(out, "    SRC_{up}_{ident} = {i},")?;
        }
        writeln!(out, "    {count} = {}", entries.len())?;
        writeln!(out, "}} SRC_RESOURCE_{up}_ID;")?;
        writeln!(out)?;
        writeln!(out, "const char* src_get_{lo}_resource_name(int32_t index);")?;
        writeln!(out, "uint32_t src_get_{lo}_resource_id(int32_t index);")?;
        writeln!(out, "size_t src_get_{lo}_resource_offset(int32_t index);")?;
        writeln!(out)?;
        writeln!(out, "#ifdef SRC_RESOURCE_{up}_IMPLEMENTATION")?;
        writeln!(out)?;

        // Each table carries a trailing sentinel so it is never empty.
        writeln!(out, "static const char* const src_{lo}_names[{count} + 1] = {{")?;
        for e in entries {
            writeln!(out, "    \"{}\",", c_escape(&e.name))?;
        }
        writeln!(out, "    NULL")?;
        writeln!(out, "}};")?;
        writeln!(out)?;
        writeln!(out, "static const uint32_t src_{lo}_ids[{count} + 1] = {{")?;
        for e in entries {
            writeln!(out, "    0x{:08X}u,", e.id)?;
        }
        writeln!(out, "    0u")?;
        writeln!(out, "}};")?;
        writeln!(out)?;
        writeln!(out, "static const size_t src_{lo}_offsets[{count} + 1] = {{")?;
        for e in entries {
            writeln!(out, "    {}u,", e.offset)?;
        }
        writeln!(out, "    0u")?;
        writeln!(out, "}};")?;
        writeln!(out)?;
        for (what, ty, fallback) in [
            ("name", "const char*", "NULL"),
            ("id", "uint32_t", "0u"),
            ("offset", "size_t", "0u"),
        ] {
            writeln!(out, "{ty} src_get_{lo}_resource_{what}(int32_t index)")?;
            writeln!(out, "{{")?;
            writeln!(
                out,
                "    return (index >= 0 && index < {count}) ? src_{lo}_{what}s[index] : {fallback};"
            )?;
            writeln!(out, "}}")?;
            writeln!(out)?;
        }
        writeln!(out, "#endif /* SRC_RESOURCE_{up}_IMPLEMENTATION */")?;
        writeln!(out)?;
        writeln!(out, "#ifdef __cplusplus")?;
        writeln!(out, "}}")?;
        writeln!(out, "#endif")?;
        writeln!(out, "#endif /* SRC_RESOURCE_{up}_H */")?;
        Ok(())
    }
}

/// Rust module with `COUNT`, `NAMES`, `IDS`, `OFFSETS` and one index
/// constant per resource.
pub struct RustModuleEmitter {
    table_name: String,
}

impl RustModuleEmitter {
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
        }
    }
}

impl BindingEmitter for RustModuleEmitter {
    fn extension(&self) -> &'static str {
        "rs"
    }

    fn emit(&self, table: &LookupTable, out: &mut dyn Write) -> PakResult<()> {
        let entries = table.entries();
        let idents = unique_idents(entries, &["COUNT", "NAMES", "IDS", "OFFSETS"], false);

        writeln!(out, "// Generated by srcpak. Do not edit.")?;
        writeln!(out, "// Lookup table for the `{}` resource archive.", self.table_name.escape_default())?;
        writeln!(out)?;
        writeln!(out, "pub const COUNT: usize = {};", entries.len())?;
        writeln!(out)?;
        writeln!(out, "pub const NAMES: [&str; COUNT] = [")?;
        for e in entries {
            writeln!(out, "    {:?},", e.name)?;
        }
        writeln!(out, "];")?;
        writeln!(out)?;
        writeln!(out, "pub const IDS: [u32; COUNT] = [")?;
        for e in entries {
            writeln!(out, "    0x{:08x},", e.id)?;
        }
        writeln!(out, "];")?;
        writeln!(out)?;
        writeln!(out, "pub const OFFSETS: [u64; COUNT] = [")?;
        for e in entries {
            writeln!(out, "    {},", e.offset)?;
        }
        writeln!(out, "];")?;
        if !entries.is_empty() {
            writeln!(out)?;
        }
        for (i, ident) in idents.iter().enumerate() {
            writeln!(out, "pub const {ident}: usize = {i};")?;
        }
        Ok(())
    }
}
