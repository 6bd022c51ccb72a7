#![forbid(unsafe_code)]

//! Simple resource compiler.
//!
//! Packs a directory tree into a single `SRCDATA` archive. Every file becomes
//! a record whose id is the djb2 hash of its path; the byte offset of each
//! record is collected into a lookup table that can be emitted as C or Rust
//! bindings for direct, scan-free access.

pub mod pak;
