use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn srcpak() -> Command {
    let mut cmd = Command::cargo_bin("srcpak").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn djb2(s: &str) -> u32 {
    s.bytes()
        .fold(5381u32, |h, b| h.wrapping_mul(33).wrapping_add(u32::from(b)))
}

/// `res/a.txt` ("abc") and `res/sub/b.txt` (empty), plus a dot directory
/// that must be ignored.
fn fixture(root: &Path) -> PathBuf {
    let res = root.join("res");
    fs::create_dir_all(res.join("sub")).unwrap();
    fs::create_dir_all(res.join(".svn")).unwrap();
    fs::write(res.join("a.txt"), b"abc").unwrap();
    fs::write(res.join("sub").join("b.txt"), b"").unwrap();
    fs::write(res.join(".svn").join("entries"), b"ignored").unwrap();
    res
}

#[test]
fn pack_list_verify_extract_cycle() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let res = fixture(dir.path());
    let archive = dir.path().join("test.src");

    srcpak()
        .arg("pack")
        .arg("--target")
        .arg(&res)
        .arg("--output")
        .arg(&archive)
        .assert()
        .success()
        .stderr(predicate::str::contains("Packaged 2 files"));

    let a = res.join("a.txt");
    let b = res.join("sub").join("b.txt");
    srcpak()
        .arg("list")
        .arg("--archive")
        .arg(&archive)
        .assert()
        .success()
        .stdout(format!("{}\n{}\n", a.display(), b.display()));

    srcpak()
        .arg("verify")
        .arg("--archive")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: 2 entries"));

    let out = dir.path().join("out");
    srcpak()
        .arg("extract")
        .arg("--archive")
        .arg(&archive)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let extracted: Vec<PathBuf> = walk_files(&out);
    assert_eq!(extracted.len(), 2);
    let a_out = extracted.iter().find(|p| p.ends_with("a.txt")).unwrap();
    assert_eq!(fs::read(a_out)?, b"abc");
    let b_out = extracted.iter().find(|p| p.ends_with("b.txt")).unwrap();
    assert_eq!(fs::read(b_out)?.len(), 0);
    Ok(())
}

fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for ent in fs::read_dir(dir).unwrap() {
            let p = ent.unwrap().path();
            if p.is_dir() {
                stack.push(p);
            } else {
                out.push(p);
            }
        }
    }
    out
}

#[test]
fn archive_layout_matches_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let res = fixture(dir.path());
    let archive = dir.path().join("scenario.src");

    srcpak()
        .args(["pack", "-t"])
        .arg(&res)
        .arg("-o")
        .arg(&archive)
        .assert()
        .success();

    let bytes = fs::read(&archive)?;
    assert_eq!(&bytes[..8], b"SRCDATA\0");
    assert_eq!(u32::from_le_bytes(bytes[8..12].try_into()?), 1);
    assert_eq!(u64::from_le_bytes(bytes[16..24].try_into()?), 2);

    // first entry starts right after the 24-byte header
    let a = res.join("a.txt");
    let a = a.to_str().unwrap();
    assert_eq!(&bytes[24..32], b"SUBDATA\0");
    assert_eq!(u32::from_le_bytes(bytes[32..36].try_into()?), djb2(a));
    assert_eq!(u64::from_le_bytes(bytes[40..48].try_into()?), 3);
    let name_len = u16::from_le_bytes(bytes[48..50].try_into()?) as usize;
    assert_eq!(name_len, a.len() + 1);
    let name_at = 24 + 32;
    assert_eq!(&bytes[name_at..name_at + a.len()], a.as_bytes());
    assert_eq!(bytes[name_at + a.len()], 0);
    assert_eq!(&bytes[name_at + name_len..name_at + name_len + 3], b"abc");

    let second = name_at + name_len + 3;
    assert_eq!(&bytes[second..second + 8], b"SUBDATA\0");
    let b = res.join("sub").join("b.txt");
    let b = b.to_str().unwrap();
    assert_eq!(second + 32 + b.len() + 1, bytes.len());
    Ok(())
}

#[test]
fn pack_emits_c_bindings() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let res = fixture(dir.path());
    let archive = dir.path().join("test.src");
    let header = dir.path().join("test.src.h");

    srcpak()
        .arg("pack")
        .arg("--target")
        .arg(&res)
        .arg("--output")
        .arg(&archive)
        .arg("--bindings")
        .arg(&header)
        .assert()
        .success();

    let src = fs::read_to_string(&header)?;
    assert!(src.contains("SRC_TEST_A = 0,"));
    assert!(src.contains("SRC_TEST_B = 1,"));
    assert!(src.contains("SRC_TEST_COUNT = 2"));
    assert!(src.contains("    24u,"));
    let a = res.join("a.txt");
    assert!(src.contains(&format!("    0x{:08X}u,", djb2(a.to_str().unwrap()))));
    Ok(())
}

#[test]
fn bindings_subcommand_writes_rust() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let res = fixture(dir.path());
    let archive = dir.path().join("assets.src");
    let module = dir.path().join("assets.rs");

    srcpak()
        .args(["-q", "pack", "-t"])
        .arg(&res)
        .arg("-o")
        .arg(&archive)
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    srcpak()
        .arg("bindings")
        .arg("--archive")
        .arg(&archive)
        .arg("--output")
        .arg(&module)
        .args(["--lang", "rust"])
        .assert()
        .success();

    let src = fs::read_to_string(&module)?;
    assert!(src.contains("pub const COUNT: usize = 2;"));
    assert!(src.contains("pub const OFFSETS: [u64; COUNT] = [\n    24,\n"));
    assert!(src.contains("pub const B: usize = 1;"));
    Ok(())
}

#[test]
fn list_long_shows_ids_and_digests() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let res = fixture(dir.path());
    let archive = dir.path().join("test.src");

    srcpak().arg("pack").arg("-t").arg(&res).arg("-o").arg(&archive).assert().success();

    let a = res.join("a.txt");
    let id = format!("id=0x{:08x}", djb2(a.to_str().unwrap()));
    srcpak()
        .args(["list", "--long", "--archive"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(
            predicate::str::contains(id)
                .and(predicate::str::contains("off=24 size=3"))
                .and(predicate::str::contains(format!("blake3={}", blake3::hash(b"abc").to_hex()))),
        );
    Ok(())
}

#[test]
fn verify_reports_bad_magic() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let res = fixture(dir.path());
    let archive = dir.path().join("test.src");
    srcpak().arg("pack").arg("-t").arg(&res).arg("-o").arg(&archive).assert().success();

    let mut bytes = fs::read(&archive)?;
    bytes[..8].copy_from_slice(b"NOTSRC\0\0");
    fs::write(&archive, bytes)?;

    srcpak()
        .arg("verify")
        .arg("--archive")
        .arg(&archive)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "bad archive magic: expected \"SRCDATA\", found \"NOTSRC\"",
        ));
    Ok(())
}

#[test]
fn missing_target_is_a_usage_error() {
    srcpak().arg("pack").assert().failure().code(2);
}

#[test]
fn unreadable_target_is_a_packing_failure() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    srcpak()
        .arg("pack")
        .arg("-t")
        .arg(dir.path().join("nope"))
        .arg("-o")
        .arg(dir.path().join("x.src"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not a directory"));
    Ok(())
}
