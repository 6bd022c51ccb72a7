#![forbid(unsafe_code)]

use inquire::{Confirm, Select, Text};
use srcpak::pak::{self, BindingLang, IdPolicy, PackConfig};
use std::path::{Path, PathBuf};

fn prompt_err(e: inquire::InquireError) -> pak::PakError {
    pak::PakError::Io(std::io::Error::other(e))
}

fn validate_dir(p: &Path) -> pak::PakResult<()> {
    if !p.exists() {
        return Err(pak::PakError::Invalid(format!("path does not exist: {}", p.display())));
    }
    if !p.is_dir() {
        return Err(pak::PakError::Invalid(format!("path is not a directory: {}", p.display())));
    }
    Ok(())
}

fn ensure_ext(p: &Path, ext: &str) -> PathBuf {
    if p.extension().and_then(|e| e.to_str()).unwrap_or("") == ext {
        return p.to_path_buf();
    }
    let mut s = p.to_string_lossy().to_string();
    if !s.ends_with('.') {
        s.push('.');
    }
    s.push_str(ext);
    PathBuf::from(s)
}

/// `assets.src` + `h` -> `assets.src.h`
fn default_bindings_path(archive: &Path, lang: BindingLang) -> PathBuf {
    let ext = lang.emitter("").extension();
    let mut s = archive.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

pub fn run() -> pak::PakResult<()> {
    println!("srcpak wizard\n");

    let target = Text::new("Target directory")
        .with_default("./resources")
        .prompt()
        .map(PathBuf::from)
        .map_err(prompt_err)?;
    validate_dir(&target)?;

    let output_raw = Text::new("Output archive")
        .with_default(pak::DEFAULT_OUTPUT)
        .prompt()
        .map_err(prompt_err)?;
    if output_raw.trim().is_empty() {
        return Err(pak::PakError::Invalid("output path is empty".into()));
    }
    let output = ensure_ext(Path::new(output_raw.trim()), "src");

    let mut cfg = PackConfig::new(target);
    cfg.output = output;

    let want_bindings = Confirm::new("Generate lookup-table bindings?")
        .with_default(true)
        .prompt()
        .map_err(prompt_err)?;
    if want_bindings {
        let lang = Select::new("Bindings language", vec!["C", "Rust"])
            .prompt()
            .map_err(prompt_err)?;
        cfg.lang = if lang == "Rust" { BindingLang::Rust } else { BindingLang::C };

        let suggested = default_bindings_path(&cfg.output, cfg.lang);
        let path = Text::new("Bindings file")
            .with_default(&suggested.to_string_lossy())
            .prompt()
            .map_err(prompt_err)?;
        cfg.bindings = Some(PathBuf::from(path.trim()));

        let name = Text::new("Table name")
            .with_default(&cfg.table_name())
            .prompt()
            .map_err(prompt_err)?;
        cfg.table_name = Some(name.trim().to_string());
    }

    let strict = Confirm::new("Fail on id collisions?")
        .with_default(false)
        .prompt()
        .map_err(prompt_err)?;
    cfg.id_policy = if strict { IdPolicy::Deny } else { IdPolicy::Warn };

    println!("\nPack summary:");
    println!("  target  : {}", cfg.target_dir.display());
    println!("  output  : {}", cfg.output.display());
    match &cfg.bindings {
        Some(b) => println!("  bindings: {} ({:?}, table {})", b.display(), cfg.lang, cfg.table_name()),
        None => println!("  bindings: <none>"),
    }
    println!("  ids     : {}", if strict { "strict" } else { "warn on collision" });

    let proceed = Confirm::new("Proceed?").with_default(true).prompt().map_err(prompt_err)?;
    if !proceed {
        return Ok(());
    }

    let summary = pak::pack(&cfg)?;
    println!("Packaged {} files ({} bytes)", summary.entry_count, summary.archive_len);
    Ok(())
}
