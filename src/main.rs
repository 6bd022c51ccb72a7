#![forbid(unsafe_code)]

mod ui;

use clap::{Parser, Subcommand};
use srcpak::pak::{self, BindingLang, IdPolicy, PackConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "srcpak", version, about = "Simple resource compiler (SRCDATA v1)")]
struct Cli {
    /// More log output (repeatable).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive wizard for packing a directory (terminal).
    Ui,

    /// Pack a directory into an archive.
    Pack {
        /// Target directory.
        #[arg(short, long)]
        target: PathBuf,
        /// Output archive.
        #[arg(short, long, default_value = pak::DEFAULT_OUTPUT)]
        output: PathBuf,
        /// Also write lookup-table bindings to this file.
        #[arg(long)]
        bindings: Option<PathBuf>,
        /// Language of the bindings.
        #[arg(long, value_enum, default_value_t = BindingLang::C)]
        lang: BindingLang,
        /// Symbol prefix for bindings (defaults to the output file stem).
        #[arg(long)]
        table_name: Option<String>,
        /// Fail when two paths hash to the same id.
        #[arg(long, default_value_t = false)]
        strict_ids: bool,
    },

    /// List entries in an archive.
    List {
        #[arg(long)]
        archive: PathBuf,
        /// Print ids, offsets, sizes and payload digests too.
        #[arg(short, long, default_value_t = false)]
        long: bool,
    },

    /// Extract an archive to an output directory.
    Extract {
        #[arg(long)]
        archive: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Only extract entries whose name contains this substring (repeatable).
        #[arg(long)]
        filter: Vec<String>,
    },

    /// Verify archive integrity (headers, ids, bounds).
    Verify {
        #[arg(long)]
        archive: PathBuf,
    },

    /// Regenerate lookup-table bindings from an existing archive.
    Bindings {
        #[arg(long)]
        archive: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = BindingLang::C)]
        lang: BindingLang,
        #[arg(long)]
        table_name: Option<String>,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let res = match cli.cmd {
        Command::Ui => ui::run(),
        Command::Pack {
            target,
            output,
            bindings,
            lang,
            table_name,
            strict_ids,
        } => {
            let cfg = PackConfig {
                target_dir: target,
                output,
                bindings,
                lang,
                table_name,
                id_policy: if strict_ids { IdPolicy::Deny } else { IdPolicy::Warn },
            };
            pak::pack(&cfg).map(|_| ())
        }
        Command::List { archive, long } => pak::list(&archive, long),
        Command::Extract {
            archive,
            output,
            filter,
        } => pak::extract(&archive, &output, &filter).map(|_| ()),
        Command::Verify { archive } => pak::verify(&archive).map(|_| ()),
        Command::Bindings {
            archive,
            output,
            lang,
            table_name,
        } => pak::bindings(&archive, &output, lang, table_name.as_deref()),
    };

    if let Err(e) = res {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
