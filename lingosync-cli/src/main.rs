//! lingosync: keep a source tree's translatable strings in step with the
//! translation service.
//!
//! # Usage
//!
//! ```text
//! lingosync sync   [--path <dir>] [--token <t>] [--project-id Name:id]... [--clean] [--state <file>]
//! lingosync scan   [--path <dir>] [--out <file>]
//! lingosync status [--path <dir>] [--state <file>] [--json]
//! ```
//!
//! Every subcommand also accepts `--config <file>`; without it
//! `<config dir>/lingosync/config.yaml` is read when present.

mod commands;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{scan::ScanArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "lingosync",
    version,
    about = "Synchronize localization strings with a translation service",
    long_about = None,
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan, upload the base locale, and download every changed locale.
    Sync(SyncArgs),

    /// Print the base locale built from the source tree.
    Scan(ScanArgs),

    /// Compare downloaded locale files with the last run record.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Scan(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
