//! treesnap - point-in-time directory snapshots and file indexes.
//!
//! Usage:
//!   treesnap archive ROOT DEST                  Zip ROOT into DEST(.zip)
//!   treesnap index ROOT DEST [--filter EXT...]  List matching files
//!   treesnap remove PATH                        Delete a file or directory tree
//!   treesnap send FILE --recipient ID           Deliver an artifact to the outbox
//!   treesnap snapshot ROOT DEST [...]           Archive/index, deliver, clean up
//!   treesnap --help                             Show help

use std::path::{Path, PathBuf};
use std::thread;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use treesnap_core::{FilterSpec, OutboxSettings, Settings, SnapError, WalkConfig};
use treesnap_ops::{
    ArchiveReport, Archiver, ArtifactKind, Delivery, DeliveryChannel, EntryRemover, Indexer,
    OperationType, OutboxChannel, Snapshot, SnapshotReport, Summary, conclude,
};
use treesnap_scan::ProgressReceiver;

/// Environment variable consulted for the delivery credential.
const CREDENTIAL_ENV: &str = "TREESNAP_CREDENTIAL";

#[derive(Parser)]
#[command(
    name = "treesnap",
    version,
    about = "Point-in-time directory snapshots and file indexes",
    long_about = "treesnap archives a directory tree into a zip file or indexes the \
                  files in it by extension, optionally hands the result to a \
                  recipient and cleans up afterwards."
)]
struct Cli {
    /// Settings file (defaults to <config dir>/treesnap/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(flatten)]
    walk: WalkArgs,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every command that walks a tree.
#[derive(Args, Debug, Default)]
struct WalkArgs {
    /// Additional directory name to skip (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "NAME", global = true)]
    exclude: Vec<String>,

    /// Descend into hidden directories
    #[arg(long, global = true)]
    include_hidden: bool,

    /// Directory-reading threads (1 = serial, 0 = all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Maximum depth below the root (0 = unlimited)
    #[arg(long, global = true)]
    max_depth: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Create a zip archive of a directory tree
    Archive {
        /// Directory to archive
        root: PathBuf,

        /// Archive path (".zip" is appended when missing)
        dest: PathBuf,

        /// Deflate level 0-9
        #[arg(short, long, value_parser = clap::value_parser!(i64).range(0..=9))]
        level: Option<i64>,
    },

    /// Write an index of files matching extensions
    Index {
        /// Directory to index
        root: PathBuf,

        /// Index file to write
        dest: PathBuf,

        /// Extensions to keep, e.g. --filter .log .cfg (omit for every file)
        #[arg(long, value_name = "EXT", num_args = 1..)]
        filter: Vec<String>,
    },

    /// Remove a file or a directory tree
    Remove {
        /// Path to remove
        path: PathBuf,

        /// Move to the trash instead of deleting
        #[arg(long)]
        trash: bool,
    },

    /// Deliver a file to a recipient in the outbox
    Send {
        /// File to send
        file: PathBuf,

        /// Recipient identifier
        #[arg(long)]
        recipient: String,

        #[command(flatten)]
        delivery: DeliveryArgs,
    },

    /// Archive or index, then optionally deliver and clean up
    Snapshot {
        /// Directory to snapshot
        root: PathBuf,

        /// Artifact path
        dest: PathBuf,

        /// Write an index of these extensions instead of an archive
        #[arg(long, value_name = "EXT", num_args = 0..)]
        index: Option<Vec<String>>,

        /// Deliver the artifact to this recipient
        #[arg(long)]
        recipient: Option<String>,

        #[command(flatten)]
        delivery: DeliveryArgs,

        /// Remove the artifact once it has been delivered
        #[arg(long)]
        remove_artifact: bool,

        /// Remove the source tree once the artifact is done
        #[arg(long)]
        remove_source: bool,

        /// Move removed entries to the trash
        #[arg(long)]
        trash: bool,
    },
}

#[derive(Args, Debug)]
struct DeliveryArgs {
    /// Caption sent along with the file
    #[arg(long, default_value = "")]
    caption: String,

    /// Delivery credential
    #[arg(long, env = CREDENTIAL_ENV, hide_env_values = true)]
    credential: Option<String>,

    /// Outbox directory (replaces the root from the settings file)
    #[arg(long)]
    outbox: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let format = cli.format;

    let code = match cli.command {
        Command::Archive { root, dest, level } => {
            run_archive(walk_config(&settings, &cli.walk, root), &dest, level, format)?
        }
        Command::Index { root, dest, filter } => {
            let indexer = Indexer::new(
                walk_config(&settings, &cli.walk, root),
                FilterSpec::new(filter),
            );
            watch_progress(indexer.subscribe());
            emit(OperationType::Index, indexer.run(&dest), format)?
        }
        Command::Remove { path, trash } => {
            let remover = EntryRemover { use_trash: trash };
            emit(OperationType::Remove, remover.remove(&path), format)?
        }
        Command::Send {
            file,
            recipient,
            delivery,
        } => {
            let credential = credential(&delivery)?;
            let channel = outbox_channel(&settings, &delivery)?;
            let result = channel
                .send(&credential, &recipient, &file, &delivery.caption)
                .map_err(SnapError::from);
            emit(OperationType::Deliver, result, format)?
        }
        Command::Snapshot {
            root,
            dest,
            index,
            recipient,
            delivery,
            remove_artifact,
            remove_source,
            trash,
        } => {
            let kind = match index {
                Some(extensions) => ArtifactKind::Index {
                    filter: FilterSpec::new(extensions),
                },
                None => ArtifactKind::Archive,
            };
            let mut snapshot = Snapshot::new(walk_config(&settings, &cli.walk, root), kind)
                .remove_artifact(remove_artifact)
                .remove_source(remove_source)
                .use_trash(trash);
            if let Some(recipient) = recipient {
                let channel = outbox_channel(&settings, &delivery)?;
                snapshot = snapshot.deliver_to(
                    Delivery::new(channel, credential(&delivery)?, recipient)
                        .with_caption(delivery.caption),
                );
            }
            run_snapshot(&snapshot, &dest, format)?
        }
    };

    std::process::exit(code);
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Settings first, command-line flags on top.
fn walk_config(settings: &Settings, args: &WalkArgs, root: PathBuf) -> WalkConfig {
    let mut config = settings.walk_config(root);
    for name in &args.exclude {
        config.exclusions.insert(name.clone());
    }
    if args.include_hidden {
        config.exclusions = config.exclusions.with_hidden_skipped(false);
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(depth) = args.max_depth {
        config.max_depth = (depth > 0).then_some(depth);
    }
    config
}

fn credential(args: &DeliveryArgs) -> Result<String> {
    args.credential
        .clone()
        .ok_or_else(|| eyre!("No credential given (use --credential or {CREDENTIAL_ENV})"))
}

/// The outbox from the settings file, with `--outbox` replacing its root.
///
/// An outbox given only on the command line has no configured credential,
/// so it accepts the one passed with `--credential`.
fn outbox_channel(settings: &Settings, args: &DeliveryArgs) -> Result<OutboxChannel> {
    match (&args.outbox, &settings.outbox) {
        (Some(root), Some(configured)) => Ok(OutboxChannel::from_settings(&OutboxSettings {
            root: root.clone(),
            credential: configured.credential.clone(),
        })),
        (None, Some(configured)) => Ok(OutboxChannel::from_settings(configured)),
        (Some(root), None) => Ok(OutboxChannel::new(root, credential(args)?)),
        (None, None) => Err(eyre!(
            "No outbox configured; pass --outbox or add an [outbox] section to the settings file"
        )),
    }
}

/// Log walk progress from a background thread until the walk finishes.
fn watch_progress(mut rx: ProgressReceiver) {
    thread::spawn(move || {
        while let Ok(progress) = rx.blocking_recv() {
            tracing::debug!(
                files = progress.files_seen,
                dirs = progress.dirs_seen,
                warnings = progress.warnings,
                rate = progress.entries_per_second(),
                "walking {}",
                progress.current_path.display()
            );
            if progress.finished {
                break;
            }
        }
    });
}

fn run_archive(
    config: WalkConfig,
    dest: &Path,
    level: Option<i64>,
    format: OutputFormat,
) -> Result<i32> {
    let archiver = Archiver::new(config).with_compression_level(level);
    watch_progress(archiver.subscribe());

    let result = archiver.run(dest);
    if format == OutputFormat::Text {
        if let Ok(report) = &result {
            print_archive_details(report);
        }
    }
    emit(OperationType::Archive, result, format)
}

fn print_archive_details(report: &ArchiveReport) {
    eprintln!(
        " {} files, {} symlinks, {} read",
        report.files_written,
        report.symlinks_written,
        format_size(report.bytes_read)
    );
    print_warnings(report.warnings.len(), report.skipped);
}

fn run_snapshot(snapshot: &Snapshot, dest: &Path, format: OutputFormat) -> Result<i32> {
    let result: Result<SnapshotReport, SnapError> = snapshot.run(dest);
    if format == OutputFormat::Text {
        if let Ok(report) = &result {
            if let Some(receipt) = &report.delivery {
                eprintln!(" {} delivered", format_size(receipt.bytes));
            }
        }
    }
    emit(OperationType::Snapshot, result, format)
}

fn print_warnings(count: usize, skipped: u64) {
    if count > 0 {
        eprintln!(" {count} warning(s) during walk, {skipped} entries skipped");
    }
}

/// Print the outcome of an operation and return the process exit code.
fn emit<R: Summary + Serialize>(
    operation: OperationType,
    result: Result<R, SnapError>,
    format: OutputFormat,
) -> Result<i32> {
    let json = match (&result, format) {
        (Ok(report), OutputFormat::Json) => Some(serde_json::to_string_pretty(report)?),
        (Err(reason), OutputFormat::Json) => Some(serde_json::to_string_pretty(
            &serde_json::json!({
                "error": reason.code(),
                "message": reason.to_string(),
            }),
        )?),
        (_, OutputFormat::Text) => None,
    };

    let outcome = conclude(operation, result);
    match json {
        Some(json) => println!("{json}"),
        None if outcome.is_success() => println!("{outcome}"),
        None => eprintln!("{outcome}"),
    }
    Ok(outcome.exit_code())
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
