//! dataclean: prepare an image classification dataset for training.
//!
//! A dataset root holds one directory per class. dataclean runs two phases
//! over it:
//!
//! 1. **Cleanup**: remove non-image files, delete images that fail an
//!    integrity check (recording them in `False.txt`), and rename the rest to
//!    `<class>_<n>.<ext>`.
//! 2. **Manifest**: write `train.txt`, `val.txt` and `label.txt` for a
//!    training pipeline.
//!
//! # Modules
//!
//! - [`layout`]: image extensions and class directory discovery
//! - [`verify`]: image integrity checking and the failure log
//! - [`clean`]: the cleanup phase
//! - [`manifest`]: the manifest phase
//! - [`error`]: Error types for dataclean operations

pub mod clean;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod verify;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

use clean::{CleanOptions, CleanReport};
pub use error::{DatacleanError, IntegrityError};
use manifest::{CapScope, ManifestOptions, ManifestSummary, DEFAULT_VAL_CAP};

/// The dataclean CLI application.
///
/// Without a subcommand both phases run, so a bare `dataclean` inside a
/// dataset directory does the whole job.
#[derive(Parser)]
#[command(name = "dataclean")]
#[command(version, author, about)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Clean the dataset, then write the manifests.
    Run(RunArgs),
    /// Prune, verify and rename images only.
    Clean(CleanArgs),
    /// Write train/val/label manifests only.
    Manifest(ManifestArgs),
}

/// Arguments shared by every subcommand.
#[derive(clap::Args)]
struct CommonArgs {
    /// Dataset root containing one directory per class.
    #[arg(long, env = "DATACLEAN_ROOT", default_value = ".")]
    root: PathBuf,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Cleanup options.
#[derive(clap::Args)]
struct CleanFlags {
    /// File that corrupt image paths are appended to [default: <root>/False.txt].
    #[arg(long)]
    failure_log: Option<PathBuf>,
}

/// Manifest options.
#[derive(clap::Args)]
struct ManifestFlags {
    /// Validation images per group; the rest go to training.
    #[arg(long, default_value_t = DEFAULT_VAL_CAP)]
    val_cap: usize,

    /// What the validation cap counts against ('extension' or 'class').
    #[arg(long, default_value = "extension")]
    cap_scope: String,

    /// Top-level directory that is not a class.
    #[arg(long, default_value = layout::DEFAULT_EXCLUDED_CLASS)]
    exclude: String,

    /// Seed for the training-list shuffle.
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for train.txt, val.txt and label.txt [default: the root].
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

/// Arguments for the run subcommand, also used without a subcommand.
#[derive(clap::Args)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    clean: CleanFlags,

    #[command(flatten)]
    manifest: ManifestFlags,
}

/// Arguments for the clean subcommand.
#[derive(clap::Args)]
struct CleanArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    clean: CleanFlags,
}

/// Arguments for the manifest subcommand.
#[derive(clap::Args)]
struct ManifestArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    manifest: ManifestFlags,
}

/// How reports are printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Result<Self, DatacleanError> {
        match value {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(DatacleanError::InvalidOption(format!(
                "output format '{}' (supported: text, json)",
                other
            ))),
        }
    }
}

impl From<CleanFlags> for CleanOptions {
    fn from(flags: CleanFlags) -> Self {
        CleanOptions {
            failure_log: flags.failure_log,
        }
    }
}

impl ManifestFlags {
    fn options(&self) -> Result<ManifestOptions, DatacleanError> {
        Ok(ManifestOptions {
            val_cap: self.val_cap,
            cap_scope: self.cap_scope.parse::<CapScope>()?,
            exclude: self.exclude.clone(),
            seed: self.seed,
        })
    }
}

/// Combined result of a full run.
#[derive(Debug, Serialize)]
pub struct PrepareReport {
    pub clean: CleanReport,
    pub manifest: ManifestSummary,
}

/// Run both phases on `root`.
pub fn prepare_dataset(
    root: &Path,
    clean_opts: &CleanOptions,
    manifest_opts: &ManifestOptions,
    out_dir: Option<&Path>,
) -> Result<PrepareReport, DatacleanError> {
    log::info!("Starting image processing in {}", root.display());

    let clean = clean::clean_tree(root, clean_opts)?;
    if !clean.locked.is_empty() {
        log::warn!(
            "{} corrupt image(s) could not be deleted because they are in use",
            clean.locked.len()
        );
    }

    let manifest = manifest::generate(root, out_dir, manifest_opts)?;
    Ok(PrepareReport { clean, manifest })
}

/// Run the dataclean CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), DatacleanError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run(args)) => run_prepare(args),
        Some(Commands::Clean(args)) => run_clean(args),
        Some(Commands::Manifest(args)) => run_manifest(args),
        None => run_prepare(cli.run),
    }
}

/// Execute the run subcommand (or the bare invocation).
fn run_prepare(args: RunArgs) -> Result<(), DatacleanError> {
    let output = OutputFormat::parse(&args.common.output)?;
    let manifest_opts = args.manifest.options()?;
    let clean_opts = CleanOptions::from(args.clean);

    let report = prepare_dataset(
        &args.common.root,
        &clean_opts,
        &manifest_opts,
        args.manifest.out_dir.as_deref(),
    )?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            print!("{}", report.clean);
            println!();
            print!("{}", report.manifest);
        }
    }
    Ok(())
}

/// Execute the clean subcommand.
fn run_clean(args: CleanArgs) -> Result<(), DatacleanError> {
    let output = OutputFormat::parse(&args.common.output)?;
    let report = clean::clean_tree(&args.common.root, &CleanOptions::from(args.clean))?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", report),
    }
    Ok(())
}

/// Execute the manifest subcommand.
fn run_manifest(args: ManifestArgs) -> Result<(), DatacleanError> {
    let output = OutputFormat::parse(&args.common.output)?;
    let opts = args.manifest.options()?;
    log::info!(
        "Building manifests with a validation cap of {} per {}",
        opts.val_cap,
        opts.cap_scope.as_str()
    );

    let summary = manifest::generate(
        &args.common.root,
        args.manifest.out_dir.as_deref(),
        &opts,
    )?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print!("{}", summary),
    }
    Ok(())
}
