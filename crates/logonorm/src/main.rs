//! logonorm: normalize logo and icon rasters into uniformly framed,
//! fixed-size assets.
//!
//! # Usage
//!
//! ```text
//! logonorm file <FILE> [PERCENTAGE] [WIDTH] [HEIGHT] [OUTPUT_DIR] [OPTIONS]
//! logonorm directory <DIRECTORY> [PERCENTAGE] [WIDTH] [HEIGHT] [OUTPUT_DIR] [OPTIONS]
//! ```
//!
//! `directory` runs every image in a separate worker process (the hidden
//! `worker` subcommand) with at most `--max-workers` alive at a time, and
//! shows a live progress table on stdout. Logs go to stderr; set
//! `RUST_LOG` to see more of them.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use logonorm_batch::table::LiveTable;
use logonorm_batch::worker::{self, WORKER_SUBCOMMAND};
use logonorm_batch::{ProcessLauncher, ProcessingOptions, StatusLabel};
use logonorm_pipeline::{BackgroundFill, Dimensions, NormalizeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Normalize logo and icon rasters.
///
/// Crops to the visible artwork, strips flat background colors, pads to a
/// square, grows a transparent border until the artwork covers at most
/// PERCENTAGE of the frame, and resizes to WIDTH x HEIGHT.
#[derive(Parser)]
#[command(name = "logonorm", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a single image file.
    File(FileArgs),
    /// Process every image directly inside a directory.
    Directory(DirectoryArgs),
    /// Process one file and stream its status as JSON lines on stdout.
    #[command(name = WORKER_SUBCOMMAND, hide = true)]
    Worker(WorkerArgs),
}

#[derive(Args)]
struct FileArgs {
    /// Image to normalize.
    file: PathBuf,

    #[command(flatten)]
    normalize: NormalizeArgs,
}

#[derive(Args)]
struct DirectoryArgs {
    /// Directory whose png, jpg, jpeg, tiff, bmp, gif, and webp files are
    /// normalized.
    directory: PathBuf,

    #[command(flatten)]
    normalize: NormalizeArgs,

    /// Maximum number of worker processes alive at once.
    #[arg(long, default_value_t = logonorm_batch::default_max_workers(), value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    max_workers: usize,
}

/// Settings shared by `file` and `directory`.
#[derive(Args)]
struct NormalizeArgs {
    /// Fraction of the frame the artwork may cover (greater than 0).
    #[arg(default_value_t = NormalizeConfig::DEFAULT_TARGET_PERCENTAGE)]
    percentage: f64,

    /// Output width in pixels.
    #[arg(default_value_t = NormalizeConfig::DEFAULT_RESOLUTION, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    width: u32,

    /// Output height in pixels.
    #[arg(default_value_t = NormalizeConfig::DEFAULT_RESOLUTION, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    height: u32,

    /// Directory the outputs are written to (created if missing).
    #[arg(default_value = ".")]
    output_dir: PathBuf,

    /// Output format, as a file extension (png, jpg, bmp, gif, tiff, webp).
    #[arg(long, default_value = "png")]
    format: String,

    /// Require both the visual and the foreground percentage to reach the
    /// target, and only strip colors that never occur inside the artwork.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    strict: bool,

    /// Cache derived image properties between mutations.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    dev_caching: bool,

    /// Strip at most this many background colors per pass.
    #[arg(long)]
    color_limit: Option<usize>,

    /// Fill for stripped background and squaring padding: transparent,
    /// white, black, #RRGGBB, or #RRGGBBAA.
    #[arg(long, default_value_t = BackgroundFill::Transparent)]
    background: BackgroundFill,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, PERCENTAGE, WIDTH, HEIGHT, and the pipeline flags
    /// are ignored. The JSON must be a valid `NormalizeConfig`
    /// serialization; missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

#[derive(Args)]
struct WorkerArgs {
    file: PathBuf,

    #[arg(long)]
    output_dir: PathBuf,

    #[arg(long)]
    format: String,

    #[arg(long)]
    config_json: String,
}

/// Build a [`NormalizeConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameters are ignored.
fn config_from_args(args: &NormalizeArgs) -> Result<NormalizeConfig, String> {
    let config = if let Some(ref json) = args.config_json {
        parse_config_json(json)?
    } else {
        NormalizeConfig {
            target_percentage: args.percentage,
            resolution: Dimensions::new(args.width, args.height),
            strict: args.strict,
            caching: args.dev_caching,
            color_limit: args.color_limit,
            background: args.background,
            ..NormalizeConfig::default()
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn parse_config_json(json: &str) -> Result<NormalizeConfig, String> {
    serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))
}

fn create_output_dir(dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Error creating output directory {}: {e}", dir.display()))
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logonorm=warn,logonorm_batch=warn,logonorm_pipeline=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::File(args) => cmd_file(args),
        Command::Directory(args) => cmd_directory(args),
        Command::Worker(args) => cmd_worker(args),
    };

    match result {
        Ok(code) => code,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_file(args: FileArgs) -> Result<ExitCode, String> {
    let config = config_from_args(&args.normalize)?;
    create_output_dir(&args.normalize.output_dir)?;

    let options = ProcessingOptions {
        file: args.file,
        output_dir: args.normalize.output_dir,
        format: args.normalize.format,
        config,
    };

    let mut last_step = String::new();
    let status = logonorm_batch::process_file(&options, |status| {
        if status.label == StatusLabel::Processing && status.step_message != last_step {
            eprintln!("Processing image: {}", status.step_message);
            last_step.clone_from(&status.step_message);
        }
    });

    if let StatusLabel::Failed(message) = &status.label {
        eprintln!("Error processing {}: {message}", options.file.display());
        return Ok(ExitCode::FAILURE);
    }
    println!(
        "Successfully processed {} and saved to {}",
        options.file.display(),
        status.output_path
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_directory(args: DirectoryArgs) -> Result<ExitCode, String> {
    let config = config_from_args(&args.normalize)?;
    let files = logonorm_batch::discover_inputs(&args.directory).map_err(|e| e.to_string())?;
    if files.is_empty() {
        println!("No images found in directory.");
        return Ok(ExitCode::SUCCESS);
    }
    create_output_dir(&args.normalize.output_dir)?;

    let program = std::env::current_exe()
        .map_err(|e| format!("Error locating the logonorm executable: {e}"))?;
    let launcher = ProcessLauncher::new(
        program,
        args.normalize.output_dir,
        args.normalize.format,
        &config,
    )
    .map_err(|e| e.to_string())?;

    let stdout = std::io::stdout();
    let interactive = stdout.is_terminal();
    let mut table = LiveTable::new(stdout.lock(), interactive);
    let report = logonorm_batch::run_batch(&files, &launcher, args.max_workers, |rows| {
        if let Err(e) = table.update(rows) {
            tracing::warn!(error = %e, "failed to draw progress table");
        }
    })
    .map_err(|e| e.to_string())?;
    table
        .finish(&report.statuses)
        .map_err(|e| format!("Error writing progress table: {e}"))?;

    println!(
        "Processed {} files: {} completed, {} failed",
        report.statuses.len(),
        report.completed(),
        report.failed()
    );
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_worker(args: WorkerArgs) -> Result<ExitCode, String> {
    let config = parse_config_json(&args.config_json)?;
    let options = ProcessingOptions {
        file: args.file,
        output_dir: args.output_dir,
        format: args.format,
        config,
    };

    let status = worker::run_worker(&options, std::io::stdout().lock());
    Ok(if worker::exit_success(&status) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
