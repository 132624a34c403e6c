//! Isolated worker processes.
//!
//! Each file of a batch is normalized in a child process running the
//! binary's hidden `worker` subcommand. The child prints one JSON-encoded
//! [`Status`] per line on stdout, ending with a terminal status; the
//! parent reads those lines and forwards them to the orchestrator. Child
//! stderr ends up in the parent's log at debug level. A crash
//! in one child cannot take down its siblings or the parent.
//!
//! ```text
//! parent                               child (logonorm worker <file> ...)
//!   |-- spawn ------------------------>|
//!   |<------------ {"file":..,"label":"Processing",..}
//!   |<------------ {"file":..,"label":"Completed",..}
//!   |<-- exit status ------------------|
//! ```

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use logonorm_pipeline::NormalizeConfig;

use crate::error::BatchError;
use crate::orchestrator::WorkerLauncher;
use crate::process::{ProcessingOptions, process_file};
use crate::status::{Status, StatusLabel};

/// Name of the subcommand that runs a single worker.
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Write one status line.
///
/// # Errors
///
/// Returns [`BatchError::Protocol`] if encoding fails and
/// [`BatchError::Io`] if the write fails.
pub fn write_status(out: &mut impl Write, status: &Status) -> Result<(), BatchError> {
    serde_json::to_writer(&mut *out, status)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// Parse one status line.
///
/// # Errors
///
/// Returns [`BatchError::Protocol`] if the line is not a JSON status.
pub fn read_status(line: &str) -> Result<Status, BatchError> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Worker side: normalize one file, streaming every status update to
/// `out`. Returns the terminal status.
pub fn run_worker(options: &ProcessingOptions, mut out: impl Write) -> Status {
    process_file(options, |status| {
        if let Err(e) = write_status(&mut out, status) {
            tracing::warn!(error = %e, "failed to report worker status");
        }
    })
}

/// Launches `<program> worker <file> ...` child processes.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    output_dir: PathBuf,
    format: String,
    config_json: String,
}

impl ProcessLauncher {
    /// Launcher that runs `program` (normally the current executable) with
    /// the given output settings and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Protocol`] if `config` cannot be serialized.
    pub fn new(
        program: PathBuf,
        output_dir: PathBuf,
        format: String,
        config: &NormalizeConfig,
    ) -> Result<Self, BatchError> {
        Ok(Self {
            program,
            output_dir,
            format,
            config_json: serde_json::to_string(config)?,
        })
    }

    fn command(&self, file: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(WORKER_SUBCOMMAND)
            .arg(file)
            .arg("--output-dir")
            .arg(&self.output_dir)
            .arg("--format")
            .arg(&self.format)
            .arg("--config-json")
            .arg(&self.config_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn run(&self, file: &Path, report: &mut dyn FnMut(Status)) -> Result<(), BatchError> {
        let mut child = self.command(file).spawn().map_err(|source| BatchError::Spawn {
            file: file.to_path_buf(),
            source,
        })?;
        tracing::debug!(file = %file.display(), pid = child.id(), "worker started");

        // Worker stderr is drained on its own thread so it never blocks the
        // child and never lands on the parent's terminal.
        let read = std::thread::scope(|scope| {
            if let Some(stderr) = child.stderr.take() {
                scope.spawn(move || forward_stderr(file, stderr));
            }
            let read = child
                .stdout
                .take()
                .map_or(Ok(()), |stdout| forward_statuses(file, stdout, report));
            if let Err(e) = &read {
                tracing::warn!(file = %file.display(), error = %e, "unreadable worker output, stopping worker");
                if let Err(e) = child.kill() {
                    tracing::debug!(file = %file.display(), error = %e, "failed to kill worker");
                }
            }
            read
        });

        let exit = child.wait()?;
        tracing::debug!(file = %file.display(), %exit, "worker exited");
        read?;
        if exit.success() {
            Ok(())
        } else {
            Err(BatchError::WorkerExit(exit))
        }
    }
}

fn forward_statuses(
    file: &Path,
    stdout: impl Read,
    report: &mut dyn FnMut(Status),
) -> io::Result<()> {
    for line in BufReader::new(stdout).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match read_status(&line) {
            Ok(status) => report(status),
            Err(e) => tracing::warn!(file = %file.display(), error = %e, "ignoring malformed worker output"),
        }
    }
    Ok(())
}

fn forward_stderr(file: &Path, stderr: impl Read) {
    for line in BufReader::new(stderr).lines().map_while(Result::ok) {
        tracing::debug!(file = %file.display(), "worker: {line}");
    }
}

/// Whether a worker's terminal status means the process should exit
/// successfully.
#[must_use]
pub const fn exit_success(status: &Status) -> bool {
    matches!(status.label, StatusLabel::Completed)
}
