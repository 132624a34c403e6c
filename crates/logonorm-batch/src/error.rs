//! Errors raised outside the in-memory pipeline: filesystem access,
//! worker processes, and the status protocol.

use std::path::PathBuf;
use std::process::ExitStatus;

use logonorm_pipeline::PipelineError;

/// Errors that can occur while processing files or running a batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The normalization pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Reading an input file failed.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The file being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Writing an output file failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// The file being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Listing an input directory failed.
    #[error("failed to list {}: {source}", path.display())]
    ReadDir {
        /// The directory being listed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The input path has no file stem to name the output after.
    #[error("cannot derive an output name from {}", .0.display())]
    NoFileStem(PathBuf),

    /// A worker process could not be started.
    #[error("failed to start worker for {}: {source}", file.display())]
    Spawn {
        /// The file the worker was meant to process.
        file: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A worker process exited unsuccessfully.
    #[error("worker exited with {0}")]
    WorkerExit(ExitStatus),

    /// A status message could not be encoded or decoded.
    #[error("invalid status message: {0}")]
    Protocol(#[from] serde_json::Error),

    /// The worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// Any other I/O failure (worker pipes, terminal output).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
