//! logonorm-batch: files, worker processes, and batch orchestration.
//!
//! Everything around the in-memory pipeline that touches the outside
//! world lives here:
//!
//! - [`process_file`] reads one image, runs the pipeline, writes the
//!   output, and reports progress as [`Status`] records.
//! - [`worker`] runs a file in an isolated child process and streams its
//!   statuses back as JSON lines.
//! - [`run_batch`] processes many files with a bounded number of workers
//!   alive at a time, merging their statuses into one view.
//! - [`table`] renders that view.

pub mod error;
pub mod orchestrator;
pub mod process;
pub mod status;
pub mod table;
pub mod worker;

pub use error::BatchError;
pub use orchestrator::{
    BatchReport, WorkerLauncher, default_max_workers, discover_inputs, run_batch,
};
pub use process::{ProcessingOptions, process_file};
pub use status::{Status, StatusLabel};
pub use worker::ProcessLauncher;
