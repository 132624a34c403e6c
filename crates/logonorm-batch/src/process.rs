//! One file through the pipeline: read, normalize, write.
//!
//! [`process_file`] never returns an error. Every failure ends up in the
//! returned [`Status`] as [`StatusLabel::Failed`], so callers (the CLI and
//! worker processes) always have a terminal record to report.

use std::path::{Path, PathBuf};

use logonorm_pipeline::{NormalizeConfig, Normalizer, ProgressSink, Step, codec};

use crate::error::BatchError;
use crate::status::{Status, StatusLabel};

/// Everything needed to normalize one file.
#[derive(Debug, Clone)]
pub struct ProcessingOptions {
    /// Input image.
    pub file: PathBuf,
    /// Directory the output is written into.
    pub output_dir: PathBuf,
    /// Output format as a file extension (`png`, `jpg`, ...).
    pub format: String,
    /// Pipeline configuration.
    pub config: NormalizeConfig,
}

impl ProcessingOptions {
    /// `output_dir/<input stem>.<format>`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::NoFileStem`] if the input path has no file
    /// name.
    pub fn output_path(&self) -> Result<PathBuf, BatchError> {
        let stem = self
            .file
            .file_stem()
            .ok_or_else(|| BatchError::NoFileStem(self.file.clone()))?;
        Ok(self
            .output_dir
            .join(format!("{}.{}", stem.to_string_lossy(), self.format)))
    }
}

/// Normalize one file, calling `on_update` after every status change.
///
/// Returns the terminal status: [`StatusLabel::Completed`] with the
/// output path, or [`StatusLabel::Failed`] with the error description.
pub fn process_file(options: &ProcessingOptions, on_update: impl FnMut(&Status)) -> Status {
    let mut reporter = StatusReporter {
        status: Status::waiting(&options.file),
        on_update,
    };
    reporter.update(|s| s.label = StatusLabel::Processing);

    match normalize_to_file(options, &mut reporter) {
        Ok(output) => {
            tracing::info!(file = %options.file.display(), output = %output.display(), "normalized");
            reporter.update(|s| s.complete(&output));
        }
        Err(e) => {
            tracing::info!(file = %options.file.display(), error = %e, "normalization failed");
            reporter.update(|s| s.fail(e.to_string()));
        }
    }
    reporter.status
}

fn normalize_to_file(
    options: &ProcessingOptions,
    sink: &mut impl ProgressSink,
) -> Result<PathBuf, BatchError> {
    let format = codec::format_from_extension(&options.format)?;
    let output = options.output_path()?;
    let normalizer = Normalizer::new(options.config.clone())?;

    let bytes = read(&options.file)?;
    let encoded = normalizer.normalize_bytes(&bytes, format, sink)?;
    std::fs::write(&output, encoded).map_err(|source| BatchError::Write {
        path: output.clone(),
        source,
    })?;
    Ok(output)
}

fn read(path: &Path) -> Result<Vec<u8>, BatchError> {
    std::fs::read(path).map_err(|source| BatchError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Adapts pipeline progress events into [`Status`] updates.
struct StatusReporter<F> {
    status: Status,
    on_update: F,
}

impl<F: FnMut(&Status)> StatusReporter<F> {
    fn update(&mut self, change: impl FnOnce(&mut Status)) {
        change(&mut self.status);
        (self.on_update)(&self.status);
    }
}

impl<F: FnMut(&Status)> ProgressSink for StatusReporter<F> {
    fn step(&mut self, step: Step) {
        self.update(|s| s.start_step(step));
    }

    fn metrics(&mut self, visual: f64, foreground: f64) {
        self.update(|s| s.set_metrics(visual, foreground));
    }
}
