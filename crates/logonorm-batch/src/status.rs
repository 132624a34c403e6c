//! Per-file processing status: the unit reported by workers and shown in
//! the progress table.

use std::fmt;
use std::path::Path;

use logonorm_pipeline::Step;
use serde::{Deserialize, Serialize};

/// Placeholder for fields that have no value yet.
pub const NOT_AVAILABLE: &str = "N/A";

/// Where a file is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLabel {
    /// Queued, no worker has picked it up yet.
    Waiting,
    /// A worker is running the pipeline.
    Processing,
    /// The output file was written.
    Completed,
    /// Processing stopped with the given error description.
    Failed(String),
}

impl StatusLabel {
    /// Whether no further updates are expected.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("Waiting"),
            Self::Processing => f.write_str("Processing"),
            Self::Completed => f.write_str("Completed"),
            Self::Failed(message) => write!(f, "Failed: {message}"),
        }
    }
}

/// Progress of one file.
///
/// Text fields hold display-ready values and read [`NOT_AVAILABLE`] until
/// known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// The input file.
    pub file: String,
    /// Visual percentage, two decimals.
    pub visual_percentage: String,
    /// Foreground percentage, two decimals.
    pub foreground_percentage: String,
    /// Where the output was written.
    pub output_path: String,
    /// Lifecycle state.
    pub label: StatusLabel,
    /// The step currently running.
    pub step_message: String,
}

impl Status {
    /// A fresh status for `file`, not yet picked up.
    #[must_use]
    pub fn waiting(file: &Path) -> Self {
        Self {
            file: file.display().to_string(),
            visual_percentage: NOT_AVAILABLE.to_string(),
            foreground_percentage: NOT_AVAILABLE.to_string(),
            output_path: NOT_AVAILABLE.to_string(),
            label: StatusLabel::Waiting,
            step_message: NOT_AVAILABLE.to_string(),
        }
    }

    /// Record that `step` started.
    pub fn start_step(&mut self, step: Step) {
        self.label = StatusLabel::Processing;
        self.step_message = step.message().to_string();
    }

    /// Record the latest coverage percentages.
    pub fn set_metrics(&mut self, visual: f64, foreground: f64) {
        self.visual_percentage = format!("{visual:.2}");
        self.foreground_percentage = format!("{foreground:.2}");
    }

    /// Mark the file as written to `output`.
    pub fn complete(&mut self, output: &Path) {
        self.output_path = output.display().to_string();
        self.step_message.clear();
        self.label = StatusLabel::Completed;
    }

    /// Mark the file as failed.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.label = StatusLabel::Failed(message.into());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_status_is_waiting_with_placeholders() {
        let status = Status::waiting(Path::new("logos/acme.png"));
        assert_eq!(status.file, "logos/acme.png");
        assert_eq!(status.visual_percentage, NOT_AVAILABLE);
        assert_eq!(status.output_path, NOT_AVAILABLE);
        assert_eq!(status.label, StatusLabel::Waiting);
    }

    #[test]
    fn metrics_use_two_decimals() {
        let mut status = Status::waiting(Path::new("a.png"));
        status.set_metrics(0.123_456, 1.0);
        assert_eq!(status.visual_percentage, "0.12");
        assert_eq!(status.foreground_percentage, "1.00");
    }

    #[test]
    fn lifecycle() {
        let mut status = Status::waiting(Path::new("a.png"));
        status.start_step(Step::Morphing);
        assert_eq!(status.label, StatusLabel::Processing);
        assert_eq!(status.step_message, "Morphing to percentage");
        assert!(!status.label.is_terminal());

        status.complete(Path::new("out/a.png"));
        assert_eq!(status.label, StatusLabel::Completed);
        assert_eq!(status.output_path, "out/a.png");
        assert!(status.step_message.is_empty());
        assert!(status.label.is_terminal());
    }

    #[test]
    fn failure_label_carries_the_message() {
        let mut status = Status::waiting(Path::new("a.png"));
        status.fail("no contours found in the image");
        assert!(status.label.is_terminal());
        assert_eq!(status.label.to_string(), "Failed: no contours found in the image");
    }

    #[test]
    fn json_round_trip() {
        let mut status = Status::waiting(Path::new("a.png"));
        status.fail("boom");
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(serde_json::from_str::<Status>(&json).unwrap(), status);
    }
}
