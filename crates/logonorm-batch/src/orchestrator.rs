//! Bounded-concurrency batch runs.
//!
//! A fixed-size `rayon` pool with `max_workers` threads admits workers:
//! each pool task launches one worker through a [`WorkerLauncher`] and
//! blocks until it exits, so at most `max_workers` are alive at once and
//! the next file starts as soon as a slot frees up. Every task sends the
//! statuses its worker reports, then an exit record, over one `mpsc`
//! channel. The calling thread is the single consumer: it updates the row
//! of the reporting file and re-renders at a fixed cadence. The batch is
//! done once every file has an exit record.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::error::BatchError;
use crate::status::{Status, StatusLabel};

/// Extensions (lowercase) accepted as batch inputs.
pub const INPUT_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "tiff", "bmp", "gif", "webp"];

/// How long the consumer waits for a message before re-checking.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Minimum time between two renders (10 Hz).
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Runs one file to completion in some isolated worker.
///
/// Implementations forward every status the worker produces to `report`,
/// in order, and return once the worker has exited.
pub trait WorkerLauncher: Sync {
    /// Run the worker for `file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker could not be started or exited
    /// abnormally.
    fn run(&self, file: &Path, report: &mut dyn FnMut(Status)) -> Result<(), BatchError>;
}

/// Outcome of a finished batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Final status of every file, in input order.
    pub statuses: Vec<Status>,
}

impl BatchReport {
    /// Number of files written successfully.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| s.label == StatusLabel::Completed)
            .count()
    }

    /// Number of files that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| matches!(s.label, StatusLabel::Failed(_)))
            .count()
    }

    /// Whether every file completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.completed() == self.statuses.len()
    }
}

enum Message {
    Status { index: usize, status: Status },
    Exited { index: usize, error: Option<String> },
}

/// Default worker count: a quarter of the available parallelism, at
/// least one.
#[must_use]
pub fn default_max_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| (n.get() / 4).max(1))
}

/// Regular files directly inside `dir` with an accepted image extension
/// (case-insensitive), sorted by path.
///
/// # Errors
///
/// Returns [`BatchError::ReadDir`] if the directory cannot be listed.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let read_dir_error = |source| BatchError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_dir_error)? {
        let path = entry.map_err(read_dir_error)?.path();
        if path.is_file() && has_input_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_input_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            INPUT_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
}

/// Process `files` with at most `max_workers` workers alive at a time.
///
/// `on_change` receives every row (in input order) whenever something
/// changed, at most once per [`REFRESH_INTERVAL`], and once more when the
/// batch is done.
///
/// A worker that exits without reporting a terminal status has its row
/// marked [`StatusLabel::Failed`].
///
/// # Errors
///
/// Returns [`BatchError::Pool`] if the worker pool cannot be built.
/// Per-file failures are reported in the returned [`BatchReport`].
pub fn run_batch<L: WorkerLauncher>(
    files: &[PathBuf],
    launcher: &L,
    max_workers: usize,
    mut on_change: impl FnMut(&[Status]),
) -> Result<BatchReport, BatchError> {
    let max_workers = max_workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .thread_name(|i| format!("logonorm-worker-{i}"))
        .build()?;
    tracing::info!(files = files.len(), max_workers, "starting batch");

    let mut rows: Vec<Status> = files.iter().map(|f| Status::waiting(f)).collect();
    on_change(&rows);

    pool.in_place_scope(|scope| {
        let (tx, rx) = mpsc::channel();
        for (index, file) in files.iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| run_one(launcher, index, file, &tx));
        }
        drop(tx);

        let mut exited = 0;
        let mut dirty = false;
        let mut last_render = Instant::now();
        while exited < files.len() {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(Message::Status { index, status }) => {
                    rows[index] = status;
                    dirty = true;
                }
                Ok(Message::Exited { index, error }) => {
                    exited += 1;
                    let row = &mut rows[index];
                    if !row.label.is_terminal() {
                        row.fail(error.unwrap_or_else(|| {
                            "worker exited without reporting a result".to_string()
                        }));
                    }
                    dirty = true;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if dirty && last_render.elapsed() >= REFRESH_INTERVAL {
                on_change(&rows);
                dirty = false;
                last_render = Instant::now();
            }
        }
    });

    on_change(&rows);
    let report = BatchReport { statuses: rows };
    tracing::info!(
        completed = report.completed(),
        failed = report.failed(),
        "batch finished"
    );
    Ok(report)
}

/// Pool task: run one worker, forward its statuses, then record its exit.
fn run_one<L: WorkerLauncher>(launcher: &L, index: usize, file: &Path, tx: &Sender<Message>) {
    let mut reported_terminal = false;
    let result = launcher.run(file, &mut |status| {
        reported_terminal = status.label.is_terminal();
        send(tx, Message::Status { index, status });
    });
    let error = unexpected_exit(reported_terminal, result);
    if let Some(e) = &error {
        tracing::warn!(file = %file.display(), error = %e, "worker failed");
    }
    send(
        tx,
        Message::Exited {
            index,
            error: error.map(|e| e.to_string()),
        },
    );
}

/// The launcher error worth surfacing. A worker that already reported a
/// terminal status exits non-zero on a failed file; that exit adds nothing.
fn unexpected_exit(
    reported_terminal: bool,
    result: Result<(), BatchError>,
) -> Option<BatchError> {
    match result {
        Err(e) if !reported_terminal => Some(e),
        Err(e) => {
            tracing::debug!(error = %e, "worker exit after a terminal status");
            None
        }
        Ok(()) => None,
    }
}

fn send(tx: &Sender<Message>, message: Message) {
    if tx.send(message).is_err() {
        tracing::debug!("status receiver is gone");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// In-process worker that tracks how many runs overlap.
    #[derive(Default)]
    struct FakeLauncher {
        alive: AtomicUsize,
        max_alive: AtomicUsize,
        started: AtomicUsize,
        /// Files whose worker "crashes" before reporting a result.
        crash: Vec<PathBuf>,
        /// Files whose pipeline fails cleanly.
        fail: Vec<PathBuf>,
    }

    impl WorkerLauncher for FakeLauncher {
        fn run(&self, file: &Path, report: &mut dyn FnMut(Status)) -> Result<(), BatchError> {
            let now_alive = self.alive.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_alive.fetch_max(now_alive, Ordering::SeqCst);
            self.started.fetch_add(1, Ordering::SeqCst);

            let mut status = Status::waiting(file);
            status.start_step(logonorm_pipeline::Step::Loading);
            report(status.clone());
            std::thread::sleep(Duration::from_millis(20));

            let result = if self.crash.iter().any(|f| f == file) {
                Err(BatchError::Io(std::io::Error::other("killed")))
            } else {
                let failed = self.fail.iter().any(|f| f == file);
                if failed {
                    status.fail("no contours found in the image");
                } else {
                    status.complete(&Path::new("out").join(file));
                }
                report(status);
                // Like a real worker, exit non-zero after reporting the failure.
                if failed {
                    Err(BatchError::Io(std::io::Error::other("exit status: 1")))
                } else {
                    Ok(())
                }
            };

            self.alive.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    fn files(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("logo-{i}.png"))).collect()
    }

    #[test]
    fn alive_workers_never_exceed_the_limit() {
        let files = files(12);
        let launcher = FakeLauncher::default();
        let report = run_batch(&files, &launcher, 3, |_| {}).unwrap();

        assert!(launcher.max_alive.load(Ordering::SeqCst) <= 3);
        assert_eq!(launcher.started.load(Ordering::SeqCst), 12);
        assert_eq!(launcher.alive.load(Ordering::SeqCst), 0);
        assert_eq!(report.completed(), 12);
        assert!(report.is_success());
    }

    #[test]
    fn single_worker_runs_files_one_at_a_time() {
        let files = files(4);
        let launcher = FakeLauncher::default();
        run_batch(&files, &launcher, 1, |_| {}).unwrap();
        assert_eq!(launcher.max_alive.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_workers_means_one() {
        let files = files(2);
        let launcher = FakeLauncher::default();
        let report = run_batch(&files, &launcher, 0, |_| {}).unwrap();
        assert_eq!(report.completed(), 2);
    }

    #[test]
    fn rows_stay_in_input_order() {
        let files = files(6);
        let launcher = FakeLauncher::default();
        let report = run_batch(&files, &launcher, 4, |_| {}).unwrap();
        let reported: Vec<&str> = report.statuses.iter().map(|s| s.file.as_str()).collect();
        let expected: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
        assert_eq!(reported, expected);
    }

    #[test]
    fn crashes_and_failures_are_reported_per_file() {
        let files = files(5);
        let launcher = FakeLauncher {
            crash: vec![files[1].clone()],
            fail: vec![files[3].clone()],
            ..FakeLauncher::default()
        };
        let report = run_batch(&files, &launcher, 2, |_| {}).unwrap();

        assert_eq!(report.completed(), 3);
        assert_eq!(report.failed(), 2);
        assert!(!report.is_success());
        assert_eq!(report.statuses[1].label, StatusLabel::Failed("killed".to_string()));
        assert_eq!(
            report.statuses[3].label,
            StatusLabel::Failed("no contours found in the image".to_string())
        );
    }

    #[test]
    fn exit_after_a_terminal_status_is_not_surfaced() {
        let exit = || Err(BatchError::Io(std::io::Error::other("exit status: 1")));
        assert!(unexpected_exit(true, exit()).is_none());
        assert!(unexpected_exit(false, exit()).is_some());
        assert!(unexpected_exit(false, Ok(())).is_none());
    }

    #[test]
    fn final_render_shows_every_file_finished() {
        let files = files(5);
        let launcher = FakeLauncher::default();
        let mut renders = Vec::new();
        run_batch(&files, &launcher, 2, |rows| renders.push(rows.to_vec())).unwrap();

        assert!(renders.len() >= 2);
        assert!(renders[0].iter().all(|s| s.label == StatusLabel::Waiting));
        assert!(renders.last().unwrap().iter().all(|s| s.label.is_terminal()));
    }

    #[test]
    fn empty_batch_finishes_immediately() {
        let launcher = FakeLauncher::default();
        let report = run_batch(&[], &launcher, 2, |_| {}).unwrap();
        assert!(report.statuses.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn discovers_images_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "c.webp", "notes.txt", "d.svg"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let found: Vec<String> = discover_inputs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, ["a.jpg", "b.PNG", "c.webp"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(matches!(
            discover_inputs(Path::new("/definitely/not/here")),
            Err(BatchError::ReadDir { .. })
        ));
    }
}
