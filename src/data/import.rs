use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use anyhow::Context;

use super::calibration::calibrate;
use super::loader::read_raw_scan;
use super::model::{CalibratedSeries, CalibrationParameters, Delimiter};

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

/// Everything a worker needs; moved into the worker thread.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub path: PathBuf,
    pub delimiter: Delimiter,
    pub params: CalibrationParameters,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Success {
        path: PathBuf,
        series: CalibratedSeries,
    },
    Failure {
        path: PathBuf,
        message: String,
    },
}

/// Lifecycle of one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Idle,
    Running,
    Succeeded,
    Failed,
    Terminated,
}

enum WorkerMessage {
    Completed(ImportOutcome),
    /// Sent last, exactly once, whatever happened before.
    Terminated,
}

/// Read and calibrate one file. Runs on the worker thread.
pub fn run_import(request: &ImportRequest) -> anyhow::Result<CalibratedSeries> {
    let scan = read_raw_scan(&request.path, request.delimiter)
        .with_context(|| format!("reading {}", request.path.display()))?;
    let series = calibrate(&scan, request.params)
        .with_context(|| format!("calibrating {}", request.path.display()))?;
    Ok(series)
}

// ---------------------------------------------------------------------------
// ImportTask – one background import
// ---------------------------------------------------------------------------

/// Handle held by the UI thread for one background import.
///
/// The UI calls [`ImportTask::poll`] once per frame; it never blocks.
pub struct ImportTask {
    path: PathBuf,
    state: ImportState,
    rx: Option<Receiver<WorkerMessage>>,
    handle: Option<JoinHandle<()>>,
    outcome_taken: bool,
}

impl ImportTask {
    /// A task that has not been started.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: ImportState::Idle,
            rx: None,
            handle: None,
            outcome_taken: false,
        }
    }

    /// Start the worker thread for `request`.
    pub fn spawn(request: ImportRequest) -> Self {
        let mut task = Self::new(request.path.clone());
        task.start(request);
        task
    }

    fn start(&mut self, request: ImportRequest) {
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("fishx-import".into())
            .spawn(move || worker(request, tx));

        match spawned {
            Ok(handle) => {
                log::info!("Importing {}", self.path.display());
                self.handle = Some(handle);
                self.rx = Some(rx);
                self.state = ImportState::Running;
            }
            Err(e) => {
                log::error!("Failed to start import worker: {e}");
                // Feed the failure through the channel so poll() reports it.
                let (tx, rx) = mpsc::channel();
                let _ = tx.send(WorkerMessage::Completed(ImportOutcome::Failure {
                    path: self.path.clone(),
                    message: format!("cannot start import worker: {e}"),
                }));
                let _ = tx.send(WorkerMessage::Terminated);
                self.rx = Some(rx);
                self.state = ImportState::Running;
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == ImportState::Terminated
    }

    /// Drain pending worker messages without blocking.
    ///
    /// Returns the outcome the first time it is seen, `None` otherwise.
    pub fn poll(&mut self) -> Option<ImportOutcome> {
        let mut outcome = None;
        loop {
            let Some(rx) = &self.rx else {
                return outcome;
            };
            match rx.try_recv() {
                Ok(WorkerMessage::Completed(o)) => {
                    outcome = self.record(o);
                }
                Ok(WorkerMessage::Terminated) => {
                    self.terminate();
                }
                Err(TryRecvError::Empty) => return outcome,
                Err(TryRecvError::Disconnected) => {
                    // The worker died before sending its teardown signal.
                    if !self.outcome_taken {
                        outcome = self.record(ImportOutcome::Failure {
                            path: self.path.clone(),
                            message: "import worker stopped unexpectedly".into(),
                        });
                    }
                    self.terminate();
                }
            }
        }
    }

    /// Block until the worker has terminated and return its outcome, if it
    /// was not already handed out by [`poll`](Self::poll).
    pub fn wait(&mut self) -> Option<ImportOutcome> {
        let mut outcome = None;
        while let Some(rx) = &self.rx {
            match rx.recv() {
                Ok(WorkerMessage::Completed(o)) => outcome = self.record(o),
                Ok(WorkerMessage::Terminated) => self.terminate(),
                Err(_) => {
                    if !self.outcome_taken {
                        outcome = self.record(ImportOutcome::Failure {
                            path: self.path.clone(),
                            message: "import worker stopped unexpectedly".into(),
                        });
                    }
                    self.terminate();
                }
            }
        }
        outcome
    }

    fn record(&mut self, outcome: ImportOutcome) -> Option<ImportOutcome> {
        if self.outcome_taken {
            return None;
        }
        self.outcome_taken = true;
        self.state = match &outcome {
            ImportOutcome::Success { .. } => ImportState::Succeeded,
            ImportOutcome::Failure { .. } => ImportState::Failed,
        };
        Some(outcome)
    }

    fn terminate(&mut self) {
        self.rx = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("import worker for {} panicked", self.path.display());
            }
        }
        self.state = ImportState::Terminated;
    }
}

fn worker(request: ImportRequest, tx: Sender<WorkerMessage>) {
    let outcome = match run_import(&request) {
        Ok(series) => {
            log::info!(
                "Imported {} points from {}",
                series.len(),
                request.path.display()
            );
            ImportOutcome::Success {
                path: request.path,
                series,
            }
        }
        Err(e) => {
            log::error!("Import failed: {e:#}");
            ImportOutcome::Failure {
                path: request.path,
                message: format!("{e:#}"),
            }
        }
    };
    // The receiver may already be gone if the app is closing.
    let _ = tx.send(WorkerMessage::Completed(outcome));
    let _ = tx.send(WorkerMessage::Terminated);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("fishx-import-{}-{name}", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn request(path: PathBuf) -> ImportRequest {
        ImportRequest {
            path,
            delimiter: Delimiter::Comma,
            params: CalibrationParameters::new(10.0, 20.0),
        }
    }

    #[test]
    fn new_task_is_idle() {
        let mut task = ImportTask::new("scan.csv");
        assert_eq!(task.state(), ImportState::Idle);
        assert_eq!(task.poll(), None);
        assert_eq!(task.state(), ImportState::Idle);
    }

    #[test]
    fn successful_import_reports_once_and_terminates() {
        let path = temp_file("ok.csv", "Index,Value\n0,100\n1,11\n2,12\n3,13\n");
        let mut task = ImportTask::spawn(request(path.clone()));

        let outcome = task.wait();
        assert!(task.is_finished());
        match outcome {
            Some(ImportOutcome::Success { path: p, series }) => {
                assert_eq!(p, path);
                assert_eq!(series.angle(), &[14.447, 19.444]);
                assert_eq!(series.intensity(), &[11.0, 12.0]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(task.poll(), None);
        assert_eq!(task.wait(), None);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn failed_import_reports_a_message() {
        let path = temp_file("bad.csv", "Index,Reading\n0,1\n1,2\n2,3\n");
        let mut task = ImportTask::spawn(request(path.clone()));

        match task.wait() {
            Some(ImportOutcome::Failure { message, .. }) => {
                assert!(message.contains("Value"), "{message}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(task.state(), ImportState::Terminated);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn too_short_scan_fails_without_dataset() {
        let path = temp_file("short.csv", "Value\n1\n2\n");
        let mut task = ImportTask::spawn(request(path.clone()));
        assert!(matches!(task.wait(), Some(ImportOutcome::Failure { .. })));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn polling_eventually_delivers_the_outcome() {
        let path = temp_file("poll.csv", "Value\n0\n1\n2\n3\n4\n");
        let mut task = ImportTask::spawn(request(path.clone()));

        let mut seen = Vec::new();
        while !task.is_finished() {
            if let Some(o) = task.poll() {
                seen.push(o);
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], ImportOutcome::Success { .. }));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_fails() {
        let path = std::env::temp_dir().join("fishx-import-missing.csv");
        let mut task = ImportTask::spawn(request(path));
        assert!(matches!(task.wait(), Some(ImportOutcome::Failure { .. })));
    }
}
