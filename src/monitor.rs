//! Scan orchestration and the state it drives.
//!
//! A grant bumps the state's generation and hands out a [`ScanToken`]. The
//! scan worker walks the discovered files one at a time and reports
//! [`MonitorEvent`]s; only the owner of [`MonitorState`] applies them, and
//! events from a superseded generation are dropped.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::access::DirectoryAccessGateway;
use crate::discovery::list_csv_files;
use crate::error::{MonitorError, Result};
use crate::inference::InferenceClient;
use crate::ingest::read_file;
use crate::models::{DirectoryHandle, DiscoveredFile, EcgUploadRequest, InferenceResult, MonitorEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    Settled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Pending,
    Uploading,
    Done,
    Failed(String),
}

/// Lets a scan worker find out it has been superseded by a newer grant.
#[derive(Debug, Clone)]
pub struct ScanToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl ScanToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

#[derive(Debug)]
pub struct MonitorState {
    emotions: Vec<String>,
    songs: Vec<String>,
    /// Only the latest error is kept.
    error: Option<String>,
    files: Vec<(DiscoveredFile, FileStatus)>,
    directory: Option<DirectoryHandle>,
    phase: Phase,
    generation: Arc<AtomicU64>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            emotions: Vec::new(),
            songs: Vec::new(),
            error: None,
            files: Vec::new(),
            directory: None,
            phase: Phase::Idle,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn emotions(&self) -> &[String] {
        &self.emotions
    }

    pub fn songs(&self) -> &[String] {
        &self.songs
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn files(&self) -> &[(DiscoveredFile, FileStatus)] {
        &self.files
    }

    pub fn directory(&self) -> Option<&DirectoryHandle> {
        self.directory.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Ask the gateway for a directory. On success a new scan generation
    /// begins; on denial the error banner is set and nothing else changes.
    pub fn grant(
        &mut self,
        gateway: &dyn DirectoryAccessGateway,
        requested: Option<&Path>,
    ) -> Option<(DirectoryHandle, ScanToken)> {
        match gateway.request_access(requested) {
            Ok(handle) => {
                let token = self.begin_scan(handle.clone());
                Some((handle, token))
            }
            Err(e) => {
                warn!("{}", e);
                self.error = Some(e.to_string());
                None
            }
        }
    }

    /// Start a new generation for `handle`. Results of any earlier scan
    /// still in flight will be ignored from here on.
    pub fn begin_scan(&mut self, handle: DirectoryHandle) -> ScanToken {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.directory = Some(handle);
        self.files.clear();
        self.phase = Phase::Scanning;
        ScanToken {
            generation,
            current: Arc::clone(&self.generation),
        }
    }

    /// Apply one event. Returns `false` if it belonged to a stale scan.
    pub fn apply(&mut self, event: MonitorEvent) -> bool {
        if event.generation() != self.generation() {
            debug!(event_generation = event.generation(), "dropping stale scan event");
            return false;
        }
        match event {
            MonitorEvent::ScanStarted { files, .. } => {
                self.files = files.into_iter().map(|f| (f, FileStatus::Pending)).collect();
            }
            MonitorEvent::FileStarted { index, .. } => {
                self.set_status(index, FileStatus::Uploading);
            }
            MonitorEvent::FileCompleted { index, result, .. } => {
                self.set_status(index, FileStatus::Done);
                self.emotions = result.emotions;
                self.songs = result.songs;
            }
            MonitorEvent::FileFailed { index, message, .. } => {
                self.set_status(index, FileStatus::Failed(message.clone()));
                self.error = Some(message);
            }
            MonitorEvent::ScanFinished { .. } => {
                self.phase = Phase::Settled;
            }
        }
        true
    }

    fn set_status(&mut self, index: usize, status: FileStatus) {
        if let Some(entry) = self.files.get_mut(index) {
            entry.1 = status;
        }
    }

    pub fn processed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|(_, s)| matches!(s, FileStatus::Done | FileStatus::Failed(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|(_, s)| matches!(s, FileStatus::Failed(_)))
            .count()
    }
}

#[cfg(test)]
impl MonitorState {
    /// A state that has granted `dir` and discovered `names`, ready for
    /// further events under the returned generation.
    pub(crate) fn discovered(dir: &str, names: &[&str]) -> (Self, u64) {
        let dir = std::path::PathBuf::from(dir);
        let mut state = Self::new();
        let token = state.begin_scan(DirectoryHandle::new(dir.clone()));
        let generation = token.generation();
        state.apply(MonitorEvent::ScanStarted {
            generation,
            files: names.iter().map(|n| DiscoveredFile::new(dir.join(n))).collect(),
        });
        (state, generation)
    }
}

/// Read one file and submit it.
pub fn process_file(
    file: &DiscoveredFile,
    client: &dyn InferenceClient,
    api_key: Option<&str>,
) -> Result<InferenceResult> {
    let ecg_data = read_file(file)?;
    let request = EcgUploadRequest {
        ecg_data,
        filename: file.filename(),
        api_key: api_key.map(String::from),
    };
    client
        .submit(&request)
        .map_err(|e| MonitorError::NetworkFailure {
            path: file.path.clone(),
            message: e.to_string(),
        })
}

/// Discover and process every CSV file under `handle`, strictly in order.
pub fn run_scan(
    handle: &DirectoryHandle,
    client: &dyn InferenceClient,
    api_key: Option<&str>,
    token: &ScanToken,
    emit: &mut dyn FnMut(MonitorEvent),
) {
    let generation = token.generation();
    let files = list_csv_files(handle);
    info!(
        generation,
        count = files.len(),
        dir = %handle.path().display(),
        "scan started"
    );
    emit(MonitorEvent::ScanStarted {
        generation,
        files: files.clone(),
    });

    for (index, file) in files.iter().enumerate() {
        if !token.is_current() {
            info!(generation, "scan superseded, stopping");
            return;
        }
        emit(MonitorEvent::FileStarted { generation, index });
        match process_file(file, client, api_key) {
            Ok(result) => {
                debug!(file = %file.path.display(), emotions = ?result.emotions, "file processed");
                emit(MonitorEvent::FileCompleted {
                    generation,
                    index,
                    result,
                });
            }
            Err(e) => {
                warn!("{}", e);
                emit(MonitorEvent::FileFailed {
                    generation,
                    index,
                    message: e.to_string(),
                });
            }
        }
    }

    info!(generation, "scan finished");
    emit(MonitorEvent::ScanFinished { generation });
}

/// The inference client plus the settings every upload needs.
#[derive(Clone)]
pub struct Monitor {
    client: Arc<dyn InferenceClient>,
    api_key: Option<String>,
}

impl Monitor {
    pub fn new(client: Arc<dyn InferenceClient>, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }

    /// Run a scan on a worker thread, reporting through `tx`.
    pub fn spawn_scan(
        &self,
        handle: DirectoryHandle,
        token: ScanToken,
        tx: Sender<MonitorEvent>,
    ) -> JoinHandle<()> {
        let monitor = self.clone();
        std::thread::spawn(move || {
            run_scan(
                &handle,
                monitor.client.as_ref(),
                monitor.api_key.as_deref(),
                &token,
                &mut |event| {
                    let _ = tx.send(event);
                },
            );
        })
    }

    /// Run a scan on the calling thread, applying events as they happen.
    pub fn scan_blocking(&self, handle: &DirectoryHandle, token: &ScanToken, state: &mut MonitorState) {
        run_scan(
            handle,
            self.client.as_ref(),
            self.api_key.as_deref(),
            token,
            &mut |event| {
                state.apply(event);
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{mpsc, Mutex};
    use std::time::{Duration, Instant};

    use super::*;
    use crate::access::FsDirectoryAccess;
    use crate::inference::InferenceError;

    /// Answers by filename and records the order of submissions.
    #[derive(Default)]
    struct ScriptedClient {
        responses: HashMap<String, InferenceResult>,
        submitted: Mutex<Vec<EcgUploadRequest>>,
    }

    impl ScriptedClient {
        fn with(mut self, filename: &str, emotions: &[&str], songs: &[&str]) -> Self {
            self.responses.insert(
                filename.to_string(),
                InferenceResult {
                    emotions: emotions.iter().map(|s| s.to_string()).collect(),
                    songs: songs.iter().map(|s| s.to_string()).collect(),
                },
            );
            self
        }

        fn submitted_names(&self) -> Vec<String> {
            self.submitted
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.filename.clone())
                .collect()
        }
    }

    impl InferenceClient for ScriptedClient {
        fn submit(&self, request: &EcgUploadRequest) -> std::result::Result<InferenceResult, InferenceError> {
            self.submitted.lock().unwrap().push(request.clone());
            self.responses
                .get(&request.filename)
                .cloned()
                .ok_or(InferenceError::Status(500))
        }
    }

    /// Takes a while per request and records when each one ran.
    struct SlowClient {
        delay: Duration,
        spans: Mutex<Vec<(String, Instant, Instant)>>,
    }

    impl InferenceClient for SlowClient {
        fn submit(&self, request: &EcgUploadRequest) -> std::result::Result<InferenceResult, InferenceError> {
            let start = Instant::now();
            std::thread::sleep(self.delay);
            self.spans
                .lock()
                .unwrap()
                .push((request.filename.clone(), start, Instant::now()));
            Ok(InferenceResult {
                emotions: vec![request.filename.clone()],
                songs: Vec::new(),
            })
        }
    }

    fn write_files(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), format!("{}\n0.25,\n-0.5,\n", name)).unwrap();
        }
    }

    fn run(dir: &Path, client: Arc<ScriptedClient>) -> MonitorState {
        let mut state = MonitorState::new();
        let (handle, token) = state
            .grant(&FsDirectoryAccess, Some(dir))
            .expect("grant");
        Monitor::new(client, None).scan_blocking(&handle, &token, &mut state);
        state
    }

    #[test]
    fn test_single_file_result_is_shown() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["a.csv"]);
        let client = Arc::new(ScriptedClient::default().with("a.csv", &["calm"], &["http://x/1"]));

        let state = run(dir.path(), client.clone());

        assert_eq!(state.emotions, vec!["calm"]);
        assert_eq!(state.songs, vec!["http://x/1"]);
        assert_eq!(state.phase, Phase::Settled);
        assert!(state.error.is_none());

        let submitted = client.submitted.lock().unwrap();
        assert_eq!(submitted[0].ecg_data, "a.csv\n0.25,\n-0.5,\n");
    }

    #[test]
    fn test_later_result_overwrites_earlier() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["a.csv", "b.txt", "c.csv"]);
        let client = Arc::new(
            ScriptedClient::default()
                .with("a.csv", &["calm"], &["http://x/1"])
                .with("c.csv", &["stressed"], &[]),
        );

        let state = run(dir.path(), client.clone());

        assert_eq!(client.submitted_names(), vec!["a.csv", "c.csv"]);
        assert_eq!(state.emotions, vec!["stressed"]);
        assert!(state.songs.is_empty());
        assert_eq!(state.files.len(), 2);
        assert_eq!(state.processed_count(), 2);
    }

    #[test]
    fn test_failure_sets_error_and_keeps_going() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["a.csv", "b.csv"]);
        let client = Arc::new(ScriptedClient::default().with("b.csv", &["happy"], &[]));

        let state = run(dir.path(), client.clone());

        assert_eq!(client.submitted_names(), vec!["a.csv", "b.csv"]);
        let error = state.error.as_deref().unwrap();
        assert!(error.starts_with("Error processing file"));
        assert!(error.contains("a.csv"));
        // Data and error coexist.
        assert_eq!(state.emotions, vec!["happy"]);
        assert_eq!(state.failed_count(), 1);
        assert!(matches!(state.files[0].1, FileStatus::Failed(_)));
        assert_eq!(state.files[1].1, FileStatus::Done);
    }

    #[test]
    fn test_same_content_twice_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["a.csv"]);
        let client = Arc::new(ScriptedClient::default().with("a.csv", &["neutral"], &["http://x/2"]));

        let first = run(dir.path(), client.clone());
        let second = run(dir.path(), client);

        assert_eq!(first.emotions, second.emotions);
        assert_eq!(first.songs, second.songs);
    }

    #[test]
    fn test_denied_grant_makes_no_calls() {
        let client = Arc::new(ScriptedClient::default());
        let mut state = MonitorState::new();

        assert!(state.grant(&FsDirectoryAccess, None).is_none());

        assert_eq!(
            state.error.as_deref(),
            Some("Permission to access directory was denied")
        );
        assert!(state.emotions.is_empty());
        assert!(state.songs.is_empty());
        assert_eq!(state.phase, Phase::Idle);
        assert!(client.submitted_names().is_empty());
    }

    #[test]
    fn test_listing_failure_settles_with_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(ScriptedClient::default());
        let mut state = MonitorState::new();
        let (handle, token) = state.grant(&FsDirectoryAccess, Some(dir.path())).unwrap();
        let path = dir.path().to_path_buf();
        drop(dir);
        assert!(!path.exists());

        Monitor::new(client.clone(), None).scan_blocking(&handle, &token, &mut state);

        assert!(state.files.is_empty());
        assert_eq!(state.phase, Phase::Settled);
        assert!(state.error.is_none());
        assert!(client.submitted_names().is_empty());
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = MonitorState::new();
        let (_, first) = state.grant(&FsDirectoryAccess, Some(dir.path())).unwrap();
        let (_, second) = state.grant(&FsDirectoryAccess, Some(dir.path())).unwrap();
        assert!(!first.is_current());
        assert!(second.is_current());

        let applied = state.apply(MonitorEvent::FileCompleted {
            generation: first.generation(),
            index: 0,
            result: InferenceResult {
                emotions: vec!["calm".to_string()],
                songs: Vec::new(),
            },
        });
        assert!(!applied);
        assert!(state.emotions.is_empty());
        assert_eq!(state.phase, Phase::Scanning);
    }

    #[test]
    fn test_superseded_scan_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["a.csv", "b.csv", "c.csv"]);
        let client = ScriptedClient::default()
            .with("a.csv", &["calm"], &[])
            .with("b.csv", &["sad"], &[])
            .with("c.csv", &["fear"], &[]);
        let mut state = MonitorState::new();
        let (handle, token) = state.grant(&FsDirectoryAccess, Some(dir.path())).unwrap();

        let mut events = Vec::new();
        run_scan(&handle, &client, None, &token, &mut |event| {
            if let MonitorEvent::FileCompleted { index: 0, .. } = &event {
                // A new grant lands while the first file is in flight.
                state.begin_scan(handle.clone());
            }
            events.push(event);
        });

        assert_eq!(client.submitted_names(), vec!["a.csv"]);
        assert!(!events
            .iter()
            .any(|e| matches!(e, MonitorEvent::ScanFinished { .. })));
    }

    #[test]
    fn test_spawned_scan_submits_one_at_a_time() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["a.csv", "b.csv", "c.csv"]);
        let client = Arc::new(SlowClient {
            delay: Duration::from_millis(30),
            spans: Mutex::new(Vec::new()),
        });
        let mut state = MonitorState::new();
        let (handle, token) = state.grant(&FsDirectoryAccess, Some(dir.path())).unwrap();

        let (tx, rx) = mpsc::channel();
        Monitor::new(client.clone(), None)
            .spawn_scan(handle, token, tx)
            .join()
            .unwrap();
        for event in rx.try_iter() {
            state.apply(event);
        }

        let spans = client.spans.lock().unwrap();
        let names: Vec<&str> = spans.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a.csv", "b.csv", "c.csv"]);
        for pair in spans.windows(2) {
            let previous_end = pair[0].2;
            let next_start = pair[1].1;
            assert!(next_start >= previous_end, "{} started before {} finished", pair[1].0, pair[0].0);
        }
        assert_eq!(state.emotions(), vec!["c.csv"]);
    }

    #[test]
    fn test_spawned_scan_reports_over_channel() {
        let dir = tempfile::tempdir().unwrap();
        write_files(dir.path(), &["a.csv"]);
        let client = Arc::new(ScriptedClient::default().with("a.csv", &["surprise"], &[]));
        let mut state = MonitorState::new();
        let (handle, token) = state.grant(&FsDirectoryAccess, Some(dir.path())).unwrap();

        let (tx, rx) = mpsc::channel();
        Monitor::new(client, Some("key".to_string()))
            .spawn_scan(handle, token, tx)
            .join()
            .unwrap();
        for event in rx.try_iter() {
            state.apply(event);
        }

        assert_eq!(state.emotions, vec!["surprise"]);
        assert_eq!(state.phase, Phase::Settled);
    }
}
