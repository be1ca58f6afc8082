//! Scripted downloads.
//!
//! A download works through a job of remote files. Jobs advance only when
//! the test pumps them, so byte counters are deterministic. Combining two
//! downloads moves the files of one job into the other and points both
//! downloads at the merged job.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use depot_assets::native::{DownloadOperation, NativeOperation};
use depot_assets::{DownloadCaps, DownloadTelemetry};
use parking_lot::Mutex;

/// A file the mock server can deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub location: String,
    pub bytes: u64,
    pub tags: Vec<String>,
}

impl RemoteFile {
    pub fn new(location: impl Into<String>, bytes: u64) -> Self {
        Self {
            location: location.into(),
            bytes,
            tags: Vec::new(),
        }
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Paused,
    Succeeded,
    Failed(String),
    Canceled,
}

impl JobState {
    fn is_finished(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed(_) | JobState::Canceled)
    }
}

struct DownloadJob {
    files: Vec<RemoteFile>,
    /// Bytes received per file, parallel to `files`.
    received: Vec<u64>,
    state: JobState,
}

impl DownloadJob {
    fn new(files: Vec<RemoteFile>) -> Self {
        let received = vec![0; files.len()];
        Self {
            files,
            received,
            state: JobState::Idle,
        }
    }

    fn telemetry(&self) -> DownloadTelemetry {
        DownloadTelemetry {
            total_count: self.files.len() as u32,
            current_count: self
                .files
                .iter()
                .zip(&self.received)
                .filter(|(file, received)| **received >= file.bytes)
                .count() as u32,
            total_bytes: self.files.iter().map(|file| file.bytes).sum(),
            current_bytes: self.received.iter().sum(),
        }
    }

    /// Deliver up to `budget` bytes. Returns the bytes delivered.
    fn pump(&mut self, mut budget: u64) -> u64 {
        if self.state != JobState::Running {
            return 0;
        }
        let mut delivered = 0;
        for (file, received) in self.files.iter().zip(self.received.iter_mut()) {
            let step = (file.bytes - *received).min(budget);
            *received += step;
            budget -= step;
            delivered += step;
        }
        if self.files.iter().zip(&self.received).all(|(file, received)| *received >= file.bytes) {
            self.state = JobState::Succeeded;
        }
        delivered
    }

    fn start(&mut self) {
        if self.state == JobState::Idle {
            self.state = JobState::Running;
            // Nothing to fetch
            self.pump(0);
        }
    }
}

struct DownloadShared {
    label: String,
    job: Mutex<Arc<Mutex<DownloadJob>>>,
    caps: DownloadCaps,
    releases: AtomicUsize,
    canceled: AtomicBool,
    /// Deliver everything as soon as the download begins.
    instant: AtomicBool,
}

impl DownloadShared {
    fn job(&self) -> Arc<Mutex<DownloadJob>> {
        Arc::clone(&self.job.lock())
    }
}

/// A download driven by [`DownloadProbe::pump`].
pub struct MockDownload {
    shared: Arc<DownloadShared>,
}

impl MockDownload {
    pub fn new(label: impl Into<String>, files: Vec<RemoteFile>, caps: DownloadCaps) -> (Self, DownloadProbe) {
        let shared = Arc::new(DownloadShared {
            label: label.into(),
            job: Mutex::new(Arc::new(Mutex::new(DownloadJob::new(files)))),
            caps,
            releases: AtomicUsize::new(0),
            canceled: AtomicBool::new(false),
            instant: AtomicBool::new(false),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            DownloadProbe { shared },
        )
    }

    /// Finish the whole job when [`begin`](DownloadOperation::begin) is called.
    pub fn finishing_on_begin(self) -> Self {
        self.shared.instant.store(true, Ordering::SeqCst);
        self
    }
}

impl NativeOperation for MockDownload {
    fn is_done(&self) -> bool {
        self.shared.job().lock().state.is_finished()
    }

    fn progress(&self) -> f32 {
        let job = self.shared.job();
        let job = job.lock();
        if job.state.is_finished() {
            return 1.0;
        }
        let telemetry = job.telemetry();
        if telemetry.total_bytes == 0 {
            0.0
        } else {
            telemetry.current_bytes as f32 / telemetry.total_bytes as f32
        }
    }

    fn error(&self) -> Option<String> {
        match &self.shared.job().lock().state {
            JobState::Failed(message) => Some(message.clone()),
            JobState::Canceled => Some("download canceled".to_string()),
            _ => None,
        }
    }

    fn release(&self) {
        self.shared.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl DownloadOperation for MockDownload {
    fn begin(&self) {
        let job = self.shared.job();
        let mut job = job.lock();
        job.start();
        if self.shared.instant.load(Ordering::SeqCst) {
            job.pump(u64::MAX);
        }
    }

    fn cancel(&self) {
        self.shared.canceled.store(true, Ordering::SeqCst);
        let job = self.shared.job();
        let mut job = job.lock();
        if !job.state.is_finished() {
            job.state = JobState::Canceled;
        }
    }

    fn capabilities(&self) -> DownloadCaps {
        self.shared.caps
    }

    fn pause(&self) {
        let job = self.shared.job();
        let mut job = job.lock();
        if job.state == JobState::Running {
            job.state = JobState::Paused;
        }
    }

    fn resume(&self) {
        let job = self.shared.job();
        let mut job = job.lock();
        if job.state == JobState::Paused {
            job.state = JobState::Running;
        }
    }

    fn telemetry(&self) -> DownloadTelemetry {
        self.shared.job().lock().telemetry()
    }

    fn combine(&self, other: &dyn DownloadOperation) -> bool {
        let Some(other) = other.as_any().downcast_ref::<MockDownload>() else {
            return false;
        };
        let target = self.shared.job();
        let source = other.shared.job();
        if Arc::ptr_eq(&target, &source) {
            return true;
        }

        let (files, received) = {
            let mut source = source.lock();
            if source.state.is_finished() {
                return false;
            }
            (std::mem::take(&mut source.files), std::mem::take(&mut source.received))
        };
        {
            let mut target = target.lock();
            target.files.extend(files);
            target.received.extend(received);
        }
        *other.shared.job.lock() = target;
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Test-side control over a [`MockDownload`].
#[derive(Clone)]
pub struct DownloadProbe {
    shared: Arc<DownloadShared>,
}

impl DownloadProbe {
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Deliver up to `bytes` bytes if the download is running.
    pub fn pump(&self, bytes: u64) -> u64 {
        self.shared.job().lock().pump(bytes)
    }

    /// Deliver every remaining byte if the download is running.
    pub fn finish(&self) {
        self.pump(u64::MAX);
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.shared.job().lock().state = JobState::Failed(message.into());
    }

    pub fn state(&self) -> JobState {
        self.shared.job().lock().state.clone()
    }

    pub fn telemetry(&self) -> DownloadTelemetry {
        self.shared.job().lock().telemetry()
    }

    /// Locations this download will fetch.
    pub fn locations(&self) -> Vec<String> {
        self.shared
            .job()
            .lock()
            .files
            .iter()
            .map(|file| file.location.clone())
            .collect()
    }

    /// Whether both probes now share one job.
    pub fn shares_job_with(&self, other: &DownloadProbe) -> bool {
        Arc::ptr_eq(&self.shared.job(), &other.shared.job())
    }

    pub fn was_canceled(&self) -> bool {
        self.shared.canceled.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.shared.releases.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for DownloadProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadProbe")
            .field("label", &self.shared.label)
            .field("state", &self.state())
            .field("releases", &self.release_count())
            .finish()
    }
}
