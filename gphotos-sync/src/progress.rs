//! Progress reporting for upload runs

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Lifecycle of one album within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlbumState {
    Pending,
    Resolving,
    Uploading,
    Committing,
    Done,
    Failed,
}

impl fmt::Display for AlbumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlbumState::Pending => write!(f, "Pending"),
            AlbumState::Resolving => write!(f, "Resolving"),
            AlbumState::Uploading => write!(f, "Uploading"),
            AlbumState::Committing => write!(f, "Committing"),
            AlbumState::Done => write!(f, "Done"),
            AlbumState::Failed => write!(f, "Failed"),
        }
    }
}

/// Progress event types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgressEvent {
    RunStarted {
        run_id: Uuid,
        albums: usize,
        files: usize,
        bytes: u64,
    },
    AlbumStateChanged {
        album: String,
        state: AlbumState,
    },
    FileStaged {
        album: String,
        path: String,
        size: u64,
    },
    FileFailed {
        album: String,
        path: String,
        error: String,
    },
    BatchCommitted {
        album: String,
        items: usize,
        succeeded: usize,
    },
    RunFinished {
        run_id: Uuid,
        files_uploaded: usize,
        files_failed: usize,
        aborted: bool,
        duration: Duration,
    },
}

/// Receiving end of the progress events
pub struct ProgressChannel {
    receiver: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl ProgressChannel {
    pub fn new() -> (ProgressReporter, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(sender);
        (reporter, Self { receiver })
    }

    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.recv().await
    }

    /// Next buffered event, if any
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Sending end, cloned into every album worker.
///
/// A dropped [`ProgressChannel`] never fails the run; events are discarded.
#[derive(Clone)]
pub struct ProgressReporter {
    sender: mpsc::UnboundedSender<ProgressEvent>,
    start_time: Instant,
}

impl ProgressReporter {
    fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender,
            start_time: Instant::now(),
        }
    }

    pub fn run_started(&self, run_id: Uuid, albums: usize, files: usize, bytes: u64) {
        self.send(ProgressEvent::RunStarted {
            run_id,
            albums,
            files,
            bytes,
        });
    }

    pub fn album_state(&self, album: &str, state: AlbumState) {
        self.send(ProgressEvent::AlbumStateChanged {
            album: album.to_string(),
            state,
        });
    }

    pub fn file_staged(&self, album: &str, path: impl Into<String>, size: u64) {
        self.send(ProgressEvent::FileStaged {
            album: album.to_string(),
            path: path.into(),
            size,
        });
    }

    pub fn file_failed(&self, album: &str, path: impl Into<String>, error: impl Into<String>) {
        self.send(ProgressEvent::FileFailed {
            album: album.to_string(),
            path: path.into(),
            error: error.into(),
        });
    }

    pub fn batch_committed(&self, album: &str, items: usize, succeeded: usize) {
        self.send(ProgressEvent::BatchCommitted {
            album: album.to_string(),
            items,
            succeeded,
        });
    }

    pub fn run_finished(&self, run_id: Uuid, files_uploaded: usize, files_failed: usize, aborted: bool) {
        self.send(ProgressEvent::RunFinished {
            run_id,
            files_uploaded,
            files_failed,
            aborted,
            duration: self.start_time.elapsed(),
        });
    }

    fn send(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
