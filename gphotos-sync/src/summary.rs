//! Aggregated outcome of an upload run

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::albums::Album;
use crate::progress::{format_bytes, AlbumState};

/// Label used in logs and reports for loose library items
pub const LIBRARY_LABEL: &str = "<library>";

/// A file that did not make it into the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Final state of one album folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumReport {
    /// Album title, `None` for loose library items
    pub name: Option<String>,
    pub path: PathBuf,
    pub state: AlbumState,
    pub files_uploaded: usize,
    pub files_failed: usize,
    /// Files never attempted because the album failed or the run was aborted
    pub files_skipped: usize,
    pub bytes_uploaded: u64,
    /// Why the album failed, when it did
    pub error: Option<String>,
}

impl AlbumReport {
    pub fn new(name: Option<&str>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.map(str::to_string),
            path: path.into(),
            state: AlbumState::Pending,
            files_uploaded: 0,
            files_failed: 0,
            files_skipped: 0,
            bytes_uploaded: 0,
            error: None,
        }
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(LIBRARY_LABEL)
    }
}

/// Everything a run did, in album order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub albums_created: usize,
    pub albums_reused: usize,
    pub files_uploaded: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
    pub bytes_uploaded: u64,
    pub albums: Vec<AlbumReport>,
    /// Per-file failures in processing order
    pub failures: Vec<FileFailure>,
    pub aborted: bool,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            albums_created: 0,
            albums_reused: 0,
            files_uploaded: 0,
            files_failed: 0,
            files_skipped: 0,
            bytes_uploaded: 0,
            albums: Vec::new(),
            failures: Vec::new(),
            aborted: false,
        }
    }

    /// Count distinct albums resolved during the run
    pub fn record_albums(&mut self, albums: &[Album]) {
        self.albums_created = albums.iter().filter(|a| a.created).count();
        self.albums_reused = albums.len() - self.albums_created;
    }

    /// Fold one finished album in, with its failures in file order
    pub fn record_album(&mut self, report: AlbumReport, failures: Vec<FileFailure>) {
        self.files_uploaded += report.files_uploaded;
        self.files_failed += failures.len();
        self.files_skipped += report.files_skipped;
        self.bytes_uploaded += report.bytes_uploaded;
        self.failures.extend(failures);
        self.albums.push(report);
    }

    pub fn failed_albums(&self) -> impl Iterator<Item = &AlbumReport> {
        self.albums.iter().filter(|a| a.state == AlbumState::Failed)
    }

    /// No file, album or run-level failure
    pub fn is_successful(&self) -> bool {
        !self.aborted && self.files_failed == 0 && self.failed_albums().next().is_none()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Stamp the end time and log the totals
    pub fn complete(&mut self) {
        self.finished_at = Some(Utc::now());

        info!(
            run_id = %self.run_id,
            duration_secs = self.duration().num_milliseconds() as f64 / 1000.0,
            albums_created = self.albums_created,
            albums_reused = self.albums_reused,
            albums_failed = self.failed_albums().count(),
            files_uploaded = self.files_uploaded,
            files_failed = self.files_failed,
            files_skipped = self.files_skipped,
            bytes_uploaded = self.bytes_uploaded,
            aborted = self.aborted,
            "Upload run completed"
        );
    }

    /// Human-readable report for the terminal
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Upload summary ({})", self.run_id);
        if self.aborted {
            let _ = writeln!(out, "  Run was aborted before all work finished");
        }
        let _ = writeln!(
            out,
            "  Albums: {} created, {} reused, {} failed",
            self.albums_created,
            self.albums_reused,
            self.failed_albums().count()
        );
        let _ = writeln!(
            out,
            "  Files:  {} uploaded ({}), {} failed, {} skipped",
            self.files_uploaded,
            format_bytes(self.bytes_uploaded),
            self.files_failed,
            self.files_skipped
        );

        for album in self.failed_albums() {
            let _ = writeln!(
                out,
                "  Album '{}' failed: {}",
                album.label(),
                album.error.as_deref().unwrap_or("aborted")
            );
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out, "  Failed files:");
            for failure in &self.failures {
                let _ = writeln!(out, "    {}: {}", failure.path.display(), failure.reason);
            }
        }

        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(name: &str, reason: &str) -> FileFailure {
        FileFailure {
            path: PathBuf::from(format!("/photos/Events/{}", name)),
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_record_album() {
        let mut summary = RunSummary::new();
        let mut report = AlbumReport::new(Some("Events"), "/photos/Events");
        report.state = AlbumState::Done;
        report.files_uploaded = 2;
        report.files_failed = 1;
        report.bytes_uploaded = 2048;

        summary.record_album(report, vec![failure("IMG_2.jpg", "rejected")]);

        assert_eq!(summary.files_uploaded, 2);
        assert_eq!(summary.files_failed, 1);
        assert_eq!(summary.bytes_uploaded, 2048);
        assert_eq!(summary.failures[0].path, PathBuf::from("/photos/Events/IMG_2.jpg"));
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_album_counts() {
        let mut summary = RunSummary::new();
        summary.record_albums(&[
            Album { name: "A".into(), id: "1".into(), created: true },
            Album { name: "B".into(), id: "2".into(), created: false },
            Album { name: "C".into(), id: "3".into(), created: true },
        ]);

        assert_eq!(summary.albums_created, 2);
        assert_eq!(summary.albums_reused, 1);
        assert!(summary.is_successful());
    }

    #[test]
    fn test_failed_album_in_report() {
        let mut summary = RunSummary::new();
        let mut report = AlbumReport::new(Some("Trips"), "/photos/Trips");
        report.state = AlbumState::Failed;
        report.files_skipped = 3;
        report.error = Some("backend unavailable".to_string());
        summary.record_album(report, Vec::new());
        summary.complete();

        assert!(!summary.is_successful());
        assert_eq!(summary.files_skipped, 3);
        assert!(summary.finished_at.is_some());
        let text = summary.report();
        assert!(text.contains("Album 'Trips' failed: backend unavailable"));
        assert!(text.contains("3 skipped"));
    }

    #[test]
    fn test_aborted_run_is_not_successful() {
        let mut summary = RunSummary::new();
        summary.aborted = true;
        assert!(!summary.is_successful());
        assert!(summary.report().contains("aborted"));
    }

    #[test]
    fn test_json_output() {
        let mut summary = RunSummary::new();
        let report = AlbumReport::new(None, "/photos");
        assert_eq!(report.label(), LIBRARY_LABEL);
        summary.record_album(report, vec![failure("IMG_3.jpg", "Could not read file")]);

        let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(json["files_failed"], 1);
        assert_eq!(json["failures"][0]["reason"], "Could not read file");
        assert_eq!(json["albums"][0]["name"], serde_json::Value::Null);
        assert_eq!(json["aborted"], false);
    }
}
