//! Migration reports and their persistence.
//!
//! [`ReportBuilder`] accumulates per-playlist results during a run and is
//! frozen into a [`MigrationReport`] at the end. A finished report can be
//! handed to a [`ReportStore`] for the caller's history view.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::ServiceKind;

/// Why a source track was not migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// No destination candidate reached the acceptance threshold.
    #[serde(rename = "No match found")]
    NoMatchFound,
    /// The destination search itself failed.
    #[serde(rename = "Search failed")]
    SearchFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NoMatchFound => "No match found",
            SkipReason::SearchFailed => "Search failed",
        })
    }
}

/// A track left behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTrack {
    pub name: String,
    pub artist: String,
    pub reason: SkipReason,
}

/// Per-playlist tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub name: String,
    pub total: usize,
    pub matched: usize,
}

impl PlaylistSummary {
    /// Tracks that were not migrated.
    pub fn skipped(&self) -> usize {
        self.total.saturating_sub(self.matched)
    }
}

/// A playlist that could not be migrated when the run was allowed to continue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedPlaylist {
    pub name: String,
    pub error: String,
}

/// Result of a run. `matched_tracks + skipped_tracks.len() == total_tracks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub total_tracks: usize,
    pub matched_tracks: usize,
    pub skipped_tracks: Vec<SkippedTrack>,
    pub playlists: Vec<PlaylistSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_playlists: Vec<FailedPlaylist>,
}

impl MigrationReport {
    /// Percentage of tracks migrated, rounded. 100 for an empty run.
    pub fn success_rate(&self) -> u32 {
        if self.total_tracks == 0 {
            return 100;
        }
        ((self.matched_tracks as f64 / self.total_tracks as f64) * 100.0).round() as u32
    }
}

/// Accumulates results for one run. Pure; no I/O.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    report: MigrationReport,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a migrated playlist's totals.
    pub fn add_playlist_result(&mut self, name: &str, total: usize, matched: usize) {
        self.report.total_tracks += total;
        self.report.matched_tracks += matched;
        self.report.playlists.push(PlaylistSummary {
            name: name.to_string(),
            total,
            matched,
        });
    }

    /// Record a track that was not migrated.
    pub fn add_skipped(&mut self, name: &str, artist: &str, reason: SkipReason) {
        self.report.skipped_tracks.push(SkippedTrack {
            name: name.to_string(),
            artist: artist.to_string(),
            reason,
        });
    }

    /// Record a playlist that failed without aborting the run.
    pub fn add_failed_playlist(&mut self, name: &str, error: &str) {
        self.report.failed_playlists.push(FailedPlaylist {
            name: name.to_string(),
            error: error.to_string(),
        });
    }

    /// Copy of the report so far.
    pub fn snapshot(&self) -> MigrationReport {
        self.report.clone()
    }

    /// Freeze the report.
    pub fn finalize(self) -> MigrationReport {
        self.report
    }
}

/// Outcome recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Completed,
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub id: Uuid,
    pub source: ServiceKind,
    pub destination: ServiceKind,
    pub status: RecordStatus,
    pub report: MigrationReport,
    pub created_at: DateTime<Utc>,
}

impl MigrationRecord {
    /// A record for a run that just completed.
    pub fn completed(source: ServiceKind, destination: ServiceKind, report: MigrationReport) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            destination,
            status: RecordStatus::Completed,
            report,
            created_at: Utc::now(),
        }
    }
}

/// Where finished reports go.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist one record.
    async fn save(&self, record: &MigrationRecord) -> Result<()>;
}

/// Appends records to a JSON-lines file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back, oldest first.
    pub async fn load(&self) -> Result<Vec<MigrationRecord>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Into::into))
            .collect()
    }
}

#[async_trait]
impl ReportStore for JsonFileStore {
    async fn save(&self, record: &MigrationRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Saved migration record {} to {}", record.id, self.path.display());
        Ok(())
    }
}
