//! Playlist migration orchestration.
//!
//! [`Migrator`] drives one run: for each selected source playlist it drains
//! the tracks, matches each one on the destination, creates the destination
//! playlist and appends the matches in batches. Playlists and tracks are
//! processed strictly in order, one call at a time, every call gated by the
//! per-service [`RateLimiter`].
//!
//! Per-track problems end up in the report. Playlist-level problems either
//! fail the run or, with `abort_on_playlist_failure = false`, are recorded
//! and skipped. An expired credential always fails the run. Nothing already
//! written to the destination is rolled back.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::api::ServiceAdapter;
use crate::config::MigrationConfig;
use crate::error::MigrateError;
use crate::matching::select_candidate;
use crate::models::{Credential, Playlist, SearchQuery, ServiceKind, Track, TrackRef};
use crate::pagination::{collect_playlists, TrackCursor};
use crate::rate_limit::RateLimiter;
use crate::report::{
    MigrationRecord, MigrationReport, ReportBuilder, ReportStore, SkipReason, SkippedTrack,
};

/// Where a run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    Idle,
    FetchingSource,
    Matching,
    Writing,
    Completed,
    Failed,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MigrationState::Idle => "idle",
            MigrationState::FetchingSource => "fetching source",
            MigrationState::Matching => "matching",
            MigrationState::Writing => "writing",
            MigrationState::Completed => "completed",
            MigrationState::Failed => "failed",
        })
    }
}

/// Progress notifications, sent as the run advances.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum MigrationEvent {
    StateChanged {
        state: MigrationState,
    },
    PlaylistStarted {
        name: String,
        index: usize,
        count: usize,
    },
    TrackProcessed {
        playlist: String,
        track: String,
        matched: bool,
        position: usize,
        total: usize,
    },
    PlaylistCompleted {
        name: String,
        matched: usize,
        total: usize,
    },
    PlaylistFailed {
        name: String,
        error: String,
    },
    Completed {
        report: MigrationReport,
    },
    Failed {
        error: String,
    },
}

/// Outcome of matching one source track.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Matched {
        destination: TrackRef,
        /// 1.0 for ISRC hits.
        score: f64,
    },
    Skipped {
        reason: SkipReason,
    },
}

/// A run that stopped early.
#[derive(Debug, Error)]
#[error("Migration failed while {state}: {error}")]
pub struct MigrationFailure {
    /// What went wrong.
    #[source]
    pub error: MigrateError,
    /// State the run was in when it failed.
    pub state: MigrationState,
    /// Playlists completed before the failure.
    pub partial_report: MigrationReport,
}

/// Result of one playlist, committed to the report only once it is written.
struct PlaylistOutcome {
    total: usize,
    matched: usize,
    skipped: Vec<SkippedTrack>,
}

/// Runs one migration from a source service to a destination service.
pub struct Migrator<'a> {
    source: &'a dyn ServiceAdapter,
    source_credential: &'a Credential,
    destination: &'a dyn ServiceAdapter,
    destination_credential: &'a Credential,
    config: MigrationConfig,
    limiters: HashMap<ServiceKind, RateLimiter>,
    report: ReportBuilder,
    state: MigrationState,
    events: Option<UnboundedSender<MigrationEvent>>,
    store: Option<&'a dyn ReportStore>,
}

impl<'a> Migrator<'a> {
    /// Create a migrator between two adapters.
    pub fn new(
        source: &'a dyn ServiceAdapter,
        source_credential: &'a Credential,
        destination: &'a dyn ServiceAdapter,
        destination_credential: &'a Credential,
        config: MigrationConfig,
    ) -> Self {
        Self {
            source,
            source_credential,
            destination,
            destination_credential,
            config,
            limiters: HashMap::new(),
            report: ReportBuilder::new(),
            state: MigrationState::Idle,
            events: None,
            store: None,
        }
    }

    /// Send progress events to `sender`.
    pub fn with_events(mut self, sender: UnboundedSender<MigrationEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Hand the finished report to `store`.
    pub fn with_store(mut self, store: &'a dyn ReportStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Current state.
    pub fn state(&self) -> MigrationState {
        self.state
    }

    fn emit(&self, event: MigrationEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                debug!("Progress receiver dropped");
            }
        }
    }

    fn set_state(&mut self, state: MigrationState) {
        if self.state != state {
            debug!("Migration state: {} -> {}", self.state, state);
            self.state = state;
            self.emit(MigrationEvent::StateChanged { state });
        }
    }

    /// One limiter per service, shared when source and destination are the same service.
    fn limiter(&mut self, kind: ServiceKind) -> &mut RateLimiter {
        let settings = self.config.service(kind);
        let retries = self.config.transport_retries;
        self.limiters
            .entry(kind)
            .or_insert_with(|| RateLimiter::from_settings(kind, settings, retries))
    }

    fn fail(&mut self, error: MigrateError) -> MigrationFailure {
        let state = self.state;
        error!("Migration failed while {}: {}", state, error);
        self.set_state(MigrationState::Failed);
        self.emit(MigrationEvent::Failed {
            error: error.to_string(),
        });

        MigrationFailure {
            error,
            state,
            partial_report: self.report.snapshot(),
        }
    }

    /// Migrate the selected source playlists, in selection order.
    ///
    /// Duplicate IDs are migrated once.
    pub async fn run(&mut self, selection: &[String]) -> Result<MigrationReport, MigrationFailure> {
        info!(
            "Migrating {} playlist(s) from {} to {}",
            selection.len(),
            self.source.kind(),
            self.destination.kind()
        );

        let mut seen = HashSet::new();
        let selection: Vec<&String> = selection.iter().filter(|id| seen.insert(*id)).collect();

        let available = if selection.is_empty() {
            Vec::new()
        } else {
            self.set_state(MigrationState::FetchingSource);
            match self.list_source_playlists().await {
                Ok(playlists) => playlists,
                Err(e) => return Err(self.fail(e)),
            }
        };

        let count = selection.len();
        for (index, id) in selection.into_iter().enumerate() {
            let result = match available.iter().find(|p| &p.id == id) {
                Some(playlist) => {
                    self.emit(MigrationEvent::PlaylistStarted {
                        name: playlist.name.clone(),
                        index,
                        count,
                    });
                    self.migrate_playlist(playlist)
                        .await
                        .map(|outcome| (playlist.name.as_str(), outcome))
                        .map_err(|e| (playlist.name.as_str(), e))
                }
                None => {
                    self.set_state(MigrationState::FetchingSource);
                    Err((
                        id.as_str(),
                        MigrateError::NotFound(format!(
                            "{} playlist {}",
                            self.source.kind(),
                            id
                        )),
                    ))
                }
            };

            match result {
                Ok((name, outcome)) => self.commit(name, outcome),
                Err((_, e)) if e.is_unauthorized() || self.config.abort_on_playlist_failure => {
                    return Err(self.fail(e));
                }
                Err((name, e)) => {
                    warn!("Skipping playlist {}: {}", name, e);
                    self.report.add_failed_playlist(name, &e.to_string());
                    self.emit(MigrationEvent::PlaylistFailed {
                        name: name.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        self.set_state(MigrationState::Completed);
        let report = std::mem::take(&mut self.report).finalize();
        info!(
            "Migration completed: {}/{} tracks ({}%)",
            report.matched_tracks,
            report.total_tracks,
            report.success_rate()
        );

        self.save_record(&report).await;
        self.emit(MigrationEvent::Completed {
            report: report.clone(),
        });
        Ok(report)
    }

    /// Every source playlist, one rate-limited call per page.
    async fn list_source_playlists(&mut self) -> Result<Vec<Playlist>, MigrateError> {
        let source = self.source;
        let credential = self.source_credential;
        let limiter = self.limiter(source.kind());
        collect_playlists(source, credential, Some(limiter)).await
    }

    async fn save_record(&self, report: &MigrationReport) {
        let Some(store) = self.store else {
            return;
        };
        let record =
            MigrationRecord::completed(self.source.kind(), self.destination.kind(), report.clone());
        if let Err(e) = store.save(&record).await {
            warn!("Could not save migration record: {}", e);
        }
    }

    fn commit(&mut self, name: &str, outcome: PlaylistOutcome) {
        info!(
            "Playlist {}: {}/{} tracks migrated",
            name, outcome.matched, outcome.total
        );
        self.report
            .add_playlist_result(name, outcome.total, outcome.matched);
        for skipped in &outcome.skipped {
            self.report
                .add_skipped(&skipped.name, &skipped.artist, skipped.reason);
        }
        self.emit(MigrationEvent::PlaylistCompleted {
            name: name.to_string(),
            matched: outcome.matched,
            total: outcome.total,
        });
    }

    async fn migrate_playlist(&mut self, playlist: &Playlist) -> Result<PlaylistOutcome, MigrateError> {
        self.set_state(MigrationState::FetchingSource);
        let tracks = self.fetch_tracks(&playlist.id).await?;
        info!("Fetched {} tracks from {}", tracks.len(), playlist.name);

        self.set_state(MigrationState::Matching);
        let total = tracks.len();
        let mut matched = Vec::new();
        let mut skipped = Vec::new();

        for (position, track) in tracks.iter().enumerate() {
            let result = self.match_track(track).await?;
            self.emit(MigrationEvent::TrackProcessed {
                playlist: playlist.name.clone(),
                track: track.name.clone(),
                matched: matches!(result, MatchResult::Matched { .. }),
                position,
                total,
            });

            match result {
                MatchResult::Matched { destination, score } => {
                    debug!("Matched {} (score {:.2})", track.name, score);
                    matched.push(destination);
                }
                MatchResult::Skipped { reason } => {
                    let artist = track.primary_artist().unwrap_or_default();
                    warn!("Skipped {} by {}: {}", track.name, artist, reason);
                    skipped.push(SkippedTrack {
                        name: track.name.clone(),
                        artist: artist.to_string(),
                        reason,
                    });
                }
            }
        }

        self.set_state(MigrationState::Writing);
        self.write_playlist(&playlist.name, &matched)
            .await
            .map_err(MigrateError::into_transfer_failure)?;

        Ok(PlaylistOutcome {
            total,
            matched: matched.len(),
            skipped,
        })
    }

    async fn fetch_tracks(&mut self, playlist_id: &str) -> Result<Vec<Track>, MigrateError> {
        let source = self.source;
        let credential = self.source_credential;
        let limiter = self.limiter(source.kind());
        TrackCursor::new(source, credential, playlist_id)
            .with_limiter(limiter)
            .collect_all()
            .await
    }

    /// Match one track on the destination. Only credential failures escape;
    /// every other error becomes a `SearchFailed` skip.
    pub async fn match_track(&mut self, track: &Track) -> Result<MatchResult, MigrateError> {
        let destination = self.destination;
        let credential = self.destination_credential;
        let kind = destination.kind();
        let threshold = self.config.service(kind).accept_threshold;
        let policy = self.config.candidate_policy;
        let limit = self.config.search_limit;

        if let Some(isrc) = track.isrc().filter(|_| destination.supports_isrc()) {
            let lookup = self
                .limiter(kind)
                .call(|| destination.search_by_isrc(credential, isrc))
                .await;
            match lookup {
                Ok(Some(candidate)) => {
                    return Ok(MatchResult::Matched {
                        destination: candidate.reference,
                        score: 1.0,
                    });
                }
                Ok(None) => debug!("No ISRC match for {}", isrc),
                Err(e) if e.is_unauthorized() => return Err(e),
                Err(e) => {
                    warn!("ISRC lookup for {} failed: {}", track.name, e);
                    return Ok(MatchResult::Skipped {
                        reason: SkipReason::SearchFailed,
                    });
                }
            }
        }

        let query = SearchQuery::for_track(track);
        let search = self
            .limiter(kind)
            .call(|| destination.search_candidates(credential, &query, limit))
            .await;

        match search {
            Ok(candidates) => Ok(match select_candidate(track, &candidates, threshold, policy) {
                Some((candidate, score)) => MatchResult::Matched {
                    destination: candidate.reference.clone(),
                    score,
                },
                None => MatchResult::Skipped {
                    reason: SkipReason::NoMatchFound,
                },
            }),
            Err(e) if e.is_unauthorized() => Err(e),
            Err(e) => {
                warn!("Search for {} failed: {}", track.name, e);
                Ok(MatchResult::Skipped {
                    reason: SkipReason::SearchFailed,
                })
            }
        }
    }

    /// Create the destination playlist and append `refs` in batches.
    async fn write_playlist(&mut self, name: &str, refs: &[TrackRef]) -> Result<String, MigrateError> {
        let destination = self.destination;
        let credential = self.destination_credential;
        let description = self.config.playlist_description.clone();
        let limiter = self.limiter(destination.kind());

        let playlist_id = limiter
            .call(|| destination.create_playlist(credential, name, &description))
            .await?;
        debug!("Created destination playlist {} ({})", name, playlist_id);

        let batch_size = limiter.batch_size().min(destination.max_batch_size()).max(1);
        for batch in refs.chunks(batch_size) {
            limiter
                .call(|| destination.append_batch(credential, &playlist_id, batch))
                .await?;
        }

        Ok(playlist_id)
    }
}
