//! # TuneShift
//!
//! Move playlists between Spotify, YouTube Music, SoundCloud and Tidal.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tuneshift::{build_adapter, Credential, MigrationConfig, Migrator, ServiceKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MigrationConfig::default();
//!     let spotify = build_adapter(ServiceKind::Spotify, &config)?;
//!     let tidal = build_adapter(ServiceKind::Tidal, &config)?;
//!     let spotify_token = Credential::new("spotify-access-token");
//!     let tidal_token = Credential::new("tidal-access-token");
//!
//!     let mut migrator = Migrator::new(
//!         spotify.as_ref(),
//!         &spotify_token,
//!         tidal.as_ref(),
//!         &tidal_token,
//!         config,
//!     );
//!     let report = migrator.run(&["37i9dQZF1DXcBWIGoYBM5M".to_string()]).await?;
//!     println!(
//!         "Migrated {}/{} tracks ({}%)",
//!         report.matched_tracks,
//!         report.total_tracks,
//!         report.success_rate()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## How tracks are matched
//!
//! A track with an ISRC is looked up by ISRC first when the destination
//! supports it. Otherwise, or when that finds nothing, the destination is
//! searched by title and first artist, and candidates are scored with a
//! bigram Dice coefficient (title weighted 0.6, artists 0.4) against the
//! destination's acceptance threshold.
//!
//! ## Lower-level pieces
//!
//! - [`ServiceAdapter`] and its four implementations in [`api`]
//! - [`TrackCursor`] for draining paged playlists
//! - [`RateLimiter`] for per-service call spacing and retry
//! - [`matching`] for normalization and scoring

pub mod api;
pub mod config;
pub mod converters;
pub mod error;
pub mod matching;
mod migrator;
pub mod models;
pub mod pagination;
pub mod rate_limit;
pub mod report;

#[cfg(test)]
mod testing;

// Main interface (recommended)
pub use migrator::{MatchResult, MigrationEvent, MigrationFailure, MigrationState, Migrator};

// Adapters
pub use api::{build_adapter, ServiceAdapter};

// Re-export commonly used types
pub use config::{MigrationConfig, ServiceSettings};
pub use error::{MigrateError, Result};
pub use matching::CandidatePolicy;
pub use models::{Candidate, Credential, Playlist, SearchQuery, ServiceKind, Track, TrackRef};
pub use pagination::{list_tracks, TrackCursor};
pub use rate_limit::RateLimiter;
pub use report::{JsonFileStore, MigrationRecord, MigrationReport, ReportStore, SkipReason};
