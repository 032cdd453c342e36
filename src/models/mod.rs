//! Data models shared by every service adapter.
//!
//! Each adapter maps its own response shapes into these types, so the
//! matching and transfer code never sees service-specific JSON.

pub mod common;
pub mod playlist;
pub mod track;

// Re-exports for convenience
pub use common::{Credential, ServiceKind};
pub use playlist::Playlist;
pub use track::{Artist, Candidate, SearchQuery, Track, TrackRef};
