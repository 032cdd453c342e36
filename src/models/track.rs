//! Track-related models.
//!
//! [`Track`] is what a source service yields; [`Candidate`] is what a
//! destination search returns and what gets scored against a track.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An artist credited on a track.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    /// Artist name.
    pub name: String,

    /// Service-scoped artist ID, when the service exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Artist {
    /// Create an artist with only a name.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    /// Create an artist with name and service ID.
    pub fn with_id<S1: Into<String>, S2: Into<String>>(name: S1, id: S2) -> Self {
        Self {
            name: name.into(),
            id: Some(id.into()),
        }
    }
}

/// A track fetched from a source service.
///
/// Stored exactly as the service reported it; matching normalizes copies
/// of these fields at comparison time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Service-scoped track ID. Not portable across services.
    pub id: String,

    /// Track title.
    pub name: String,

    /// Credited artists, in service order.
    #[serde(default)]
    pub artists: Vec<Artist>,

    /// Album title, for services that have albums.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    /// Duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// International Standard Recording Code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
}

impl Track {
    /// Create a track with an ID and title.
    pub fn new<S1: Into<String>, S2: Into<String>>(id: S1, name: S2) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append an artist.
    pub fn with_artist<S: Into<String>>(mut self, name: S) -> Self {
        self.artists.push(Artist::new(name));
        self
    }

    /// Set the ISRC.
    pub fn with_isrc<S: Into<String>>(mut self, isrc: S) -> Self {
        self.isrc = Some(isrc.into());
        self
    }

    /// Get the primary artist name.
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }

    /// Get all artist names joined by a separator.
    pub fn artists_string(&self, separator: &str) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Get duration formatted as m:ss, if known.
    pub fn duration_formatted(&self) -> Option<String> {
        self.duration_ms.map(|ms| {
            let minutes = ms / 60_000;
            let seconds = (ms % 60_000) / 1000;
            format!("{}:{:02}", minutes, seconds)
        })
    }

    /// ISRC, ignoring empty strings some services send instead of null.
    pub fn isrc(&self) -> Option<&str> {
        self.isrc.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Reference a destination service accepts when adding a track to a playlist.
///
/// A Spotify URI, a YouTube video ID, a SoundCloud or Tidal numeric ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackRef(String);

impl TrackRef {
    /// Wrap a service-native reference.
    pub fn new<S: Into<String>>(reference: S) -> Self {
        Self(reference.into())
    }

    /// The raw reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A destination search result.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// What to pass to `append_tracks` if this candidate is accepted.
    pub reference: TrackRef,

    /// Title as the destination reports it.
    pub name: String,

    /// Artists as the destination reports them.
    pub artists: Vec<Artist>,
}

impl Candidate {
    /// Create a candidate with a single artist.
    pub fn new<S1, S2, S3>(reference: S1, name: S2, artist: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            reference: TrackRef::new(reference),
            name: name.into(),
            artists: vec![Artist::new(artist)],
        }
    }
}

/// Free-text search built from a source track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Track title.
    pub title: String,

    /// Primary artist, empty if the track has none.
    pub artist: String,
}

impl SearchQuery {
    /// Build the query for a source track: title plus first credited artist.
    pub fn for_track(track: &Track) -> Self {
        Self {
            title: track.name.clone(),
            artist: track.primary_artist().unwrap_or_default().to_string(),
        }
    }

    /// "title artist", the plain-text form most search endpoints take.
    pub fn plain(&self) -> String {
        format!("{} {}", self.title, self.artist).trim().to_string()
    }
}
