//! Playlist model.

use serde::{Deserialize, Serialize};

/// A playlist as listed by a source service.
///
/// Read-only: the migration never modifies the source playlist and never
/// reuses an existing destination playlist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    /// Service-scoped playlist ID.
    pub id: String,

    /// Playlist title.
    pub name: String,

    /// Description, empty if none.
    #[serde(default)]
    pub description: String,

    /// Number of items the service reports (may include unplayable items).
    #[serde(default)]
    pub track_count: u32,

    /// Cover image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Last modification marker, in whatever form the service provides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,

    /// Owner display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Whether the playlist is public.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
}

impl Playlist {
    /// Create a playlist with an ID and name.
    pub fn new<S1: Into<String>, S2: Into<String>>(id: S1, name: S2) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}
