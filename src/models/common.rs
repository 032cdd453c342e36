//! Common types shared across all models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

/// The music services a playlist can be moved between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Spotify: license-controlled catalog, offset/limit paging.
    Spotify,
    /// YouTube Music: quota-constrained video catalog, page-token paging.
    Youtube,
    /// SoundCloud: user-upload catalog, `next_href` paging.
    Soundcloud,
    /// Tidal: lossless catalog, item-count paging.
    Tidal,
}

impl ServiceKind {
    /// Get all services in display order.
    pub fn all() -> &'static [ServiceKind] {
        &[
            ServiceKind::Spotify,
            ServiceKind::Youtube,
            ServiceKind::Soundcloud,
            ServiceKind::Tidal,
        ]
    }

    /// Stable identifier used in config files and history records.
    pub fn id(&self) -> &'static str {
        match self {
            ServiceKind::Spotify => "spotify",
            ServiceKind::Youtube => "youtube",
            ServiceKind::Soundcloud => "soundcloud",
            ServiceKind::Tidal => "tidal",
        }
    }

    /// Human-readable service name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Spotify => "Spotify",
            ServiceKind::Youtube => "YouTube Music",
            ServiceKind::Soundcloud => "SoundCloud",
            ServiceKind::Tidal => "Tidal",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ServiceKind {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceKind::all()
            .iter()
            .copied()
            .find(|kind| kind.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MigrateError::Config(format!("Unknown service: {}", s)))
    }
}

/// Access token for one service, supplied by the caller's auth layer.
///
/// Opaque to this crate. `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw access token.
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(token.into())
    }

    /// The raw token, for building auth headers.
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
