//! Service adapters.
//!
//! One [`ServiceAdapter`] implementation per supported service, all speaking
//! the same vocabulary: list playlists, page through a playlist's tracks,
//! search, create a playlist, append tracks. Which one is used is decided by
//! a [`ServiceKind`] tag through [`build_adapter`].
//!
//! Adapters are stateless apart from their HTTP client; credentials are
//! passed on every call.

pub mod http;
pub mod soundcloud;
pub mod spotify;
pub mod tidal;
pub mod youtube;

use async_trait::async_trait;

use crate::config::MigrationConfig;
use crate::error::Result;
use crate::models::{Candidate, Credential, Playlist, SearchQuery, ServiceKind, Track, TrackRef};
use crate::pagination::{collect_playlists, Page, PageRequest, PageStyle};

pub use http::{ApiClient, AuthScheme};
pub use soundcloud::SoundcloudAdapter;
pub use spotify::SpotifyAdapter;
pub use tidal::TidalAdapter;
pub use youtube::YoutubeAdapter;

/// Uniform interface to one music service.
#[async_trait]
pub trait ServiceAdapter: Send + Sync {
    /// Which service this adapter talks to.
    fn kind(&self) -> ServiceKind;

    /// How this service pages playlist items.
    fn page_style(&self) -> PageStyle;

    /// Items requested per page.
    fn page_limit(&self) -> usize;

    /// Largest number of references one write call accepts.
    fn max_batch_size(&self) -> usize;

    /// Whether [`ServiceAdapter::search_by_isrc`] can return anything.
    fn supports_isrc(&self) -> bool {
        false
    }

    /// Playlists requested per page of [`ServiceAdapter::list_playlists`].
    fn playlist_page_limit(&self) -> usize {
        50
    }

    /// Every playlist owned by the credential's user, across all pages.
    async fn list_playlists(&self, credential: &Credential) -> Result<Vec<Playlist>> {
        collect_playlists(self, credential, None).await
    }

    /// Fetch one page of the credential's playlists, paged like the track listing.
    async fn fetch_playlist_page(
        &self,
        credential: &Credential,
        request: &PageRequest,
    ) -> Result<Page<Playlist>>;

    /// Fetch one page of a playlist's tracks.
    async fn fetch_track_page(
        &self,
        credential: &Credential,
        playlist_id: &str,
        request: &PageRequest,
    ) -> Result<Page<Track>>;

    /// Free-text search returning up to `limit` candidates in the service's ranking order.
    async fn search_candidates(
        &self,
        credential: &Credential,
        query: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<Candidate>>;

    /// Exact lookup by ISRC.
    async fn search_by_isrc(&self, _credential: &Credential, _isrc: &str) -> Result<Option<Candidate>> {
        Ok(None)
    }

    /// Create a new private playlist and return its ID.
    async fn create_playlist(
        &self,
        credential: &Credential,
        name: &str,
        description: &str,
    ) -> Result<String>;

    /// Append one batch of at most [`ServiceAdapter::max_batch_size`] references.
    async fn append_batch(
        &self,
        credential: &Credential,
        playlist_id: &str,
        refs: &[TrackRef],
    ) -> Result<()>;

    /// Append any number of references, chunked to the service's batch size.
    ///
    /// Returns the number of write calls made.
    async fn append_tracks(
        &self,
        credential: &Credential,
        playlist_id: &str,
        refs: &[TrackRef],
    ) -> Result<usize> {
        let mut calls = 0;
        for chunk in refs.chunks(self.max_batch_size().max(1)) {
            self.append_batch(credential, playlist_id, chunk).await?;
            calls += 1;
        }
        Ok(calls)
    }
}

/// Build the adapter for `kind` using the settings in `config`.
pub fn build_adapter(kind: ServiceKind, config: &MigrationConfig) -> Result<Box<dyn ServiceAdapter>> {
    let settings = config.service(kind);
    let adapter: Box<dyn ServiceAdapter> = match kind {
        ServiceKind::Spotify => Box::new(SpotifyAdapter::new(settings)?),
        ServiceKind::Youtube => Box::new(YoutubeAdapter::new(settings)?),
        ServiceKind::Soundcloud => Box::new(SoundcloudAdapter::new(settings)?),
        ServiceKind::Tidal => Box::new(TidalAdapter::new(settings, &config.tidal_country_code)?),
    };
    Ok(adapter)
}
