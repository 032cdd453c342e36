//! Spotify Web API adapter.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::http::{ApiClient, AuthScheme};
use super::ServiceAdapter;
use crate::config::ServiceSettings;
use crate::converters::{self, spotify as convert};
use crate::error::{MigrateError, Result};
use crate::models::{Candidate, Credential, Playlist, SearchQuery, ServiceKind, Track, TrackRef};
use crate::pagination::{Page, PageRequest, PageStyle};

/// Base URL for the Spotify Web API.
const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Spotify caps playlist item pages and write calls at 100.
const MAX_PAGE: usize = 100;

/// Largest page `/me/playlists` returns.
const MAX_PLAYLIST_PAGE: usize = 50;

/// Spotify adapter. Tracks are referenced by URI (`spotify:track:...`).
#[derive(Debug, Clone)]
pub struct SpotifyAdapter {
    api: ApiClient,
}

impl SpotifyAdapter {
    /// Create an adapter.
    pub fn new(settings: &ServiceSettings) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(ServiceKind::Spotify, API_BASE_URL, settings, AuthScheme::Bearer)?,
        })
    }

    async fn current_user_id(&self, credential: &Credential) -> Result<String> {
        let me = self.api.get(credential, "me", &[]).await?;
        converters::get_id(&me, "id")
            .ok_or_else(|| MigrateError::Api("Spotify /me returned no user ID".to_string()))
    }
}

/// Field-filtered search query: `track:<title> artist:<artist>`.
pub fn search_query(query: &SearchQuery) -> String {
    if query.artist.is_empty() {
        format!("track:{}", query.title)
    } else {
        format!("track:{} artist:{}", query.title, query.artist)
    }
}

#[async_trait]
impl ServiceAdapter for SpotifyAdapter {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Spotify
    }

    fn page_style(&self) -> PageStyle {
        PageStyle::OffsetLimit
    }

    fn page_limit(&self) -> usize {
        MAX_PAGE
    }

    fn max_batch_size(&self) -> usize {
        MAX_PAGE
    }

    fn supports_isrc(&self) -> bool {
        true
    }

    fn playlist_page_limit(&self) -> usize {
        MAX_PLAYLIST_PAGE
    }

    async fn fetch_playlist_page(
        &self,
        credential: &Credential,
        request: &PageRequest,
    ) -> Result<Page<Playlist>> {
        let json = self
            .api
            .get(
                credential,
                "me/playlists",
                &[
                    ("offset", request.offset.to_string()),
                    ("limit", request.limit.min(MAX_PLAYLIST_PAGE).to_string()),
                ],
            )
            .await?;
        Ok(convert::parse_playlist_page(&json))
    }

    async fn fetch_track_page(
        &self,
        credential: &Credential,
        playlist_id: &str,
        request: &PageRequest,
    ) -> Result<Page<Track>> {
        let json = self
            .api
            .get(
                credential,
                &format!("playlists/{}/tracks", playlist_id),
                &[
                    ("offset", request.offset.to_string()),
                    ("limit", request.limit.min(MAX_PAGE).to_string()),
                ],
            )
            .await?;
        convert::parse_track_page(&json)
    }

    async fn search_candidates(
        &self,
        credential: &Credential,
        query: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let json = self
            .api
            .get(
                credential,
                "search",
                &[
                    ("q", search_query(query)),
                    ("type", "track".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(convert::parse_search(&json))
    }

    async fn search_by_isrc(&self, credential: &Credential, isrc: &str) -> Result<Option<Candidate>> {
        let json = self
            .api
            .get(
                credential,
                "search",
                &[
                    ("q", format!("isrc:{}", isrc)),
                    ("type", "track".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(convert::parse_search(&json).into_iter().next())
    }

    async fn create_playlist(
        &self,
        credential: &Credential,
        name: &str,
        description: &str,
    ) -> Result<String> {
        let user_id = self.current_user_id(credential).await?;
        let body = json!({
            "name": name,
            "description": description,
            "public": false,
        });

        let created = self
            .api
            .post(credential, &format!("users/{}/playlists", user_id), &[], &body)
            .await?;
        let id = converters::get_id(&created, "id")
            .ok_or_else(|| MigrateError::Api("Spotify returned no playlist ID".to_string()))?;
        debug!("Created Spotify playlist {} for {}", id, user_id);
        Ok(id)
    }

    async fn append_batch(
        &self,
        credential: &Credential,
        playlist_id: &str,
        refs: &[TrackRef],
    ) -> Result<()> {
        let uris: Vec<&str> = refs.iter().map(TrackRef::as_str).collect();
        self.api
            .post(
                credential,
                &format!("playlists/{}/tracks", playlist_id),
                &[],
                &json!({ "uris": uris }),
            )
            .await?;
        Ok(())
    }
}
