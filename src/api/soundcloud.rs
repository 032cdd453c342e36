//! SoundCloud API adapter.
//!
//! SoundCloud authenticates with an `OAuth` header rather than `Bearer`.
//! Playlists are written by replacing their full track list, so appending
//! reads the current list first.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::http::{ApiClient, AuthScheme};
use super::ServiceAdapter;
use crate::config::ServiceSettings;
use crate::converters::{self, soundcloud as convert};
use crate::error::{MigrateError, Result};
use crate::models::{Candidate, Credential, Playlist, SearchQuery, ServiceKind, Track, TrackRef};
use crate::pagination::{Page, PageRequest, PageStyle};

/// Base URL for the SoundCloud API.
const API_BASE_URL: &str = "https://api.soundcloud.com";

const MAX_PAGE: usize = 50;

/// SoundCloud adapter. Tracks are referenced by numeric ID.
#[derive(Debug, Clone)]
pub struct SoundcloudAdapter {
    api: ApiClient,
}

impl SoundcloudAdapter {
    /// Create an adapter.
    pub fn new(settings: &ServiceSettings) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(ServiceKind::Soundcloud, API_BASE_URL, settings, AuthScheme::OAuth)?,
        })
    }
}

/// Request body replacing a playlist's tracks.
fn tracks_body(ids: &[String]) -> Value {
    let tracks: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    json!({ "playlist": { "tracks": tracks } })
}

#[async_trait]
impl ServiceAdapter for SoundcloudAdapter {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Soundcloud
    }

    fn page_style(&self) -> PageStyle {
        PageStyle::Cursor
    }

    fn page_limit(&self) -> usize {
        MAX_PAGE
    }

    fn max_batch_size(&self) -> usize {
        MAX_PAGE
    }

    async fn fetch_playlist_page(
        &self,
        credential: &Credential,
        request: &PageRequest,
    ) -> Result<Page<Playlist>> {
        let json = match &request.token {
            Some(next_href) => self.api.get(credential, next_href, &[]).await?,
            None => {
                self.api
                    .get(
                        credential,
                        "me/playlists",
                        &[
                            ("linked_partitioning", "true".to_string()),
                            ("limit", request.limit.min(MAX_PAGE).to_string()),
                            ("show_tracks", "false".to_string()),
                        ],
                    )
                    .await?
            }
        };
        Ok(convert::parse_playlist_page(&json))
    }

    async fn fetch_track_page(
        &self,
        credential: &Credential,
        playlist_id: &str,
        request: &PageRequest,
    ) -> Result<Page<Track>> {
        // `next_href` already carries every query parameter.
        let json = match &request.token {
            Some(next_href) => self.api.get(credential, next_href, &[]).await?,
            None => {
                self.api
                    .get(
                        credential,
                        &format!("playlists/{}/tracks", playlist_id),
                        &[
                            ("linked_partitioning", "true".to_string()),
                            ("limit", request.limit.min(MAX_PAGE).to_string()),
                        ],
                    )
                    .await?
            }
        };
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
                "tracks",
                &[("q", query.plain()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(convert::parse_search(&json))
    }

    async fn create_playlist(
        &self,
        credential: &Credential,
        name: &str,
        description: &str,
    ) -> Result<String> {
        let body = json!({
            "playlist": {
                "title": name,
                "description": description,
                "sharing": "private",
                "tracks": [],
            },
        });

        let created = self.api.post(credential, "playlists", &[], &body).await?;
        converters::get_id(&created, "id")
            .ok_or_else(|| MigrateError::Api("SoundCloud returned no playlist ID".to_string()))
    }

    async fn append_batch(
        &self,
        credential: &Credential,
        playlist_id: &str,
        refs: &[TrackRef],
    ) -> Result<()> {
        let path = format!("playlists/{}", playlist_id);
        let current = self.api.get(credential, &path, &[]).await?;

        let mut ids = convert::playlist_track_ids(&current);
        ids.extend(refs.iter().map(|r| r.as_str().to_string()));

        self.api.put(credential, &path, &tracks_body(&ids)).await?;
        Ok(())
    }
}
