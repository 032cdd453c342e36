//! YouTube Data API v3 adapter.
//!
//! YouTube has no batch insert: each video is added with its own
//! `playlistItems.insert` call, spaced by the configured request rate
//! since every insert costs quota. A write batch is therefore a single
//! video, so a retried batch never re-inserts a video that already landed.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::sleep;
use tracing::debug;

use super::http::{ApiClient, AuthScheme};
use super::ServiceAdapter;
use crate::config::ServiceSettings;
use crate::converters::{self, youtube as convert};
use crate::error::{MigrateError, Result};
use crate::models::{Candidate, Credential, Playlist, SearchQuery, ServiceKind, Track, TrackRef};
use crate::pagination::{Page, PageRequest, PageStyle};

/// Base URL for the YouTube Data API.
const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Largest `maxResults` YouTube accepts.
const MAX_PAGE: usize = 50;

/// Videos per write batch; one insert per call.
const INSERT_BATCH: usize = 1;

/// The "Music" video category.
const MUSIC_CATEGORY_ID: &str = "10";

/// YouTube adapter. Tracks are referenced by video ID.
#[derive(Debug, Clone)]
pub struct YoutubeAdapter {
    api: ApiClient,
    insert_interval: Duration,
}

impl YoutubeAdapter {
    /// Create an adapter.
    pub fn new(settings: &ServiceSettings) -> Result<Self> {
        let insert_interval = if settings.requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / settings.requests_per_second)
        } else {
            Duration::ZERO
        };

        Ok(Self {
            api: ApiClient::new(ServiceKind::Youtube, API_BASE_URL, settings, AuthScheme::Bearer)?,
            insert_interval,
        })
    }

    async fn insert_video(&self, credential: &Credential, playlist_id: &str, video: &TrackRef) -> Result<()> {
        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": video.as_str(),
                },
            },
        });
        self.api
            .post(credential, "playlistItems", &[("part", "snippet".to_string())], &body)
            .await?;
        Ok(())
    }
}

/// Query parameters for one page of `playlistItems.list`.
fn page_params(playlist_id: &str, request: &PageRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("part", "snippet,contentDetails".to_string()),
        ("playlistId", playlist_id.to_string()),
        ("maxResults", request.limit.min(MAX_PAGE).to_string()),
    ];
    if let Some(token) = &request.token {
        params.push(("pageToken", token.clone()));
    }
    params
}

#[async_trait]
impl ServiceAdapter for YoutubeAdapter {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Youtube
    }

    fn page_style(&self) -> PageStyle {
        PageStyle::Cursor
    }

    fn page_limit(&self) -> usize {
        MAX_PAGE
    }

    fn max_batch_size(&self) -> usize {
        INSERT_BATCH
    }

    async fn fetch_playlist_page(
        &self,
        credential: &Credential,
        request: &PageRequest,
    ) -> Result<Page<Playlist>> {
        let mut params = vec![
            ("part", "snippet,contentDetails,status".to_string()),
            ("mine", "true".to_string()),
            ("maxResults", request.limit.min(MAX_PAGE).to_string()),
        ];
        if let Some(token) = &request.token {
            params.push(("pageToken", token.clone()));
        }

        let json = self.api.get(credential, "playlists", &params).await?;
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
            .get(credential, "playlistItems", &page_params(playlist_id, request))
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
                    ("part", "snippet".to_string()),
                    ("type", "video".to_string()),
                    ("videoCategoryId", MUSIC_CATEGORY_ID.to_string()),
                    ("maxResults", limit.min(MAX_PAGE).to_string()),
                    ("q", query.plain()),
                ],
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
            "snippet": {
                "title": name,
                "description": description,
            },
            "status": {
                "privacyStatus": "private",
            },
        });

        let created = self
            .api
            .post(credential, "playlists", &[("part", "snippet,status".to_string())], &body)
            .await?;
        converters::get_opt_str(&created, "id")
            .ok_or_else(|| MigrateError::Api("YouTube returned no playlist ID".to_string()))
    }

    async fn append_batch(
        &self,
        credential: &Credential,
        playlist_id: &str,
        refs: &[TrackRef],
    ) -> Result<()> {
        for video in refs {
            self.insert_video(credential, playlist_id, video).await?;
        }
        Ok(())
    }

    async fn append_tracks(
        &self,
        credential: &Credential,
        playlist_id: &str,
        refs: &[TrackRef],
    ) -> Result<usize> {
        for (i, video) in refs.iter().enumerate() {
            if i > 0 {
                sleep(self.insert_interval).await;
            }
            self.insert_video(credential, playlist_id, video).await?;
        }
        debug!("Inserted {} videos into {}", refs.len(), playlist_id);
        Ok(refs.len())
    }
}
