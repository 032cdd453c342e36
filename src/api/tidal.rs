//! Tidal API adapter.
//!
//! Every Tidal endpoint is scoped to a market, so each call carries the
//! configured `countryCode`.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::http::{ApiClient, AuthScheme};
use super::ServiceAdapter;
use crate::config::ServiceSettings;
use crate::converters::{self, tidal as convert};
use crate::error::{MigrateError, Result};
use crate::models::{Candidate, Credential, Playlist, SearchQuery, ServiceKind, Track, TrackRef};
use crate::pagination::{Page, PageRequest, PageStyle};

/// Base URL for the Tidal API.
const API_BASE_URL: &str = "https://api.tidal.com/v1";

const MAX_PAGE: usize = 100;

/// Tidal adapter. Tracks are referenced by numeric ID, playlists by UUID.
#[derive(Debug, Clone)]
pub struct TidalAdapter {
    api: ApiClient,
    country_code: String,
}

impl TidalAdapter {
    /// Create an adapter for the given market.
    pub fn new(settings: &ServiceSettings, country_code: &str) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(ServiceKind::Tidal, API_BASE_URL, settings, AuthScheme::Bearer)?,
            country_code: country_code.to_string(),
        })
    }

    fn query<'a>(&self, extra: &[(&'a str, String)]) -> Vec<(&'a str, String)> {
        let mut params = extra.to_vec();
        params.push(("countryCode", self.country_code.clone()));
        params
    }

    async fn get(&self, credential: &Credential, path: &str, extra: &[(&str, String)]) -> Result<Value> {
        self.api.get(credential, path, &self.query(extra)).await
    }

    async fn current_user_id(&self, credential: &Credential) -> Result<String> {
        let me = self.get(credential, "users/me", &[]).await?;
        converters::get_id(&me, "userId")
            .or_else(|| converters::get_id(&me, "id"))
            .ok_or_else(|| MigrateError::Api("Tidal /users/me returned no user ID".to_string()))
    }
}

#[async_trait]
impl ServiceAdapter for TidalAdapter {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Tidal
    }

    fn page_style(&self) -> PageStyle {
        PageStyle::ItemCount
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

    async fn fetch_playlist_page(
        &self,
        credential: &Credential,
        request: &PageRequest,
    ) -> Result<Page<Playlist>> {
        let user_id = self.current_user_id(credential).await?;
        let json = self
            .get(
                credential,
                &format!("users/{}/playlists", user_id),
                &[
                    ("offset", request.offset.to_string()),
                    ("limit", request.limit.min(MAX_PAGE).to_string()),
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
            .get(
                credential,
                &format!("playlists/{}/items", playlist_id),
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
            .get(
                credential,
                "search/tracks",
                &[("query", query.plain()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(convert::parse_search(&json))
    }

    async fn search_by_isrc(&self, credential: &Credential, isrc: &str) -> Result<Option<Candidate>> {
        let json = self
            .get(credential, "tracks", &[("isrc", isrc.to_string())])
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
            "title": name,
            "description": description,
        });

        let created = self
            .api
            .post(
                credential,
                &format!("users/{}/playlists", user_id),
                &self.query(&[]),
                &body,
            )
            .await?;
        converters::get_id(&created, "uuid")
            .ok_or_else(|| MigrateError::Api("Tidal returned no playlist UUID".to_string()))
    }

    async fn append_batch(
        &self,
        credential: &Credential,
        playlist_id: &str,
        refs: &[TrackRef],
    ) -> Result<()> {
        let body = json!({
            "trackIds": join_ids(refs),
            "onDupes": "FAIL",
        });
        self.api
            .post(
                credential,
                &format!("playlists/{}/items", playlist_id),
                &self.query(&[]),
                &body,
            )
            .await?;
        Ok(())
    }
}

/// Comma-separated track IDs, the form Tidal's item endpoint expects.
fn join_ids(refs: &[TrackRef]) -> String {
    refs.iter().map(TrackRef::as_str).collect::<Vec<_>>().join(",")
}
