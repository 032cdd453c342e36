//! Scripted in-memory adapter for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::ServiceAdapter;
use crate::error::{MigrateError, Result};
use crate::models::{Candidate, Credential, Playlist, SearchQuery, ServiceKind, Track, TrackRef};
use crate::pagination::{Page, PageRequest, PageStyle};

/// Produces a fresh error each time a scripted failure fires.
pub type ErrorFn = fn() -> MigrateError;

#[derive(Default)]
struct Log {
    calls: Vec<String>,
    page_requests: Vec<PageRequest>,
    appends: Vec<(String, Vec<TrackRef>)>,
    created: Vec<(String, String)>,
    rate_limited_searches: usize,
    rate_limited_appends: usize,
    inserted: usize,
    failing_insert: Option<usize>,
}

/// First raw index and end of the page `request` asks for.
fn window(style: PageStyle, request: &PageRequest, fallback: usize, len: usize) -> (usize, usize) {
    let offset = match (style, &request.token) {
        (PageStyle::Cursor, None) => 0,
        (PageStyle::Cursor, Some(token)) => token.parse().unwrap_or(fallback),
        _ => request.offset,
    };
    (offset, (offset + request.limit).min(len))
}

/// Attach the style's continuation signal to `page`.
fn continuation<T>(style: PageStyle, page: Page<T>, end: usize, len: usize, stuck: Option<&String>) -> Page<T> {
    match style {
        PageStyle::OffsetLimit => page.has_more(end < len),
        PageStyle::ItemCount => page,
        PageStyle::Cursor => {
            let token = match stuck {
                Some(stuck) => Some(stuck.clone()),
                None => (end < len).then(|| end.to_string()),
            };
            page.next_token(token)
        }
    }
}

/// A fake service. Source side serves playlists from memory; destination
/// side answers searches from a table and records every write.
pub struct MockAdapter {
    kind: ServiceKind,
    style: PageStyle,
    page_limit: usize,
    max_batch: usize,
    playlists: Vec<(Playlist, Vec<Track>)>,
    stuck_token: Option<String>,
    drop_every: Option<usize>,
    search_results: HashMap<String, Vec<Candidate>>,
    search_failures: HashMap<String, ErrorFn>,
    isrc_matches: HashMap<String, Candidate>,
    isrc_failure: Option<ErrorFn>,
    list_failure: Option<ErrorFn>,
    fetch_failures: HashMap<String, ErrorFn>,
    create_failure: Option<ErrorFn>,
    append_failure: Option<ErrorFn>,
    log: Mutex<Log>,
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            kind: ServiceKind::Spotify,
            style: PageStyle::OffsetLimit,
            page_limit: 100,
            max_batch: 100,
            playlists: Vec::new(),
            stuck_token: None,
            drop_every: None,
            search_results: HashMap::new(),
            search_failures: HashMap::new(),
            isrc_matches: HashMap::new(),
            isrc_failure: None,
            list_failure: None,
            fetch_failures: HashMap::new(),
            create_failure: None,
            append_failure: None,
            log: Mutex::new(Log::default()),
        }
    }

    pub fn with_kind(mut self, kind: ServiceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_paging(mut self, style: PageStyle, limit: usize) -> Self {
        self.style = style;
        self.page_limit = limit;
        self
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Add a playlist named after its ID.
    pub fn with_source_tracks(self, id: &str, tracks: Vec<Track>) -> Self {
        self.with_playlist(id, id, tracks)
    }

    pub fn with_playlist(mut self, id: &str, name: &str, tracks: Vec<Track>) -> Self {
        let mut playlist = Playlist::new(id, name);
        playlist.track_count = tracks.len() as u32;
        self.playlists.push((playlist, tracks));
        self
    }

    /// Cursor pages always hand back this token.
    pub fn with_stuck_token(mut self, token: &str) -> Self {
        self.stuck_token = Some(token.to_string());
        self
    }

    /// Drop every `n`th raw item while mapping, like an unplayable entry.
    pub fn with_dropped_every(mut self, n: usize) -> Self {
        self.drop_every = Some(n);
        self
    }

    /// Answer searches for `title` with `candidates`.
    pub fn with_search_results(mut self, title: &str, candidates: Vec<Candidate>) -> Self {
        self.search_results.insert(title.to_string(), candidates);
        self
    }

    pub fn with_search_failure(mut self, title: &str, error: ErrorFn) -> Self {
        self.search_failures.insert(title.to_string(), error);
        self
    }

    /// The first `n` searches are rate limited.
    pub fn with_rate_limited_searches(self, n: usize) -> Self {
        self.lock().rate_limited_searches = n;
        self
    }

    /// The first `n` appends are rate limited.
    pub fn with_rate_limited_appends(self, n: usize) -> Self {
        self.lock().rate_limited_appends = n;
        self
    }

    pub fn with_isrc_match(mut self, isrc: &str, candidate: Candidate) -> Self {
        self.isrc_matches.insert(isrc.to_string(), candidate);
        self
    }

    pub fn with_isrc_failure(mut self, error: ErrorFn) -> Self {
        self.isrc_failure = Some(error);
        self
    }

    pub fn with_list_failure(mut self, error: ErrorFn) -> Self {
        self.list_failure = Some(error);
        self
    }

    pub fn with_fetch_failure(mut self, playlist_id: &str, error: ErrorFn) -> Self {
        self.fetch_failures.insert(playlist_id.to_string(), error);
        self
    }

    pub fn with_create_failure(mut self, error: ErrorFn) -> Self {
        self.create_failure = Some(error);
        self
    }

    pub fn with_append_failure(mut self, error: ErrorFn) -> Self {
        self.append_failure = Some(error);
        self
    }

    /// Appends insert one reference at a time; the `n`th insert overall
    /// fails once with a transport error, after the earlier references of
    /// its batch have already been written.
    pub fn with_failing_insert(self, n: usize) -> Self {
        self.lock().failing_insert = Some(n);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Log> {
        self.log.lock().unwrap()
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }

    /// Every call in order, e.g. `search:Yesterday`, `create:Road Trip`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn page_requests(&self) -> Vec<PageRequest> {
        self.lock().page_requests.clone()
    }

    /// `(playlist_id, refs)` per append call.
    pub fn append_calls(&self) -> Vec<(String, Vec<TrackRef>)> {
        self.lock().appends.clone()
    }

    /// `(name, description)` per created playlist.
    pub fn created(&self) -> Vec<(String, String)> {
        self.lock().created.clone()
    }

    /// All references written, across batches.
    pub fn written(&self) -> Vec<TrackRef> {
        self.lock()
            .appends
            .iter()
            .flat_map(|(_, refs)| refs.iter().cloned())
            .collect()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl ServiceAdapter for MockAdapter {
    fn kind(&self) -> ServiceKind {
        self.kind
    }

    fn page_style(&self) -> PageStyle {
        self.style
    }

    fn page_limit(&self) -> usize {
        self.page_limit
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch
    }

    fn supports_isrc(&self) -> bool {
        !self.isrc_matches.is_empty() || self.isrc_failure.is_some()
    }

    async fn fetch_playlist_page(
        &self,
        _credential: &Credential,
        request: &PageRequest,
    ) -> Result<Page<Playlist>> {
        self.record("list".to_string());
        if let Some(error) = self.list_failure {
            return Err(error());
        }

        let len = self.playlists.len();
        let (offset, end) = window(self.style, request, len, len);
        let items: Vec<Playlist> = self
            .playlists
            .get(offset..end)
            .unwrap_or(&[])
            .iter()
            .map(|(p, _)| p.clone())
            .collect();
        Ok(continuation(self.style, Page::new(items), end, len, None))
    }

    async fn fetch_track_page(
        &self,
        _credential: &Credential,
        playlist_id: &str,
        request: &PageRequest,
    ) -> Result<Page<Track>> {
        let pages_served = {
            let mut log = self.lock();
            log.calls.push(format!("fetch:{}", playlist_id));
            log.page_requests.push(request.clone());
            log.page_requests.len() - 1
        };

        if let Some(error) = self.fetch_failures.get(playlist_id) {
            return Err(error());
        }
        let (_, tracks) = self
            .playlists
            .iter()
            .find(|(p, _)| p.id == playlist_id)
            .ok_or_else(|| MigrateError::NotFound(format!("playlist {}", playlist_id)))?;

        let (offset, end) = window(self.style, request, pages_served * request.limit, tracks.len());
        let raw = tracks.get(offset..end).unwrap_or(&[]);

        let items = raw
            .iter()
            .enumerate()
            .filter(|(i, _)| match self.drop_every {
                Some(n) => (offset + i + 1) % n != 0,
                None => true,
            })
            .map(|(_, t)| t.clone())
            .collect();

        let page = Page::new(items).consumed(raw.len());
        Ok(continuation(self.style, page, end, tracks.len(), self.stuck_token.as_ref()))
    }

    async fn search_candidates(
        &self,
        _credential: &Credential,
        query: &SearchQuery,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        {
            let mut log = self.lock();
            log.calls.push(format!("search:{}", query.title));
            if log.rate_limited_searches > 0 {
                log.rate_limited_searches -= 1;
                return Err(MigrateError::RateLimited { retry_after: None });
            }
        }

        if let Some(error) = self.search_failures.get(&query.title) {
            return Err(error());
        }
        Ok(self
            .search_results
            .get(&query.title)
            .map(|c| c.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn search_by_isrc(&self, _credential: &Credential, isrc: &str) -> Result<Option<Candidate>> {
        self.record(format!("isrc:{}", isrc));
        if let Some(error) = self.isrc_failure {
            return Err(error());
        }
        Ok(self.isrc_matches.get(isrc).cloned())
    }

    async fn create_playlist(
        &self,
        _credential: &Credential,
        name: &str,
        description: &str,
    ) -> Result<String> {
        self.record(format!("create:{}", name));
        if let Some(error) = self.create_failure {
            return Err(error());
        }
        let mut log = self.lock();
        log.created.push((name.to_string(), description.to_string()));
        Ok(format!("created-{}", log.created.len()))
    }

    async fn append_batch(
        &self,
        _credential: &Credential,
        playlist_id: &str,
        refs: &[TrackRef],
    ) -> Result<()> {
        let mut log = self.lock();
        log.calls.push(format!("append:{}:{}", playlist_id, refs.len()));
        if log.rate_limited_appends > 0 {
            log.rate_limited_appends -= 1;
            return Err(MigrateError::RateLimited { retry_after: None });
        }
        if let Some(error) = self.append_failure {
            return Err(error());
        }

        let mut written = Vec::new();
        for reference in refs {
            if log.failing_insert == Some(log.inserted + 1) {
                log.failing_insert = None;
                if !written.is_empty() {
                    log.appends.push((playlist_id.to_string(), written));
                }
                return Err(MigrateError::Transport("connection reset".to_string()));
            }
            log.inserted += 1;
            written.push(reference.clone());
        }
        log.appends.push((playlist_id.to_string(), written));
        Ok(())
    }
}
