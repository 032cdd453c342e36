//! Draining paged track listings.
//!
//! Services page in one of three ways. [`PageWalker`] holds the rules for
//! all three; [`TrackCursor`] uses it to produce every track of a playlist
//! once, in server order, and [`collect_playlists`] to list every playlist. The cursor
//! moves forward in the service's own units (raw items or tokens), so items
//! the adapter filtered out still count toward the next offset and a page
//! is never requested twice.

use std::collections::HashSet;

use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::debug;

use crate::api::ServiceAdapter;
use crate::error::{MigrateError, Result};
use crate::models::{Credential, Playlist, Track};
use crate::rate_limit::RateLimiter;

/// How a service signals that more items exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStyle {
    /// Increasing `offset`; stop on a short page or an explicit "no more".
    OffsetLimit,
    /// Opaque continuation token passed back verbatim; stop when none is returned.
    Cursor,
    /// Increasing `offset`; stop on an empty page or one shorter than `limit`.
    ItemCount,
}

/// Parameters for one page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Raw items already consumed (offset styles).
    pub offset: usize,
    /// Items requested per page.
    pub limit: usize,
    /// Continuation token from the previous page (cursor style).
    pub token: Option<String>,
}

/// One page as an adapter returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Mapped items, in server order.
    pub items: Vec<T>,
    /// Raw items the server returned, including ones dropped during mapping.
    pub consumed: usize,
    /// Explicit "more pages" indicator, when the service sends one.
    pub has_more: Option<bool>,
    /// Continuation token for the next page.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// A page where every raw item was kept.
    pub fn new(items: Vec<T>) -> Self {
        let consumed = items.len();
        Self {
            items,
            consumed,
            has_more: None,
            next_token: None,
        }
    }

    /// Set the raw item count.
    pub fn consumed(mut self, consumed: usize) -> Self {
        self.consumed = consumed;
        self
    }

    /// Set the explicit "more pages" indicator.
    pub fn has_more(mut self, has_more: bool) -> Self {
        self.has_more = Some(has_more);
        self
    }

    /// Set the continuation token.
    pub fn next_token(mut self, token: Option<String>) -> Self {
        self.next_token = token.filter(|t| !t.is_empty());
        self
    }
}

/// Request bookkeeping and termination rules for one paged listing.
#[derive(Debug, Clone)]
pub struct PageWalker {
    style: PageStyle,
    request: PageRequest,
    seen_tokens: HashSet<String>,
    pages: usize,
    done: bool,
}

impl PageWalker {
    pub fn new(style: PageStyle, limit: usize) -> Self {
        Self {
            style,
            request: PageRequest {
                offset: 0,
                limit: limit.max(1),
                token: None,
            },
            seen_tokens: HashSet::new(),
            pages: 0,
            done: false,
        }
    }

    /// The request for the next page, or `None` once the listing is exhausted.
    pub fn next_request(&self) -> Option<&PageRequest> {
        (!self.done).then_some(&self.request)
    }

    /// Pages recorded so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Record a fetched page and work out the following request.
    pub fn advance<T>(&mut self, page: &Page<T>) {
        let limit = self.request.limit;
        self.pages += 1;

        match self.style {
            PageStyle::OffsetLimit => {
                self.request.offset += page.consumed;
                self.done =
                    page.consumed == 0 || page.consumed < limit || page.has_more == Some(false);
            }
            PageStyle::ItemCount => {
                self.request.offset += page.consumed;
                self.done = page.consumed == 0 || page.consumed < limit;
            }
            PageStyle::Cursor => match &page.next_token {
                // A token we already followed would loop forever.
                Some(token) if self.seen_tokens.insert(token.clone()) => {
                    self.request.token = Some(token.clone());
                }
                _ => self.done = true,
            },
        }
    }
}

/// Walks one playlist's pages. Single pass; not restartable.
pub struct TrackCursor<'a> {
    adapter: &'a dyn ServiceAdapter,
    credential: &'a Credential,
    playlist_id: &'a str,
    limiter: Option<&'a mut RateLimiter>,
    walker: PageWalker,
}

impl<'a> TrackCursor<'a> {
    /// Create a cursor over `playlist_id` on `adapter`.
    pub fn new(
        adapter: &'a dyn ServiceAdapter,
        credential: &'a Credential,
        playlist_id: &'a str,
    ) -> Self {
        Self {
            adapter,
            credential,
            playlist_id,
            limiter: None,
            walker: PageWalker::new(adapter.page_style(), adapter.page_limit()),
        }
    }

    /// Gate every page request through `limiter`.
    pub fn with_limiter(mut self, limiter: &'a mut RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.walker.pages()
    }

    /// Fetch the next page of tracks, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Track>>> {
        let Some(request) = self.walker.next_request().cloned() else {
            return Ok(None);
        };

        let adapter = self.adapter;
        let credential = self.credential;
        let playlist_id = self.playlist_id;

        let page = match self.limiter.as_deref_mut() {
            Some(limiter) => {
                limiter
                    .call(|| adapter.fetch_track_page(credential, playlist_id, &request))
                    .await?
            }
            None => {
                adapter
                    .fetch_track_page(credential, playlist_id, &request)
                    .await?
            }
        };

        self.walker.advance(&page);
        debug!(
            "{} playlist {}: page {} consumed {} items, kept {}",
            adapter.kind(),
            playlist_id,
            self.walker.pages(),
            page.consumed,
            page.items.len()
        );

        Ok(Some(page.items))
    }

    /// Drain every remaining page into one list.
    pub async fn collect_all(mut self) -> Result<Vec<Track>> {
        let mut tracks = Vec::new();
        while let Some(page) = self.next_page().await? {
            tracks.extend(page);
        }
        Ok(tracks)
    }

    /// Turn the cursor into a lazy stream of tracks.
    pub fn into_stream(self) -> BoxStream<'a, Result<Track>> {
        stream::try_unfold(self, |mut cursor| async move {
            let page = cursor.next_page().await?;
            Ok::<_, MigrateError>(page.map(|items| {
                let tracks = items.into_iter().map(Ok::<Track, MigrateError>);
                (stream::iter(tracks), cursor)
            }))
        })
        .try_flatten()
        .boxed()
    }
}

/// Every playlist owned by the credential's user, across all pages.
///
/// Page requests go through `limiter` when one is given.
pub async fn collect_playlists<A>(
    adapter: &A,
    credential: &Credential,
    mut limiter: Option<&mut RateLimiter>,
) -> Result<Vec<Playlist>>
where
    A: ServiceAdapter + ?Sized,
{
    let mut walker = PageWalker::new(adapter.page_style(), adapter.playlist_page_limit());
    let mut playlists = Vec::new();

    while let Some(request) = walker.next_request().cloned() {
        let page = match limiter.as_deref_mut() {
            Some(limiter) => {
                limiter
                    .call(|| adapter.fetch_playlist_page(credential, &request))
                    .await?
            }
            None => adapter.fetch_playlist_page(credential, &request).await?,
        };
        walker.advance(&page);
        playlists.extend(page.items);
    }

    debug!(
        "{} listed {} playlists over {} page(s)",
        adapter.kind(),
        playlists.len(),
        walker.pages()
    );
    Ok(playlists)
}

/// Lazily list every track of a playlist.
pub fn list_tracks<'a>(
    adapter: &'a dyn ServiceAdapter,
    credential: &'a Credential,
    playlist_id: &'a str,
) -> BoxStream<'a, Result<Track>> {
    TrackCursor::new(adapter, credential, playlist_id).into_stream()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAdapter;

    fn ids(tracks: &[Track]) -> Vec<String> {
        tracks.iter().map(|t| t.id.clone()).collect()
    }

    fn numbered(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(format!("t{}", i), format!("Song {}", i)).with_artist("Band"))
            .collect()
    }

    #[tokio::test]
    async fn test_offset_style_stops_on_short_page() {
        let adapter = MockAdapter::new().with_source_tracks("pl", numbered(250));
        let adapter = adapter.with_paging(PageStyle::OffsetLimit, 100);
        let cred = Credential::new("token");

        let mut cursor = TrackCursor::new(&adapter, &cred, "pl");
        let mut all = Vec::new();
        while let Some(page) = cursor.next_page().await.unwrap() {
            all.extend(page);
        }

        assert_eq!(ids(&all), ids(&numbered(250)));
        assert_eq!(cursor.pages_fetched(), 3);
        assert_eq!(adapter.page_requests().iter().map(|r| r.offset).collect::<Vec<_>>(), vec![0, 100, 200]);
    }

    #[tokio::test]
    async fn test_offset_style_exact_multiple_ends_on_more_flag() {
        let adapter = MockAdapter::new()
            .with_source_tracks("pl", numbered(200))
            .with_paging(PageStyle::OffsetLimit, 100);
        let cred = Credential::new("token");

        let tracks = TrackCursor::new(&adapter, &cred, "pl").collect_all().await.unwrap();

        assert_eq!(tracks.len(), 200);
        // Second page reports no more pages, so no empty third request.
        assert_eq!(adapter.page_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_item_count_style_needs_empty_page_on_exact_multiple() {
        let adapter = MockAdapter::new()
            .with_source_tracks("pl", numbered(200))
            .with_paging(PageStyle::ItemCount, 100);
        let cred = Credential::new("token");

        let tracks = TrackCursor::new(&adapter, &cred, "pl").collect_all().await.unwrap();

        assert_eq!(ids(&tracks), ids(&numbered(200)));
        assert_eq!(adapter.page_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_cursor_style_follows_tokens() {
        let adapter = MockAdapter::new()
            .with_source_tracks("pl", numbered(120))
            .with_paging(PageStyle::Cursor, 50);
        let cred = Credential::new("token");

        let tracks: Vec<Track> = list_tracks(&adapter, &cred, "pl").try_collect().await.unwrap();

        assert_eq!(ids(&tracks), ids(&numbered(120)));
        let tokens: Vec<Option<String>> =
            adapter.page_requests().into_iter().map(|r| r.token).collect();
        assert_eq!(tokens, vec![None, Some("50".to_string()), Some("100".to_string())]);
    }

    #[tokio::test]
    async fn test_cursor_style_repeated_token_terminates() {
        let adapter = MockAdapter::new()
            .with_source_tracks("pl", numbered(10))
            .with_paging(PageStyle::Cursor, 5)
            .with_stuck_token("again");
        let cred = Credential::new("token");

        let tracks = TrackCursor::new(&adapter, &cred, "pl").collect_all().await.unwrap();

        // The second page hands back the same token, which ends the walk.
        assert_eq!(adapter.page_requests().len(), 2);
        assert_eq!(tracks.len(), 10);
    }

    #[tokio::test]
    async fn test_filtered_items_still_advance_offset() {
        // Every third raw item is unplayable and dropped by the adapter.
        let adapter = MockAdapter::new()
            .with_source_tracks("pl", numbered(9))
            .with_paging(PageStyle::ItemCount, 3)
            .with_dropped_every(3);
        let cred = Credential::new("token");

        let tracks = TrackCursor::new(&adapter, &cred, "pl").collect_all().await.unwrap();

        assert_eq!(ids(&tracks), vec!["t0", "t1", "t3", "t4", "t6", "t7"]);
        let offsets: Vec<usize> = adapter.page_requests().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 3, 6, 9]);
    }

    #[tokio::test]
    async fn test_empty_playlist() {
        for style in [PageStyle::OffsetLimit, PageStyle::Cursor, PageStyle::ItemCount] {
            let adapter = MockAdapter::new()
                .with_source_tracks("pl", Vec::new())
                .with_paging(style, 50);
            let cred = Credential::new("token");

            let tracks = TrackCursor::new(&adapter, &cred, "pl").collect_all().await.unwrap();
            assert!(tracks.is_empty());
            assert_eq!(adapter.page_requests().len(), 1);
        }
    }

    #[test]
    fn test_walker_stops_on_empty_page() {
        let mut walker = PageWalker::new(PageStyle::ItemCount, 2);
        walker.advance(&Page::new(vec![1, 2]));
        assert_eq!(walker.next_request().map(|r| r.offset), Some(2));

        walker.advance(&Page::<u32>::new(Vec::new()));
        assert!(walker.next_request().is_none());
        assert_eq!(walker.pages(), 2);
    }

    #[tokio::test]
    async fn test_playlists_listed_across_pages() {
        for style in [PageStyle::OffsetLimit, PageStyle::Cursor, PageStyle::ItemCount] {
            let adapter = (0..120).fold(MockAdapter::new().with_paging(style, 100), |mock, i| {
                mock.with_playlist(&format!("p{}", i), &format!("Mix {}", i), Vec::new())
            });
            let cred = Credential::new("token");

            let playlists = adapter.list_playlists(&cred).await.unwrap();

            assert_eq!(playlists.len(), 120);
            assert_eq!(playlists[0].id, "p0");
            assert_eq!(playlists[119].id, "p119");
            assert_eq!(adapter.count_calls("list"), 3);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_playlist_pages_go_through_limiter() {
        let adapter = (0..60).fold(MockAdapter::new(), |mock, i| {
            mock.with_playlist(&format!("p{}", i), "Mix", Vec::new())
        });
        let cred = Credential::new("token");
        let mut limiter = RateLimiter::new(adapter.kind(), 2.0, 100);

        let start = tokio::time::Instant::now();
        let playlists = collect_playlists(&adapter, &cred, Some(&mut limiter)).await.unwrap();

        assert_eq!(playlists.len(), 60);
        // Two pages, spaced by the limiter's 500ms interval.
        assert_eq!(start.elapsed(), std::time::Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_missing_playlist_propagates() {
        let adapter = MockAdapter::new();
        let cred = Credential::new("token");

        let err = TrackCursor::new(&adapter, &cred, "nope").collect_all().await.unwrap_err();
        assert!(matches!(err, crate::error::MigrateError::NotFound(_)));
    }
}
