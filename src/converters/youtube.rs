//! YouTube Data API v3 responses.
//!
//! YouTube has no track model: a video has a title and an uploading
//! channel. Artist and title are recovered heuristically from
//! "Artist - Title" style video titles, falling back to the channel name
//! (minus the " - Topic" suffix of auto-generated artist channels).

use serde_json::Value;

use super::{get_array, get_opt_str, get_str, get_u32};
use crate::error::{MigrateError, Result};
use crate::models::{Artist, Candidate, Playlist, Track, TrackRef};
use crate::pagination::Page;

/// Titles YouTube gives to playlist entries whose video is gone.
const UNAVAILABLE_TITLES: &[&str] = &["Deleted video", "Private video"];

/// Separators between artist and title in a video title.
const TITLE_SEPARATORS: &[&str] = &[" - ", " – ", " — "];

/// Separators between several credited artists. Matched ASCII case-insensitively.
const ARTIST_SEPARATORS: &[&str] = &[" featuring ", " feat. ", " feat ", " ft. ", ",", "&"];

/// Channel suffix of auto-generated artist channels.
const TOPIC_SUFFIX: &str = " - Topic";

/// Bracketed title decorations that carry no matching signal.
const NOISE_MARKERS: &[&str] = &["official", "lyric", "audio", "video", "visualizer", "hd", "4k"];

/// Split a list of artists on commas, ampersands and featuring markers.
pub fn split_artists(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < text.len() {
        let sep = ARTIST_SEPARATORS.iter().find(|sep| {
            text.get(i..i + sep.len())
                .is_some_and(|window| window.eq_ignore_ascii_case(sep))
        });
        match sep {
            Some(sep) => {
                parts.push(&text[start..i]);
                i += sep.len();
                start = i;
            }
            None => i += 1,
        }
    }
    parts.push(&text[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Channel name with the " - Topic" suffix removed.
pub fn channel_artist(channel: &str) -> &str {
    channel.strip_suffix(TOPIC_SUFFIX).unwrap_or(channel).trim()
}

/// Drop trailing "(Official Video)"-style decorations from a title.
fn strip_noise(title: &str) -> &str {
    let mut title = title.trim();
    loop {
        let Some(open) = title.rfind(['(', '[']) else {
            break;
        };
        if !title.ends_with([')', ']']) {
            break;
        }
        let inner = title[open + 1..title.len() - 1].to_lowercase();
        if !NOISE_MARKERS
            .iter()
            .any(|m| inner.split_whitespace().any(|w| w == *m))
        {
            break;
        }
        title = title[..open].trim_end();
    }
    title
}

/// Recover `(artists, title)` from a video title and its channel.
pub fn split_title(video_title: &str, channel: &str) -> (Vec<Artist>, String) {
    let split = TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| video_title.find(sep).map(|at| (at, sep.len())))
        .min_by_key(|(at, _)| *at);

    let (artist_text, title) = match split {
        Some((at, len)) => (&video_title[..at], &video_title[at + len..]),
        None => (channel_artist(channel), video_title),
    };

    let mut artists: Vec<Artist> = split_artists(artist_text)
        .into_iter()
        .map(Artist::new)
        .collect();
    if artists.is_empty() && !channel.is_empty() {
        artists.push(Artist::new(channel_artist(channel)));
    }

    (artists, strip_noise(title).to_string())
}

/// Parse a `playlistItems` entry. `None` for deleted or private videos.
pub fn parse_playlist_item(json: &Value) -> Option<Track> {
    let snippet = json.get("snippet")?;
    let title = get_str(snippet, "title");
    if title.is_empty() || UNAVAILABLE_TITLES.contains(&title.as_str()) {
        return None;
    }

    let video_id = json
        .get("contentDetails")
        .and_then(|c| get_opt_str(c, "videoId"))
        .or_else(|| {
            snippet
                .get("resourceId")
                .and_then(|r| get_opt_str(r, "videoId"))
        })?;

    let channel = get_opt_str(snippet, "videoOwnerChannelTitle").unwrap_or_default();
    let (artists, name) = split_title(&title, &channel);

    Some(Track {
        id: video_id,
        name,
        artists,
        ..Default::default()
    })
}

/// Parse a page of `playlistItems.list`.
pub fn parse_track_page(json: &Value) -> Result<Page<Track>> {
    let items = get_array(json, "items");
    let tracks = items.iter().filter_map(parse_playlist_item).collect();

    Ok(Page::new(tracks)
        .consumed(items.len())
        .next_token(get_opt_str(json, "nextPageToken")))
}

/// Parse a `playlists.list` entry.
pub fn parse_playlist(json: &Value) -> Result<Playlist> {
    let id = get_opt_str(json, "id")
        .ok_or_else(|| MigrateError::Api("Missing YouTube playlist ID".to_string()))?;
    let snippet = json.get("snippet").unwrap_or(&Value::Null);

    let image = snippet.get("thumbnails").and_then(|thumbs| {
        ["high", "medium", "default"]
            .iter()
            .find_map(|size| thumbs.get(*size).and_then(|t| get_opt_str(t, "url")))
    });

    Ok(Playlist {
        id,
        name: get_str(snippet, "title"),
        description: get_str(snippet, "description"),
        track_count: json
            .get("contentDetails")
            .map(|c| get_u32(c, "itemCount"))
            .unwrap_or(0),
        image,
        updated_at: get_opt_str(snippet, "publishedAt"),
        owner: get_opt_str(snippet, "channelTitle"),
        public: json
            .get("status")
            .and_then(|s| get_opt_str(s, "privacyStatus"))
            .map(|status| status == "public"),
    })
}

/// Parse a page of `playlists.list?mine=true`.
pub fn parse_playlist_page(json: &Value) -> Page<Playlist> {
    let items = get_array(json, "items");
    let playlists = items
        .iter()
        .filter_map(|p| parse_playlist(p).ok())
        .collect();

    Page::new(playlists)
        .consumed(items.len())
        .next_token(get_opt_str(json, "nextPageToken"))
}

/// Parse a `search.list` result as a candidate, referenced by video ID.
pub fn parse_candidate(json: &Value) -> Option<Candidate> {
    let video_id = json.get("id").and_then(|id| get_opt_str(id, "videoId"))?;
    let snippet = json.get("snippet")?;
    let (artists, name) = split_title(&get_str(snippet, "title"), &get_str(snippet, "channelTitle"));

    Some(Candidate {
        reference: TrackRef::new(video_id),
        name,
        artists,
    })
}

/// Parse a `search.list` response.
pub fn parse_search(json: &Value) -> Vec<Candidate> {
    get_array(json, "items")
        .iter()
        .filter_map(parse_candidate)
        .collect()
}
