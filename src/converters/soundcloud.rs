//! SoundCloud API responses.
//!
//! SoundCloud has no album concept and credits a track to the uploading
//! user, unless publisher metadata names the artist.

use serde_json::Value;

use super::{get_array, get_id, get_opt_str, get_str, get_u32, get_u64};
use crate::error::{MigrateError, Result};
use crate::models::{Artist, Candidate, Playlist, Track, TrackRef};
use crate::pagination::Page;

/// Upgrade a default-size artwork URL to the 500x500 variant.
pub fn artwork_url(url: &str) -> String {
    url.replace("-large", "-t500x500")
}

fn parse_artist(json: &Value) -> Vec<Artist> {
    let publisher = json
        .get("publisher_metadata")
        .and_then(|p| get_opt_str(p, "artist"));

    match publisher {
        Some(name) => vec![Artist::new(name)],
        None => json
            .get("user")
            .and_then(|u| {
                let name = get_opt_str(u, "username")?;
                Some(match get_id(u, "id") {
                    Some(id) => Artist::with_id(name, id),
                    None => Artist::new(name),
                })
            })
            .into_iter()
            .collect(),
    }
}

/// Parse a track object. Stubs without a title (removed tracks) are rejected.
pub fn parse_track(json: &Value) -> Result<Track> {
    let id = get_id(json, "id")
        .ok_or_else(|| MigrateError::Api("Missing SoundCloud track ID".to_string()))?;
    let name = get_opt_str(json, "title")
        .ok_or_else(|| MigrateError::Api(format!("SoundCloud track {} has no title", id)))?;

    Ok(Track {
        id,
        name,
        artists: parse_artist(json),
        album: None,
        duration_ms: get_u64(json, "duration"),
        isrc: json
            .get("publisher_metadata")
            .and_then(|p| get_opt_str(p, "isrc")),
    })
}

/// Items of a response that is either a bare array or a `{collection}` wrapper.
fn collection(json: &Value) -> &[Value] {
    match json {
        Value::Array(items) => items,
        _ => get_array(json, "collection"),
    }
}

/// Parse a page of `/playlists/{id}/tracks?linked_partitioning=true`.
pub fn parse_track_page(json: &Value) -> Result<Page<Track>> {
    let items = collection(json);
    let tracks = items.iter().filter_map(|t| parse_track(t).ok()).collect();

    Ok(Page::new(tracks)
        .consumed(items.len())
        .next_token(get_opt_str(json, "next_href")))
}

/// Parse a playlist object.
pub fn parse_playlist(json: &Value) -> Result<Playlist> {
    let id = get_id(json, "id")
        .ok_or_else(|| MigrateError::Api("Missing SoundCloud playlist ID".to_string()))?;

    Ok(Playlist {
        id,
        name: get_str(json, "title"),
        description: get_str(json, "description"),
        track_count: get_u32(json, "track_count"),
        image: get_opt_str(json, "artwork_url").map(|url| artwork_url(&url)),
        updated_at: get_opt_str(json, "last_modified"),
        owner: json.get("user").and_then(|u| get_opt_str(u, "username")),
        public: get_opt_str(json, "sharing").map(|s| s == "public"),
    })
}

/// Parse a page of `/me/playlists?linked_partitioning=true`.
pub fn parse_playlist_page(json: &Value) -> Page<Playlist> {
    let items = collection(json);
    let playlists = items
        .iter()
        .filter_map(|p| parse_playlist(p).ok())
        .collect();

    Page::new(playlists)
        .consumed(items.len())
        .next_token(get_opt_str(json, "next_href"))
}

/// Track IDs currently on a playlist, in order.
pub fn playlist_track_ids(json: &Value) -> Vec<String> {
    get_array(json, "tracks")
        .iter()
        .filter_map(|t| get_id(t, "id"))
        .collect()
}

/// Parse a track as a search candidate, referenced by numeric ID.
pub fn parse_candidate(json: &Value) -> Option<Candidate> {
    let track = parse_track(json).ok()?;
    Some(Candidate {
        reference: TrackRef::new(track.id),
        name: track.name,
        artists: track.artists,
    })
}

/// Parse a `/tracks?q=` response.
pub fn parse_search(json: &Value) -> Vec<Candidate> {
    collection(json).iter().filter_map(parse_candidate).collect()
}
