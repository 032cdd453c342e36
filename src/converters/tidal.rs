//! Tidal API responses.

use serde_json::Value;

use super::{get_array, get_bool, get_id, get_opt_str, get_str, get_u32, get_u64, parse_artist_list};
use crate::error::{MigrateError, Result};
use crate::models::{Candidate, Playlist, Track, TrackRef};
use crate::pagination::Page;

const IMAGE_BASE_URL: &str = "https://resources.tidal.com/images";

/// Resource URL for a Tidal image ID (`aaaa-bbbb-...` becomes `aaaa/bbbb/...`).
pub fn image_url(image_id: &str) -> String {
    format!("{}/{}/320x320.jpg", IMAGE_BASE_URL, image_id.replace('-', "/"))
}

/// Parse a track object. Tidal reports durations in seconds.
pub fn parse_track(json: &Value) -> Result<Track> {
    let id = get_id(json, "id")
        .ok_or_else(|| MigrateError::Api("Missing Tidal track ID".to_string()))?;

    let mut artists = parse_artist_list(get_array(json, "artists"));
    if artists.is_empty() {
        artists = json
            .get("artist")
            .map(|a| parse_artist_list(std::slice::from_ref(a)))
            .unwrap_or_default();
    }

    Ok(Track {
        id,
        name: get_str(json, "title"),
        artists,
        album: json.get("album").and_then(|a| get_opt_str(a, "title")),
        duration_ms: get_u64(json, "duration").map(|secs| secs * 1000),
        isrc: get_opt_str(json, "isrc"),
    })
}

/// Parse a page of `/playlists/{id}/items`. Videos and other non-track items are dropped.
pub fn parse_track_page(json: &Value) -> Result<Page<Track>> {
    let items = get_array(json, "items");

    let tracks = items
        .iter()
        .filter(|entry| entry.get("type").and_then(|t| t.as_str()) == Some("track"))
        .filter_map(|entry| entry.get("item"))
        .filter_map(|t| parse_track(t).ok())
        .collect();

    Ok(Page::new(tracks).consumed(items.len()))
}

/// Parse a playlist object. Tidal playlists are identified by `uuid`.
pub fn parse_playlist(json: &Value) -> Result<Playlist> {
    let id = get_opt_str(json, "uuid")
        .ok_or_else(|| MigrateError::Api("Missing Tidal playlist UUID".to_string()))?;

    Ok(Playlist {
        id,
        name: get_str(json, "title"),
        description: get_str(json, "description"),
        track_count: get_u32(json, "numberOfTracks"),
        image: get_opt_str(json, "squareImage")
            .or_else(|| get_opt_str(json, "image"))
            .map(|img| image_url(&img)),
        updated_at: get_opt_str(json, "lastUpdated"),
        owner: json.get("creator").and_then(|c| {
            get_opt_str(c, "name").or_else(|| get_id(c, "id"))
        }),
        public: get_bool(json, "publicPlaylist"),
    })
}

/// Parse a page of `/users/{id}/playlists`.
pub fn parse_playlist_page(json: &Value) -> Page<Playlist> {
    let items = get_array(json, "items");
    let playlists = items
        .iter()
        .filter_map(|p| parse_playlist(p).ok())
        .collect();

    Page::new(playlists).consumed(items.len())
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

/// Parse `/search/tracks` or `/tracks?isrc=`.
pub fn parse_search(json: &Value) -> Vec<Candidate> {
    get_array(json, "items")
        .iter()
        .filter_map(parse_candidate)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track_json(id: u64) -> Value {
        json!({
            "id": id,
            "title": "Teardrop",
            "duration": 330,
            "isrc": "GBAAA9800153",
            "album": {"title": "Mezzanine"},
            "artists": [{"id": 1, "name": "Massive Attack"}]
        })
    }

    #[test]
    fn test_parse_track_converts_seconds() {
        let track = parse_track(&track_json(42)).unwrap();
        assert_eq!(track.id, "42");
        assert_eq!(track.duration_ms, Some(330_000));
        assert_eq!(track.album.as_deref(), Some("Mezzanine"));
        assert_eq!(track.isrc(), Some("GBAAA9800153"));
    }

    #[test]
    fn test_track_page_keeps_only_tracks() {
        let json = json!({
            "items": [
                {"item": track_json(1), "type": "track"},
                {"item": {"id": 2, "title": "Live clip"}, "type": "video"},
                {"item": track_json(3), "type": "track"}
            ],
            "totalNumberOfItems": 3
        });

        let page = parse_track_page(&json).unwrap();
        let ids: Vec<&str> = page.items.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(page.consumed, 3);
    }

    #[test]
    fn test_parse_playlist_image() {
        let json = json!({
            "uuid": "36ea71a8-445e-41a4-82ab-6628c581535d",
            "title": "Trip Hop",
            "numberOfTracks": 25,
            "image": "9f1a-22bc-33de",
            "publicPlaylist": false,
            "creator": {"id": 555}
        });

        let playlist = parse_playlist(&json).unwrap();
        assert_eq!(playlist.id, "36ea71a8-445e-41a4-82ab-6628c581535d");
        assert_eq!(
            playlist.image.as_deref(),
            Some("https://resources.tidal.com/images/9f1a/22bc/33de/320x320.jpg")
        );
        assert_eq!(playlist.owner.as_deref(), Some("555"));
        assert_eq!(playlist.track_count, 25);
    }

    #[test]
    fn test_missing_uuid_is_error() {
        assert!(parse_playlist(&json!({"title": "x"})).is_err());
    }

    #[test]
    fn test_playlist_page_counts_raw_items() {
        let json = json!({
            "items": [{"uuid": "u-1", "title": "A"}, {"title": "no uuid"}],
            "totalNumberOfItems": 2
        });
        let page = parse_playlist_page(&json);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.consumed, 2);
    }
}
