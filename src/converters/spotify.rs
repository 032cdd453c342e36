//! Spotify Web API responses.

use serde_json::Value;

use super::{get_array, get_bool, get_id, get_opt_str, get_str, get_u32, get_u64, parse_artist_list};
use crate::error::{MigrateError, Result};
use crate::models::{Candidate, Playlist, Track, TrackRef};
use crate::pagination::Page;

/// Parse a full track object.
///
/// Local files have a null `id`; their `spotify:local:` URI stands in so
/// they can still be matched by name.
pub fn parse_track(json: &Value) -> Result<Track> {
    let id = get_id(json, "id")
        .or_else(|| get_opt_str(json, "uri"))
        .ok_or_else(|| MigrateError::Api("Missing Spotify track ID".to_string()))?;

    Ok(Track {
        id,
        name: get_str(json, "name"),
        artists: parse_artist_list(get_array(json, "artists")),
        album: json.get("album").and_then(|a| get_opt_str(a, "name")),
        duration_ms: get_u64(json, "duration_ms"),
        isrc: json
            .get("external_ids")
            .and_then(|ids| get_opt_str(ids, "isrc")),
    })
}

/// Parse a page of `/playlists/{id}/tracks`.
///
/// Items whose `track` is null (removed tracks) are dropped but still
/// counted as consumed.
pub fn parse_track_page(json: &Value) -> Result<Page<Track>> {
    let items = get_array(json, "items");

    let tracks = items
        .iter()
        .filter_map(|item| item.get("track").filter(|t| !t.is_null()))
        .filter_map(|t| parse_track(t).ok())
        .collect();

    let has_more = json.get("next").map(|n| !n.is_null()).unwrap_or(false);

    Ok(Page::new(tracks).consumed(items.len()).has_more(has_more))
}

/// Parse a simplified playlist object.
pub fn parse_playlist(json: &Value) -> Result<Playlist> {
    let id = get_id(json, "id")
        .ok_or_else(|| MigrateError::Api("Missing Spotify playlist ID".to_string()))?;

    Ok(Playlist {
        id,
        name: get_str(json, "name"),
        description: get_str(json, "description"),
        track_count: json.get("tracks").map(|t| get_u32(t, "total")).unwrap_or(0),
        image: get_array(json, "images")
            .first()
            .and_then(|img| get_opt_str(img, "url")),
        updated_at: get_opt_str(json, "snapshot_id"),
        owner: json
            .get("owner")
            .and_then(|o| get_opt_str(o, "display_name").or_else(|| get_opt_str(o, "id"))),
        public: get_bool(json, "public"),
    })
}

/// Parse a page of `/me/playlists`.
pub fn parse_playlist_page(json: &Value) -> Page<Playlist> {
    let items = get_array(json, "items");
    let playlists = items
        .iter()
        .filter_map(|p| parse_playlist(p).ok())
        .collect();
    let has_more = json.get("next").map(|n| !n.is_null()).unwrap_or(false);

    Page::new(playlists).consumed(items.len()).has_more(has_more)
}

/// Parse a track object as a search candidate, referenced by URI.
pub fn parse_candidate(json: &Value) -> Option<Candidate> {
    let uri = get_opt_str(json, "uri")?;
    Some(Candidate {
        reference: TrackRef::new(uri),
        name: get_str(json, "name"),
        artists: parse_artist_list(get_array(json, "artists")),
    })
}

/// Parse a `/search?type=track` response.
pub fn parse_search(json: &Value) -> Vec<Candidate> {
    json.get("tracks")
        .map(|t| get_array(t, "items"))
        .unwrap_or(&[])
        .iter()
        .filter_map(parse_candidate)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track_json(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "uri": format!("spotify:track:{}", id),
            "name": name,
            "duration_ms": 215000,
            "album": {"name": "Abbey Road"},
            "artists": [{"id": "b1", "name": "The Beatles"}],
            "external_ids": {"isrc": "GBAYE0601690"}
        })
    }

    #[test]
    fn test_parse_track() {
        let track = parse_track(&track_json("t1", "Come Together")).unwrap();
        assert_eq!(track.name, "Come Together");
        assert_eq!(track.album.as_deref(), Some("Abbey Road"));
        assert_eq!(track.duration_ms, Some(215000));
        assert_eq!(track.isrc(), Some("GBAYE0601690"));
        assert_eq!(track.artists[0].id.as_deref(), Some("b1"));
    }

    #[test]
    fn test_track_page_drops_null_tracks() {
        let json = json!({
            "items": [
                {"track": track_json("t1", "One")},
                {"track": null},
                {"track": track_json("t3", "Three")}
            ],
            "next": "https://api.spotify.com/v1/playlists/p/tracks?offset=3&limit=3"
        });

        let page = parse_track_page(&json).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.consumed, 3);
        assert_eq!(page.has_more, Some(true));
    }

    #[test]
    fn test_local_tracks_are_kept() {
        let json = json!({
            "items": [{
                "track": {
                    "id": null,
                    "uri": "spotify:local:Me:Demos:My+Local+Song:180",
                    "name": "My Local Song",
                    "is_local": true,
                    "duration_ms": 180000,
                    "album": {"name": "Demos"},
                    "artists": [{"id": null, "name": "Me"}]
                }
            }],
            "next": null
        });

        let page = parse_track_page(&json).unwrap();
        assert_eq!(page.consumed, 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "spotify:local:Me:Demos:My+Local+Song:180");
        assert_eq!(page.items[0].name, "My Local Song");
        assert_eq!(page.items[0].primary_artist(), Some("Me"));
    }

    #[test]
    fn test_last_page_has_no_more() {
        let page = parse_track_page(&json!({"items": [], "next": null})).unwrap();
        assert_eq!(page.has_more, Some(false));
        assert_eq!(page.consumed, 0);
    }

    #[test]
    fn test_parse_playlist() {
        let json = json!({
            "id": "p1",
            "name": "Road Trip",
            "description": "",
            "public": false,
            "snapshot_id": "snap",
            "tracks": {"total": 42},
            "images": [{"url": "https://i.scdn.co/image/abc"}],
            "owner": {"id": "u1", "display_name": "Sam"}
        });

        let playlist = parse_playlist(&json).unwrap();
        assert_eq!(playlist.track_count, 42);
        assert_eq!(playlist.image.as_deref(), Some("https://i.scdn.co/image/abc"));
        assert_eq!(playlist.owner.as_deref(), Some("Sam"));
        assert_eq!(playlist.public, Some(false));
    }

    #[test]
    fn test_playlist_page_follows_next() {
        let json = json!({
            "items": [{"id": "p51", "name": "Late Find"}, {"name": "no id"}],
            "next": "https://api.spotify.com/v1/me/playlists?offset=52&limit=50"
        });

        let page = parse_playlist_page(&json);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.consumed, 2);
        assert_eq!(page.has_more, Some(true));
    }

    #[test]
    fn test_parse_search() {
        let json = json!({"tracks": {"items": [track_json("t1", "Come Together")]}});
        let candidates = parse_search(&json);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].reference.as_str(), "spotify:track:t1");
    }
}
