//! JSON to model converters.
//!
//! Each service gets its own submodule turning raw API responses into
//! [`Track`](crate::models::Track), [`Playlist`](crate::models::Playlist)
//! and [`Candidate`](crate::models::Candidate) values. The helpers here
//! paper over the usual JSON inconsistencies: numeric vs string IDs,
//! missing keys, `null` where an object was expected.

pub mod soundcloud;
pub mod spotify;
pub mod tidal;
pub mod youtube;

use serde_json::Value;

use crate::models::Artist;

/// Get string from JSON, returning empty string if not found.
pub(crate) fn get_str(json: &Value, key: &str) -> String {
    json.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// Get a non-empty string from JSON.
pub(crate) fn get_opt_str(json: &Value, key: &str) -> Option<String> {
    json.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Get string ID from JSON (handles both string and numeric IDs).
pub(crate) fn get_id(json: &Value, key: &str) -> Option<String> {
    json.get(key).and_then(|v| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Get u64 from JSON.
pub(crate) fn get_u64(json: &Value, key: &str) -> Option<u64> {
    json.get(key).and_then(|v| v.as_u64())
}

/// Get u32 from JSON, 0 when missing.
pub(crate) fn get_u32(json: &Value, key: &str) -> u32 {
    get_u64(json, key).unwrap_or(0).min(u32::MAX as u64) as u32
}

/// Get bool from JSON.
pub(crate) fn get_bool(json: &Value, key: &str) -> Option<bool> {
    json.get(key).and_then(|v| v.as_bool())
}

/// Array under `key`, empty when missing or not an array.
pub(crate) fn get_array<'a>(json: &'a Value, key: &str) -> &'a [Value] {
    json.get(key)
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[])
}

/// Artists from an array of `{id, name}` objects, skipping unnamed entries.
pub(crate) fn parse_artist_list(items: &[Value]) -> Vec<Artist> {
    items
        .iter()
        .filter_map(|a| {
            let name = get_str(a, "name");
            if name.is_empty() {
                return None;
            }
            Some(match get_id(a, "id") {
                Some(id) => Artist::with_id(name, id),
                None => Artist::new(name),
            })
        })
        .collect()
}
