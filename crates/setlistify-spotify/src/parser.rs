// SPDX-License-Identifier: GPL-3.0-or-later

use serde_json::Value;
use setlistify_domain::TrackMatch;

fn text(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Tracks of a `GET /search?type=track` response, in ranking order.
pub fn parse_track_search(data: &Value) -> Vec<TrackMatch> {
    data.pointer("/tracks/items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter(|i| i.is_object()).map(parse_track).collect())
        .unwrap_or_default()
}

pub fn parse_track(track: &Value) -> TrackMatch {
    let artists = track
        .get("artists")
        .and_then(Value::as_array)
        .map(|artists| {
            artists
                .iter()
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    TrackMatch {
        id: text(track, "/id"),
        uri: text(track, "/uri"),
        name: text(track, "/name"),
        artists,
        album: text(track, "/album/name"),
        album_type: text(track, "/album/album_type"),
        artwork_url: track
            .pointer("/album/images/0/url")
            .and_then(Value::as_str)
            .map(str::to_string),
        external_url: text(track, "/external_urls/spotify"),
    }
}
