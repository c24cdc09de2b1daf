// SPDX-License-Identifier: GPL-3.0-or-later

//! Conversion of raw setlist.fm payloads into domain records.
//!
//! Payloads are walked as untyped JSON. Missing sub-objects fall back to
//! named defaults and missing collections to empty lists; nothing here fails.

use serde_json::Value;
use setlistify_domain::{
    ArtistSummary, SetListInfo, Song, UNKNOWN_ARTIST, UNKNOWN_CITY, UNKNOWN_COUNTRY,
    UNKNOWN_VENUE,
};

static NULL: Value = Value::Null;

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn string_or(value: &Value, key: &str, default: &str) -> String {
    str_field(value, key).unwrap_or(default).to_string()
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Object under `key`, or `Null` when absent so further lookups fall through.
fn object<'a>(value: &'a Value, key: &str) -> &'a Value {
    value.get(key).filter(|v| v.is_object()).unwrap_or(&NULL)
}

pub fn parse_artist_search(data: &Value) -> Vec<ArtistSummary> {
    array(data, "artist")
        .iter()
        .map(|artist| ArtistSummary {
            name: string_or(artist, "name", ""),
            mbid: string_or(artist, "mbid", ""),
            disambiguation: string_or(artist, "disambiguation", ""),
            url: string_or(artist, "url", ""),
        })
        .collect()
}

pub fn parse_setlist_search(data: &Value) -> Vec<SetListInfo> {
    array(data, "setlist")
        .iter()
        .map(parse_setlist_info)
        .collect()
}

pub fn parse_setlist_info(data: &Value) -> SetListInfo {
    let artist = object(data, "artist");
    let venue = object(data, "venue");
    let city = object(venue, "city");
    let country = object(city, "country");
    let tour = object(data, "tour");

    SetListInfo {
        id: string_or(data, "id", ""),
        artist: string_or(artist, "name", UNKNOWN_ARTIST),
        date: string_or(data, "eventDate", ""),
        venue: string_or(venue, "name", UNKNOWN_VENUE),
        city: string_or(city, "name", UNKNOWN_CITY),
        country: string_or(country, "name", UNKNOWN_COUNTRY),
        tour: str_field(tour, "name").map(str::to_string),
        url: string_or(data, "url", ""),
        venue_id: str_field(venue, "id").map(str::to_string),
        artist_mbid: str_field(artist, "mbid").map(str::to_string),
    }
}

/// Flattens `sets.set[].song[]` into songs in performance order.
///
/// Positions restart at 1 in every set; set numbers count every set in the
/// payload, including sets that list no songs.
pub fn parse_setlist_songs(data: &Value) -> Vec<Song> {
    let sets = array(object(data, "sets"), "set");
    let artist = string_or(object(data, "artist"), "name", UNKNOWN_ARTIST);

    let mut songs = Vec::new();
    for (set_index, set) in sets.iter().enumerate() {
        let encore = set
            .get("encore")
            .and_then(Value::as_u64)
            .and_then(|level| u32::try_from(level).ok())
            .unwrap_or(0);

        for (song_index, song) in array(set, "song").iter().enumerate() {
            let cover = str_field(object(song, "cover"), "name").map(str::to_string);

            songs.push(
                Song::new(string_or(song, "name", ""), artist.clone())
                    .encore(encore)
                    .cover(cover)
                    .info(string_or(song, "info", ""))
                    .tape(song.get("tape").and_then(Value::as_bool).unwrap_or(false))
                    .at(set_index as u32 + 1, song_index as u32 + 1),
            );
        }
    }
    songs
}

/// Number of result pages advertised by a paginated response, 0 if unknown.
pub fn parse_total_pages(data: &Value) -> u32 {
    let total = data.get("total").and_then(Value::as_u64).unwrap_or(0);
    let per_page = data.get("itemsPerPage").and_then(Value::as_u64).unwrap_or(0);
    if per_page == 0 {
        return 0;
    }
    u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX)
}
