// SPDX-License-Identifier: GPL-3.0-or-later

use crate::parser;
use async_trait::async_trait;
use setlistify_domain::{PlaylistEntry, Song, TrackMatch};
use setlistify_http::{ApiError, RequestHandler, Result};
use tracing::{debug, warn};

/// Album names containing any of these words are releases we avoid
/// matching when a studio version exists.
const VARIANT_ALBUM_KEYWORDS: &[&str] = &[
    "live",
    "remaster",
    "remastered",
    "compilation",
    "greatest hits",
    "best of",
    "deluxe",
];

const SEARCH_LIMIT: u32 = 10;

/// Looks up the catalog track for a performed song.
#[async_trait]
pub trait TrackSearch: Send + Sync {
    /// Best catalog match for `song`, or `None` when nothing plausible exists.
    async fn search_track(&self, song: &Song) -> Result<Option<TrackMatch>>;
}

/// Match every song in order. A song whose lookup comes back not-found is left
/// unmatched; any other failure aborts.
pub async fn match_songs<S>(search: &S, songs: &[Song]) -> Result<Vec<PlaylistEntry>>
where
    S: TrackSearch + ?Sized,
{
    let mut entries = Vec::with_capacity(songs.len());
    for song in songs {
        let track = match search.search_track(song).await {
            Ok(track) => track,
            Err(ApiError::NotFound(_)) => None,
            Err(error) => return Err(error),
        };
        entries.push(song.with_match(track));
    }

    let matched = entries.iter().filter(|e| e.is_matched()).count();
    debug!(target: "spotify", matched, total = entries.len(), "matched songs");
    Ok(entries)
}

/// Search query restricting both the track title and the original artist.
pub(crate) fn search_query(song: &Song) -> String {
    format!(
        "track:\"{}\" artist:\"{}\"",
        song.name.replace('"', ""),
        song.original_artist.replace('"', "")
    )
}

/// Shared search path of both client flavours.
pub(crate) async fn search_with(
    handler: &RequestHandler,
    song: &Song,
) -> Result<Option<TrackMatch>> {
    if song.name.trim().is_empty() {
        warn!(target: "spotify", "skipping song without a name");
        return Ok(None);
    }

    let params = [
        ("q", search_query(song)),
        ("type", "track".to_string()),
        ("limit", SEARCH_LIMIT.to_string()),
    ];
    let data = handler.get("search", &params).await?;
    let candidates = parser::parse_track_search(&data);
    let best = select_best_match(song, candidates);

    match &best {
        Some(track) => {
            debug!(target: "spotify", song = %song.name, track = %track.uri, album = %track.album, "track matched")
        }
        None => debug!(target: "spotify", song = %song.name, "no track matched"),
    }
    Ok(best)
}

fn words(value: &str) -> String {
    let words: Vec<String> = value
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    format!(" {} ", words.join(" "))
}

fn is_variant_release(track: &TrackMatch) -> bool {
    if track.album_type.eq_ignore_ascii_case("compilation") {
        return true;
    }
    let album = words(&track.album);
    VARIANT_ALBUM_KEYWORDS
        .iter()
        .any(|keyword| album.contains(&format!(" {} ", keyword)))
}

fn artist_matches(track: &TrackMatch, artist: &str) -> bool {
    let wanted = artist.trim().to_lowercase();
    if wanted.is_empty() {
        return false;
    }
    track
        .artists
        .iter()
        .any(|candidate| candidate.to_lowercase().contains(&wanted))
}

/// Pick the best candidate for `song`.
///
/// Only candidates credited to the song's original artist qualify. The first
/// of those on a regular release wins; failing that, the first artist match.
pub fn select_best_match(song: &Song, candidates: Vec<TrackMatch>) -> Option<TrackMatch> {
    let (preferred, variants): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .filter(|track| artist_matches(track, &song.original_artist))
        .partition(|track| !is_variant_release(track));

    preferred.into_iter().next().or_else(|| variants.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, artist: &str, album: &str, album_type: &str) -> TrackMatch {
        TrackMatch {
            id: id.to_string(),
            uri: format!("spotify:track:{}", id),
            name: "Song".to_string(),
            artists: vec![artist.to_string()],
            album: album.to_string(),
            album_type: album_type.to_string(),
            artwork_url: None,
            external_url: String::new(),
        }
    }

    #[test]
    fn test_prefers_studio_release() {
        let song = Song::new("Creep", "Radiohead");
        let best = select_best_match(
            &song,
            vec![
                track("live", "Radiohead", "Live at the Astoria", "album"),
                track("comp", "Radiohead", "Radiohead: The Best Of", "compilation"),
                track("studio", "Radiohead", "Pablo Honey", "album"),
            ],
        );
        assert_eq!(best.unwrap().id, "studio");
    }

    #[test]
    fn test_falls_back_to_variant_when_only_option() {
        let song = Song::new("Creep", "Radiohead");
        let best = select_best_match(
            &song,
            vec![track("remaster", "Radiohead", "Pablo Honey (Remastered)", "album")],
        );
        assert_eq!(best.unwrap().id, "remaster");
    }

    #[test]
    fn test_rejects_other_artists() {
        let song = Song::new("Creep", "Radiohead");
        let best = select_best_match(
            &song,
            vec![track("cover", "Postmodern Jukebox", "Covers", "album")],
        );
        assert!(best.is_none());
    }

    #[test]
    fn test_shorter_catalog_artist_does_not_match() {
        let song = Song::new("Fortress Europe", "Asian Dub Foundation");
        let best = select_best_match(
            &song,
            vec![track("sia", "Sia", "This Is Acting", "album")],
        );
        assert!(best.is_none());
    }

    #[test]
    fn test_cover_matches_original_artist() {
        let song = Song::new("Ceremony", "Radiohead").cover(Some("Joy Division".to_string()));
        let best = select_best_match(
            &song,
            vec![
                track("rh", "Radiohead", "Live Sessions", "album"),
                track("jd", "Joy Division", "Still", "album"),
            ],
        );
        assert_eq!(best.unwrap().id, "jd");
    }

    #[test]
    fn test_keyword_needs_whole_word() {
        assert!(!is_variant_release(&track("a", "A", "Alive", "album")));
        assert!(!is_variant_release(&track("a", "A", "Oliver's Army", "album")));
        assert!(is_variant_release(&track("a", "A", "Live!", "album")));
        assert!(is_variant_release(&track("a", "A", "Greatest Hits Vol. 2", "album")));
        assert!(is_variant_release(&track("a", "A", "Anything", "Compilation")));
    }

    #[test]
    fn test_artist_match_is_case_insensitive() {
        let t = track("a", "The Beatles", "Abbey Road", "album");
        assert!(artist_matches(&t, "the beatles"));
        assert!(artist_matches(&t, "Beatles"));
        assert!(!artist_matches(&t, ""));
        assert!(!artist_matches(&t, "The Beatles Tribute Band"));
    }

    #[test]
    fn test_search_query_strips_quotes() {
        let song = Song::new("Say \"Hi\"", "Band");
        assert_eq!(search_query(&song), "track:\"Say Hi\" artist:\"Band\"");
    }

    struct StubSearch;

    #[async_trait]
    impl TrackSearch for StubSearch {
        async fn search_track(&self, song: &Song) -> Result<Option<TrackMatch>> {
            match song.name.as_str() {
                "missing" => Err(ApiError::NotFound("search".to_string())),
                "broken" => Err(ApiError::RateLimited),
                "unknown" => Ok(None),
                _ => Ok(Some(track(&song.name, &song.artist, "Album", "album"))),
            }
        }
    }

    #[tokio::test]
    async fn test_match_songs_keeps_order_and_originals() {
        let songs = vec![
            Song::new("one", "A").at(1, 1),
            Song::new("unknown", "A").at(1, 2),
            Song::new("missing", "A").at(2, 1),
        ];

        let entries = match_songs(&StubSearch, &songs).await.unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].track.as_ref().unwrap().id, "one");
        assert!(!entries[1].is_matched());
        assert!(!entries[2].is_matched());
        let originals: Vec<_> = entries.iter().map(|e| e.song.clone()).collect();
        assert_eq!(originals, songs);
    }

    #[tokio::test]
    async fn test_match_songs_propagates_failures() {
        let songs = vec![Song::new("broken", "A")];
        let result = match_songs(&StubSearch, &songs).await;
        assert!(matches!(result, Err(ApiError::RateLimited)));
    }
}
