// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_VENUE: &str = "Unknown Venue";
pub const UNKNOWN_CITY: &str = "Unknown City";
pub const UNKNOWN_COUNTRY: &str = "Unknown Country";

/// Format of setlist.fm event dates (`dd-MM-yyyy`).
pub const EVENT_DATE_FORMAT: &str = "%d-%m-%Y";

// ============================================================================
// Artists
// ============================================================================

/// Artist as returned by a catalog search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub name: String,
    /// MusicBrainz identifier used by setlist.fm.
    pub mbid: String,
    pub disambiguation: String,
    pub url: String,
}

// ============================================================================
// Songs
// ============================================================================

/// One song performed at a concert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SongRecord")]
pub struct Song {
    pub name: String,
    /// Artist performing the song at this concert.
    pub artist: String,
    /// 0 for the main set, N for the Nth encore.
    pub encore: u32,
    /// Name of the original performer when the song is a cover.
    pub cover: Option<String>,
    /// Cover name for covers, otherwise the performing artist. Never empty.
    pub original_artist: String,
    pub info: String,
    /// Song was played from tape rather than performed live.
    pub tape: bool,
    /// 1-based position within its set.
    pub position: u32,
    /// 1-based index of its set within the setlist.
    pub set_number: u32,
}

impl Song {
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        let artist = non_blank(artist.into()).unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        Self {
            name: name.into(),
            original_artist: artist.clone(),
            artist,
            encore: 0,
            cover: None,
            info: String::new(),
            tape: false,
            position: 1,
            set_number: 1,
        }
    }

    pub fn encore(mut self, level: u32) -> Self {
        self.encore = level;
        self
    }

    /// Marks the song as a cover of `cover`; blank names are ignored.
    pub fn cover(mut self, cover: Option<String>) -> Self {
        self.cover = cover.and_then(non_blank);
        self.original_artist = self.cover.clone().unwrap_or_else(|| self.artist.clone());
        self
    }

    /// Overrides the resolved original artist. Blank values keep the current resolution.
    pub fn original_artist(mut self, original_artist: impl Into<String>) -> Self {
        if let Some(original_artist) = non_blank(original_artist.into()) {
            self.original_artist = original_artist;
        }
        self
    }

    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    pub fn tape(mut self, tape: bool) -> Self {
        self.tape = tape;
        self
    }

    pub fn at(mut self, set_number: u32, position: u32) -> Self {
        self.set_number = set_number;
        self.position = position;
        self
    }

    pub fn is_cover(&self) -> bool {
        self.cover.is_some()
    }

    pub fn is_encore(&self) -> bool {
        self.encore > 0
    }

    /// Identity of the song within its setlist: `(set_number, position)`.
    pub fn key(&self) -> (u32, u32) {
        (self.set_number, self.position)
    }

    /// Pairs the song with a music-catalog match without touching the original record.
    pub fn with_match(&self, track: Option<TrackMatch>) -> PlaylistEntry {
        PlaylistEntry {
            song: self.clone(),
            track,
        }
    }
}

/// Serialized form of [`Song`]. Deserialized songs go through the same artist
/// resolution as [`Song::new`], so `original_artist` is never empty.
#[derive(Deserialize)]
struct SongRecord {
    name: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    encore: u32,
    #[serde(default)]
    cover: Option<String>,
    #[serde(default)]
    original_artist: String,
    #[serde(default)]
    info: String,
    #[serde(default)]
    tape: bool,
    #[serde(default = "first")]
    position: u32,
    #[serde(default = "first")]
    set_number: u32,
}

fn first() -> u32 {
    1
}

impl From<SongRecord> for Song {
    fn from(record: SongRecord) -> Self {
        Song::new(record.name, record.artist)
            .encore(record.encore)
            .cover(record.cover)
            .original_artist(record.original_artist)
            .info(record.info)
            .tape(record.tape)
            .at(record.set_number, record.position)
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

// ============================================================================
// Setlists
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetListInfo {
    pub id: String,
    pub artist: String,
    /// Event date as sent by the catalog (`dd-MM-yyyy`).
    pub date: String,
    pub venue: String,
    pub city: String,
    pub country: String,
    pub tour: Option<String>,
    pub url: String,
    pub venue_id: Option<String>,
    pub artist_mbid: Option<String>,
}

impl SetListInfo {
    /// Calendar date of the event, or `None` when the date is missing or malformed.
    /// Dates are day-first, so month filtering depends on that order.
    pub fn event_date(&self) -> Option<NaiveDate> {
        if self.date.is_empty() {
            return None;
        }
        NaiveDate::parse_from_str(&self.date, EVENT_DATE_FORMAT).ok()
    }

    pub fn display_title(&self) -> String {
        format!(
            "{} - {}, {} ({})",
            self.artist, self.venue, self.city, self.date
        )
    }
}

/// Restrictions applied while paging through an artist's setlists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetlistFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    /// Case-insensitive substring of the venue name.
    pub venue: Option<String>,
    /// Case-insensitive substring of the tour name.
    pub tour: Option<String>,
}

impl SetlistFilter {
    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    pub fn tour(mut self, tour: impl Into<String>) -> Self {
        self.tour = Some(tour.into());
        self
    }

    /// Month and year only apply when the setlist date parses; an unparsable
    /// date is not excluded by them.
    pub fn matches(&self, setlist: &SetListInfo) -> bool {
        if let Some(date) = setlist.event_date() {
            if self.month.is_some_and(|month| date.month() != month) {
                return false;
            }
            if self.year.is_some_and(|year| date.year() != year) {
                return false;
            }
        }

        if let Some(venue) = self.venue.as_deref() {
            if !contains_ignore_case(&setlist.venue, venue) {
                return false;
            }
        }

        if let Some(tour) = self.tour.as_deref() {
            if !contains_ignore_case(setlist.tour.as_deref().unwrap_or_default(), tour) {
                return false;
            }
        }

        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ============================================================================
// Music catalog
// ============================================================================

/// A track in the music-streaming catalog matched to a performed song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMatch {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub album_type: String,
    pub artwork_url: Option<String>,
    pub external_url: String,
}

/// A song enriched with its catalog match, if one was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub song: Song,
    pub track: Option<TrackMatch>,
}

impl PlaylistEntry {
    pub fn is_matched(&self) -> bool {
        self.track.is_some()
    }
}
