// SPDX-License-Identifier: GPL-3.0-or-later

//! Spotify Web API clients.
//!
//! Track search is one capability, [`TrackSearch`], offered under two
//! authentication modes: [`SpotifyAppClient`] uses client credentials and can
//! only read the catalog, [`SpotifyUserClient`] acts with a user's access
//! token and can also create playlists.

pub mod app;
pub mod parser;
pub mod search;
pub mod user;

pub use app::{SpotifyAppClient, SpotifyAppClientBuilder};
pub use search::{match_songs, select_best_match, TrackSearch};
pub use setlistify_http::{ApiError, Result};
pub use user::{CreatedPlaylist, PlaylistSummary, SpotifyUser, SpotifyUserClient};

pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
pub const SPOTIFY_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
