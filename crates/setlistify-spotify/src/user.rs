// SPDX-License-Identifier: GPL-3.0-or-later

use crate::search::{match_songs, search_with, TrackSearch};
use crate::SPOTIFY_API_BASE;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use setlistify_domain::{SetListInfo, Song, TrackMatch};
use setlistify_http::{
    ApiError, Credentials, HttpTransport, RequestHandler, RequestHandlerBuilder, RequestOptions,
    Result,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Spotify accepts at most this many URIs per add-tracks call.
const MAX_TRACKS_PER_REQUEST: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
    pub url: String,
}

/// Outcome of turning a setlist into a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub url: String,
    pub matched: usize,
    /// Songs for which no catalog track was found, in setlist order.
    pub unmatched: Vec<Song>,
}

/// Spotify client acting on behalf of a user, with a token obtained elsewhere.
#[derive(Debug, Clone)]
pub struct SpotifyUserClient {
    handler: RequestHandler,
}

impl SpotifyUserClient {
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_options(access_token, SPOTIFY_API_BASE, None)
    }

    /// Build against a custom API base and transport (useful for testing).
    pub fn with_options(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
        transport: Option<Arc<dyn HttpTransport>>,
    ) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(ApiError::Authentication(
                "Spotify user access token is required".to_string(),
            ));
        }

        let mut handler = RequestHandlerBuilder::new(base_url)
            .credentials(Credentials::Bearer(access_token));
        if let Some(transport) = transport {
            handler = handler.transport(transport);
        }

        Ok(Self {
            handler: handler.build(),
        })
    }

    pub fn request_handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// Profile of the token's owner.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<SpotifyUser> {
        let data = self
            .handler
            .make_request("me", &[], RequestOptions::uncached())
            .await?;

        let id = data
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::Authentication("token has no associated user".to_string()))?
            .to_string();
        let display_name = data
            .get("display_name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(&id)
            .to_string();

        Ok(SpotifyUser { id, display_name })
    }

    #[instrument(skip(self, description))]
    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<CreatedPlaylist> {
        let body = json!({
            "name": name,
            "description": description,
            "public": public,
        });
        let data = self
            .handler
            .send_json(
                Method::POST,
                &format!("users/{}/playlists", user_id),
                Some(body),
            )
            .await?;

        let id = data
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Api("playlist response has no id".to_string()))?
            .to_string();
        let url = data
            .pointer("/external_urls/spotify")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", id));

        info!(target: "spotify", playlist = %id, "playlist created");
        Ok(CreatedPlaylist { id, url })
    }

    /// Append tracks in order, in batches the API accepts.
    #[instrument(skip(self, uris), fields(count = uris.len()))]
    pub async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        let endpoint = format!("playlists/{}/tracks", playlist_id);
        for batch in uris.chunks(MAX_TRACKS_PER_REQUEST) {
            self.handler
                .send_json(Method::POST, &endpoint, Some(json!({ "uris": batch })))
                .await?;
        }
        Ok(())
    }

    /// Match `songs` through `search` and publish the matches as a new playlist
    /// owned by the current user.
    #[instrument(skip_all, fields(setlist = %setlist.id, songs = songs.len()))]
    pub async fn create_playlist_from_setlist<S>(
        &self,
        setlist: &SetListInfo,
        songs: &[Song],
        search: &S,
        public: bool,
    ) -> Result<PlaylistSummary>
    where
        S: TrackSearch + ?Sized,
    {
        let entries = match_songs(search, songs).await?;
        let uris: Vec<String> = entries
            .iter()
            .filter_map(|e| e.track.as_ref().map(|t| t.uri.clone()))
            .collect();
        if uris.is_empty() {
            return Err(ApiError::NotFound(format!(
                "no tracks found for setlist {}",
                setlist.id
            )));
        }

        let user = self.current_user().await?;
        let name = format!("{} - {} ({})", setlist.artist, setlist.venue, setlist.date);
        let description = format!("Setlist of {}. {}", setlist.display_title(), setlist.url);
        let playlist = self
            .create_playlist(&user.id, &name, description.trim(), public)
            .await?;
        self.add_tracks(&playlist.id, &uris).await?;

        let unmatched: Vec<Song> = entries
            .into_iter()
            .filter(|e| !e.is_matched())
            .map(|e| e.song)
            .collect();

        Ok(PlaylistSummary {
            id: playlist.id,
            url: playlist.url,
            matched: uris.len(),
            unmatched,
        })
    }
}

#[async_trait]
impl TrackSearch for SpotifyUserClient {
    #[instrument(skip_all, fields(song = %song.name))]
    async fn search_track(&self, song: &Song) -> Result<Option<TrackMatch>> {
        search_with(&self.handler, song).await
    }
}
