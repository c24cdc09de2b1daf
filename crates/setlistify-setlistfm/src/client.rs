// SPDX-License-Identifier: GPL-3.0-or-later

use crate::parser;
use serde_json::Value;
use setlistify_domain::{ArtistSummary, SetListInfo, SetlistFilter, Song};
use setlistify_http::{
    ApiError, Credentials, HttpTransport, RequestHandler, RequestHandlerBuilder, Result,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const SETLISTFM_API_BASE: &str = "https://api.setlist.fm/rest/1.0";
const API_KEY_HEADER: &str = "x-api-key";

/// setlist.fm API client with rate limiting, caching and retries.
#[derive(Debug, Clone)]
pub struct SetlistFmClient {
    handler: RequestHandler,
}

impl SetlistFmClient {
    /// Create a client with default settings. Fails if `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key).build()
    }

    /// Create a client builder for custom configuration.
    pub fn builder(api_key: impl Into<String>) -> SetlistFmClientBuilder {
        SetlistFmClientBuilder::new(api_key)
    }

    pub fn request_handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// Search artists by name, most relevant first.
    ///
    /// # Example
    /// ```no_run
    /// # use setlistify_setlistfm::SetlistFmClient;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = SetlistFmClient::new("my-api-key")?;
    /// let artists = client.search_artist("Radiohead", 1).await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self))]
    pub async fn search_artist(&self, name: &str, page: u32) -> Result<Vec<ArtistSummary>> {
        let params = [
            ("artistName", name.to_string()),
            ("p", page.to_string()),
            ("sort", "relevance".to_string()),
        ];
        let data = self.handler.get("search/artists", &params).await?;
        Ok(parser::parse_artist_search(&data))
    }

    /// One page of an artist's setlists, newest first.
    #[instrument(skip(self))]
    pub async fn get_artist_setlists(
        &self,
        artist_mbid: &str,
        page: u32,
    ) -> Result<Vec<SetListInfo>> {
        let (setlists, _) = self.setlist_page(artist_mbid, page).await?;
        Ok(setlists)
    }

    /// Page through an artist's setlists, keeping those that match `filter`.
    ///
    /// Pages are fetched in order from 1 up to `page_limit`, stopping early at
    /// the first empty page or once the advertised page count is reached.
    #[instrument(skip(self))]
    pub async fn get_artist_setlists_filtered(
        &self,
        artist_mbid: &str,
        page_limit: u32,
        filter: &SetlistFilter,
    ) -> Result<Vec<SetListInfo>> {
        let mut results = Vec::new();

        for page in 1..=page_limit {
            let (setlists, total_pages) = match self.setlist_page(artist_mbid, page).await {
                Ok(found) => found,
                // setlist.fm answers 404 for pages past the end.
                Err(ApiError::NotFound(_)) if page > 1 => break,
                Err(error) => return Err(error),
            };
            if setlists.is_empty() {
                break;
            }

            results.extend(setlists.into_iter().filter(|s| filter.matches(s)));

            if total_pages != 0 && page >= total_pages {
                break;
            }
        }

        debug!(target: "setlistfm", matched = results.len(), "filtered setlists");
        Ok(results)
    }

    /// Songs of a setlist in performance order.
    #[instrument(skip(self))]
    pub async fn get_setlist_songs(&self, setlist_id: &str) -> Result<Vec<Song>> {
        let data = self.setlist(setlist_id).await?;
        Ok(parser::parse_setlist_songs(&data))
    }

    /// Event details of a single setlist.
    #[instrument(skip(self))]
    pub async fn get_setlist(&self, setlist_id: &str) -> Result<SetListInfo> {
        let data = self.setlist(setlist_id).await?;
        Ok(parser::parse_setlist_info(&data))
    }

    /// Up to `limit` of the most recent setlists of the best-matching artist.
    #[instrument(skip(self))]
    pub async fn get_recent_setlists(
        &self,
        artist_name: &str,
        limit: usize,
    ) -> Result<Vec<SetListInfo>> {
        let artist = self
            .search_artist(artist_name, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(format!("{} was not found", artist_name)))?;

        info!(target: "setlistfm", artist = %artist.name, mbid = %artist.mbid, "collecting recent setlists");

        let mut setlists = Vec::new();
        let mut page = 1;
        while setlists.len() < limit {
            let (batch, total_pages) = match self.setlist_page(&artist.mbid, page).await {
                Ok(found) => found,
                Err(ApiError::NotFound(_)) if page > 1 => break,
                Err(error) => return Err(error),
            };
            if batch.is_empty() {
                break;
            }
            setlists.extend(batch);
            if total_pages != 0 && page >= total_pages {
                break;
            }
            page += 1;
        }

        setlists.truncate(limit);
        Ok(setlists)
    }

    async fn setlist(&self, setlist_id: &str) -> Result<Value> {
        self.handler
            .get(&format!("setlist/{}", setlist_id), &[])
            .await
    }

    async fn setlist_page(&self, artist_mbid: &str, page: u32) -> Result<(Vec<SetListInfo>, u32)> {
        let data = self
            .handler
            .get(
                &format!("artist/{}/setlists", artist_mbid),
                &[("p", page.to_string())],
            )
            .await?;
        Ok((
            parser::parse_setlist_search(&data),
            parser::parse_total_pages(&data),
        ))
    }
}

/// Builder for configuring a setlist.fm client.
#[derive(Debug)]
pub struct SetlistFmClientBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
    max_requests: usize,
    time_window: Duration,
    cache_ttl: Duration,
    max_retries: u32,
    backoff_base: Duration,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl SetlistFmClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: SETLISTFM_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            max_requests: 2,
            time_window: Duration::from_secs(1),
            cache_ttl: Duration::from_secs(300),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            transport: None,
        }
    }

    /// Set a custom base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow at most `max_requests` per trailing `time_window`.
    pub fn rate_limit(mut self, max_requests: usize, time_window: Duration) -> Self {
        self.max_requests = max_requests;
        self.time_window = time_window;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the setlist.fm client.
    pub fn build(self) -> Result<SetlistFmClient> {
        if self.api_key.trim().is_empty() {
            return Err(ApiError::Authentication(
                "setlist.fm API key is required".to_string(),
            ));
        }

        let mut handler = RequestHandlerBuilder::new(self.base_url)
            .credentials(Credentials::ApiKey {
                header: API_KEY_HEADER.to_string(),
                key: self.api_key,
            })
            .rate_limit(self.max_requests, self.time_window)
            .cache_ttl(self.cache_ttl)
            .timeout(self.timeout)
            .max_retries(self.max_retries)
            .backoff_base(self.backoff_base);
        if let Some(transport) = self.transport {
            handler = handler.transport(transport);
        }

        Ok(SetlistFmClient {
            handler: handler.build(),
        })
    }
}
