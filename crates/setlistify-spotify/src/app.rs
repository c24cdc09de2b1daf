// SPDX-License-Identifier: GPL-3.0-or-later

use crate::search::{search_with, TrackSearch};
use crate::{SPOTIFY_ACCOUNTS_BASE, SPOTIFY_API_BASE};
use async_trait::async_trait;
use serde::Deserialize;
use setlistify_domain::{Song, TrackMatch};
use setlistify_http::{
    ApiError, Credentials, HttpRequest, HttpTransport, RequestHandler, RequestHandlerBuilder,
    ReqwestTransport, Result, TransportError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Tokens are renewed this long before Spotify would reject them.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct AppToken {
    access_token: String,
    expires_at: Instant,
}

/// Catalog-only Spotify client authenticated with client credentials.
#[derive(Debug, Clone)]
pub struct SpotifyAppClient {
    handler: RequestHandler,
    transport: Arc<dyn HttpTransport>,
    accounts_url: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
    token: Arc<Mutex<Option<AppToken>>>,
}

impl SpotifyAppClient {
    /// Exchange client credentials for an app token and return a ready client.
    pub async fn connect(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        Self::builder(client_id, client_secret).connect().await
    }

    pub fn builder(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> SpotifyAppClientBuilder {
        SpotifyAppClientBuilder::new(client_id, client_secret)
    }

    pub fn request_handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// Make sure a valid app token is installed, renewing it when close to expiry.
    async fn ensure_token(&self) -> Result<()> {
        let mut token = self.token.lock().await;
        let fresh = token
            .as_ref()
            .is_some_and(|t| Instant::now() + TOKEN_EXPIRY_MARGIN < t.expires_at);
        if fresh {
            return Ok(());
        }

        let renewed = self.request_token().await?;
        self.handler
            .set_credentials(Credentials::Bearer(renewed.access_token.clone()))
            .await;
        *token = Some(renewed);
        Ok(())
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn request_token(&self) -> Result<AppToken> {
        let url = format!("{}/api/token", self.accounts_url);
        debug!(target: "spotify", url = %url, "requesting app token");

        let request = HttpRequest::post(&url)
            .basic_auth(&self.client_id, &self.client_secret)
            .form(&[("grant_type", "client_credentials")])
            .timeout(self.timeout);

        let response = self.transport.send(request).await.map_err(|error| match error {
            TransportError::Timeout => ApiError::Api("token request timed out".to_string()),
            TransportError::Connection(message) => {
                ApiError::Api(format!("token request failed: {}", message))
            }
        })?;

        match response.status {
            400 | 401 | 403 => {
                return Err(ApiError::Authentication(format!(
                    "Spotify rejected client credentials: {}",
                    response.body
                )))
            }
            status if !response.is_success() => {
                return Err(ApiError::Api(format!(
                    "token request failed with status {}: {}",
                    status, response.body
                )))
            }
            _ => {}
        }

        let token: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Api(format!("invalid token response: {}", e)))?;
        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Authentication("token response has no access_token".to_string()))?;

        info!(target: "spotify", expires_in = token.expires_in, "app token issued");
        Ok(AppToken {
            access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

#[async_trait]
impl TrackSearch for SpotifyAppClient {
    #[instrument(skip_all, fields(song = %song.name))]
    async fn search_track(&self, song: &Song) -> Result<Option<TrackMatch>> {
        self.ensure_token().await?;
        match search_with(&self.handler, song).await {
            // Token revoked before its expiry: exchange once more and retry.
            Err(ApiError::Authentication(reason)) => {
                warn!(target: "spotify", %reason, "app token rejected, renewing");
                self.invalidate_token().await;
                self.ensure_token().await?;
                search_with(&self.handler, song).await
            }
            result => result,
        }
    }
}

/// Builder for configuring a Spotify app client.
#[derive(Debug)]
pub struct SpotifyAppClientBuilder {
    client_id: String,
    client_secret: String,
    base_url: String,
    accounts_url: String,
    timeout: Duration,
    max_requests: usize,
    time_window: Duration,
    cache_ttl: Duration,
    max_retries: u32,
    backoff_base: Duration,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl SpotifyAppClientBuilder {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: SPOTIFY_API_BASE.to_string(),
            accounts_url: SPOTIFY_ACCOUNTS_BASE.to_string(),
            timeout: Duration::from_secs(30),
            max_requests: 2,
            time_window: Duration::from_secs(1),
            cache_ttl: Duration::from_secs(300),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            transport: None,
        }
    }

    /// Set a custom Web API base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set a custom accounts service URL (useful for testing).
    pub fn accounts_url(mut self, url: impl Into<String>) -> Self {
        self.accounts_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

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

    /// Validate the credentials against the accounts service and build the client.
    pub async fn connect(self) -> Result<SpotifyAppClient> {
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            return Err(ApiError::Authentication(
                "Spotify client id and secret are required".to_string(),
            ));
        }

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));

        let handler = RequestHandlerBuilder::new(self.base_url)
            .rate_limit(self.max_requests, self.time_window)
            .cache_ttl(self.cache_ttl)
            .timeout(self.timeout)
            .max_retries(self.max_retries)
            .backoff_base(self.backoff_base)
            .transport(transport.clone())
            .build();

        let client = SpotifyAppClient {
            handler,
            transport,
            accounts_url: self.accounts_url.trim_end_matches('/').to_string(),
            client_id: self.client_id,
            client_secret: self.client_secret,
            timeout: self.timeout,
            token: Arc::new(Mutex::new(None)),
        };
        client.ensure_token().await?;
        Ok(client)
    }
}
