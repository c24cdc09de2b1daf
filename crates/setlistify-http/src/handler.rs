// SPDX-License-Identifier: GPL-3.0-or-later

use crate::cache::{cache_key, CacheManager};
use crate::error::{ApiError, Result};
use crate::rate_limiter::RateLimiter;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, instrument, warn};
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Authentication attached to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    None,
    /// Key sent in a dedicated header, e.g. `x-api-key`.
    ApiKey { header: String, key: String },
    /// OAuth access token sent as `Authorization: Bearer`.
    Bearer(String),
}

impl Credentials {
    fn header(&self) -> Option<(String, String)> {
        match self {
            Credentials::None => None,
            Credentials::ApiKey { header, key } => Some((header.clone(), key.clone())),
            Credentials::Bearer(token) => {
                Some(("Authorization".to_string(), format!("Bearer {}", token)))
            }
        }
    }
}

/// Per-call overrides for [`RequestHandler::make_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub use_cache: bool,
    /// Attempts before giving up; `None` uses the handler's configured value.
    pub max_retries: Option<u32>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            max_retries: None,
        }
    }
}

impl RequestOptions {
    pub fn uncached() -> Self {
        Self {
            use_cache: false,
            ..Self::default()
        }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Delay before retrying after the zero-based `attempt` failed: `base * 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Why one attempt did not produce a value.
#[derive(Debug)]
enum Failure {
    RateLimited,
    Status { status: u16, body: String },
    Timeout,
    Transport(String),
    Decode(String),
}

impl Failure {
    fn into_error(self, attempts: u32) -> ApiError {
        match self {
            Failure::RateLimited => ApiError::RateLimited,
            Failure::Status { status, body } => {
                ApiError::Api(format!("request failed with status {}: {}", status, body))
            }
            Failure::Timeout => {
                ApiError::Api(format!("request timeout after {} attempts", attempts))
            }
            Failure::Transport(message) => ApiError::Api(format!("request failed: {}", message)),
            Failure::Decode(message) => {
                ApiError::Api(format!("invalid response body: {}", message))
            }
        }
    }
}

/// Sends JSON requests to one API through a rate limiter and a response cache,
/// retrying transient failures with exponential backoff.
///
/// Clones share the limiter, cache and credentials.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    headers: Vec<(String, String)>,
    credentials: Arc<RwLock<Credentials>>,
    rate_limiter: RateLimiter,
    cache: CacheManager,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
}

impl RequestHandler {
    pub fn builder(base_url: impl Into<String>) -> RequestHandlerBuilder {
        RequestHandlerBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub async fn set_credentials(&self, credentials: Credentials) {
        *self.credentials.write().await = credentials;
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// GET `endpoint` with the default options (cached, configured retries).
    pub async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        self.make_request(endpoint, params, RequestOptions::default())
            .await
    }

    /// GET `endpoint` and decode the JSON body.
    ///
    /// A fresh cached response is returned without touching the rate limiter.
    /// Otherwise up to `max_retries` attempts are made: 404 and 401 fail at
    /// once, 429, other error statuses, timeouts and transport failures are
    /// retried after `backoff_base * 2^attempt`.
    #[instrument(skip_all, fields(endpoint = endpoint))]
    pub async fn make_request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        options: RequestOptions,
    ) -> Result<Value> {
        let key = cache_key(endpoint, params);

        if options.use_cache {
            if let Some(cached) = self.cache.get(&key).await {
                debug!(target: "http", endpoint, "cache hit");
                return Ok(cached);
            }
        }

        let url = self.url(endpoint)?;
        let max_retries = options.max_retries.unwrap_or(self.max_retries);

        for attempt in 0..max_retries {
            self.rate_limiter.wait_if_needed().await;

            info!(target: "http", url = %url, attempt = attempt + 1, "making request");
            let request = self
                .request(Method::GET, &url)
                .await
                .query(params)
                .timeout(self.timeout);

            let failure = match self.transport.send(request).await {
                Ok(response) if response.status == 404 => {
                    return Err(ApiError::NotFound(endpoint.to_string()));
                }
                Ok(response) if response.status == 401 => {
                    warn!(target: "http", url = %url, "credentials rejected");
                    return Err(ApiError::Authentication(response.body));
                }
                Ok(response) if response.status == 429 => Failure::RateLimited,
                Ok(response) if !response.is_success() => Failure::Status {
                    status: response.status,
                    body: response.body,
                },
                Ok(response) => match serde_json::from_str::<Value>(&response.body) {
                    Ok(value) => {
                        if options.use_cache {
                            self.cache.set(key, value.clone()).await;
                        }
                        return Ok(value);
                    }
                    Err(error) => Failure::Decode(error.to_string()),
                },
                Err(TransportError::Timeout) => Failure::Timeout,
                Err(TransportError::Connection(message)) => Failure::Transport(message),
            };

            if attempt + 1 == max_retries {
                warn!(target: "http", url = %url, ?failure, "giving up after {} attempts", max_retries);
                return Err(failure.into_error(max_retries));
            }

            let delay = backoff_delay(self.backoff_base, attempt);
            warn!(target: "http", url = %url, ?failure, "attempt {} failed, retrying in {:?}", attempt + 1, delay);
            sleep(delay).await;
        }

        Err(ApiError::Api("max retries exceeded".to_string()))
    }

    /// Send a single uncached write. Writes are rate limited but never retried.
    #[instrument(skip_all, fields(method = %method, endpoint = endpoint))]
    pub async fn send_json(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let url = self.url(endpoint)?;
        self.rate_limiter.wait_if_needed().await;

        let mut request = self.request(method, &url).await.timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        info!(target: "http", url = %url, "sending write");
        let response = self.transport.send(request).await.map_err(|error| match error {
            TransportError::Timeout => ApiError::Api("request timed out".to_string()),
            TransportError::Connection(message) => {
                ApiError::Api(format!("request failed: {}", message))
            }
        })?;

        classify_write(endpoint, response)
    }

    fn url(&self, endpoint: &str) -> Result<String> {
        let raw = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        Url::parse(&raw)
            .map(|url| url.to_string())
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", raw, e)))
    }

    async fn request(&self, method: Method, url: &str) -> HttpRequest {
        let mut request = HttpRequest::new(method, url);
        for (name, value) in &self.headers {
            request = request.header(name.clone(), value.clone());
        }
        if let Some((name, value)) = self.credentials.read().await.header() {
            request = request.header(name, value);
        }
        request
    }
}

fn classify_write(endpoint: &str, response: HttpResponse) -> Result<Value> {
    match response.status {
        401 | 403 => Err(ApiError::Authentication(response.body)),
        404 => Err(ApiError::NotFound(endpoint.to_string())),
        429 => Err(ApiError::RateLimited),
        status if !(200..300).contains(&status) => Err(ApiError::Api(format!(
            "request failed with status {}: {}",
            status, response.body
        ))),
        _ if response.body.trim().is_empty() => Ok(Value::Null),
        _ => serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Api(format!("invalid response body: {}", e))),
    }
}

/// Builder for configuring a [`RequestHandler`].
#[derive(Debug)]
pub struct RequestHandlerBuilder {
    base_url: String,
    headers: Vec<(String, String)>,
    credentials: Credentials,
    rate_limiter: RateLimiter,
    cache_ttl: Duration,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl RequestHandlerBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            // Trim trailing slash once so every URL joins cleanly.
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            credentials: Credentials::None,
            rate_limiter: RateLimiter::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            transport: None,
        }
    }

    /// Add a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Allow `max_requests` per trailing `time_window`.
    pub fn rate_limit(mut self, max_requests: usize, time_window: Duration) -> Self {
        self.rate_limiter = RateLimiter::new(max_requests, time_window);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base of the exponential backoff; the nth retry waits `base * 2^(n-1)`.
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> RequestHandler {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));

        RequestHandler {
            transport,
            base_url: self.base_url,
            headers: self.headers,
            credentials: Arc::new(RwLock::new(self.credentials)),
            rate_limiter: self.rate_limiter,
            cache: CacheManager::new(self.cache_ttl),
            timeout: self.timeout,
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
        }
    }
}
