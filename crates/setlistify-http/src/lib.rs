// SPDX-License-Identifier: GPL-3.0-or-later

//! Resilient access layer for rate-limited JSON APIs.
//!
//! A [`RequestHandler`] sends every call through a sliding-window
//! [`RateLimiter`] and a lazily-expiring [`CacheManager`], retrying transient
//! failures with exponential backoff. The network itself sits behind the
//! [`HttpTransport`] trait so the handler can be driven by any HTTP client.

pub mod cache;
pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod transport;

pub use cache::{cache_key, CacheManager};
pub use error::{ApiError, Result};
pub use handler::{backoff_delay, Credentials, RequestHandler, RequestHandlerBuilder, RequestOptions};
pub use rate_limiter::RateLimiter;
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, RequestBody, ReqwestTransport, TransportError,
};
