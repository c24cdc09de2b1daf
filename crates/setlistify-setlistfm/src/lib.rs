// SPDX-License-Identifier: GPL-3.0-or-later

//! setlist.fm API client.
//!
//! Artist search, setlist listing and setlist detail lookups, with the
//! request pacing, caching and retry behaviour of [`setlistify_http`].
//! Responses are normalized by the [`parser`] module into domain records.

pub mod client;
#[cfg(test)]
mod client_tests;
pub mod parser;

pub use client::{SetlistFmClient, SetlistFmClientBuilder};
pub use setlistify_http::{ApiError, Result};
