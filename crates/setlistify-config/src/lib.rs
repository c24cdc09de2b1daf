// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetlistFmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub max_requests: usize,
    pub time_window_ms: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for SetlistFmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            cache_ttl_secs: 300,
            max_requests: 2,
            time_window_ms: 1000,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub base_url: Option<String>,
    pub accounts_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub max_requests: usize,
    pub time_window_ms: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: None,
            accounts_url: None,
            cache_ttl_secs: 300,
            max_requests: 2,
            time_window_ms: 1000,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub setlistfm: SetlistFmConfig,
    pub spotify: SpotifyConfig,
    pub telemetry: TelemetryConfig,
}

fn figment(config_path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment.merge(Env::prefixed("SETLISTIFY_").split("__"))
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: SETLISTIFY_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let config: AppConfig = figment(config_path).extract()?;
    info!(
        target: "config",
        setlistfm_key = config.setlistfm.api_key.is_some(),
        spotify_credentials = config.spotify.client_id.is_some(),
        "configuration loaded"
    );
    Ok(config)
}
