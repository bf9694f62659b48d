use std::{fmt::Debug, time::Duration};

use radiobot_core::{parsed_or, process_env, required, ConfigError, Lookup};
use url::Url;

use crate::API_BASE;

/// How to reach and authenticate with the Spotify Web API
#[derive(Clone)]
pub struct SpotifyConfig {
    /// A bearer token allowed to modify the playlist
    pub access_token: String,
    pub api_base: Url,
    /// Timeout of a single HTTP request
    pub request_timeout: Duration,
}

impl SpotifyConfig {
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_base: Url::parse(API_BASE).expect("API_BASE is a valid url"),
            request_timeout: Duration::from_secs(Self::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self, ConfigError> {
        let access_token = required(lookup, "SPOTIFY_ACCESS_TOKEN")?;

        let mut config = Self::new(access_token);
        config.api_base = parsed_or(lookup, "SPOTIFY_API_BASE", config.api_base)?;

        let timeout_secs = parsed_or(
            lookup,
            "SPOTIFY_REQUEST_TIMEOUT_SECS",
            Self::DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "SPOTIFY_REQUEST_TIMEOUT_SECS",
                reason: "timeout must be greater than zero".to_string(),
            });
        }

        config.request_timeout = Duration::from_secs(timeout_secs);
        Ok(config)
    }
}

// The token must never end up in logs
impl Debug for SpotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("access_token", &"<redacted>")
            .field("api_base", &self.api_base.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
