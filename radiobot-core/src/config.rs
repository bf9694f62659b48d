use std::{env, fmt::Display, num::NonZeroUsize, str::FromStr, time::Duration};

use thiserror::Error;

use crate::{ChannelId, PlaylistId, Provider};

/// Looks up a configuration variable by name.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} was not specified")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// The maximum number of tracks the maintained playlist should hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity(NonZeroUsize);

impl Capacity {
    /// Used when no capacity is configured
    pub const DEFAULT: usize = 100;

    /// Returns `None` for zero.
    pub fn new(value: usize) -> Option<Self> {
        NonZeroUsize::new(value).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self::new(Self::DEFAULT).expect("default capacity is positive")
    }
}

impl Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Capacity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: usize = s.trim().parse().map_err(|_| format!("{s:?} is not a number"))?;
        Self::new(value).ok_or_else(|| "capacity must be greater than zero".to_string())
    }
}

/// The configuration of the bridge, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub struct Config {
    /// The only channel messages are accepted from
    pub channel_id: ChannelId,
    /// The playlist tracks are mirrored into
    pub playlist_id: PlaylistId,
    /// How many tracks the playlist may hold before the oldest is evicted
    pub capacity: Capacity,
    /// Which links and URIs are understood
    pub provider: Provider,
    /// Upper bound on each page read and each mutation of the playlist
    pub remote_timeout: Duration,
}

impl Config {
    pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 8;

    pub fn new(channel_id: ChannelId, playlist_id: PlaylistId) -> Self {
        Self {
            channel_id,
            playlist_id,
            capacity: Capacity::default(),
            provider: Provider::default(),
            remote_timeout: Duration::from_secs(Self::DEFAULT_REMOTE_TIMEOUT_SECS),
        }
    }

    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self, ConfigError> {
        let channel_id = ChannelId::new(required(lookup, "DISCORD_CHANNEL_ID")?);
        let playlist_id = PlaylistId::new(required(lookup, "SPOTIFY_PLAYLIST_ID")?);

        let capacity = parsed_or(lookup, "SPOTIFY_PLAYLIST_CAP", Capacity::default())?;
        let timeout_secs = parsed_or(
            lookup,
            "RADIOBOT_REMOTE_TIMEOUT_SECS",
            Self::DEFAULT_REMOTE_TIMEOUT_SECS,
        )?;

        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "RADIOBOT_REMOTE_TIMEOUT_SECS",
                reason: "timeout must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            channel_id,
            playlist_id,
            capacity,
            provider: Provider::default(),
            remote_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Reads a variable from the process environment, treating blank values as unset.
pub fn process_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Returns the variable, or an error if it's not set.
pub fn required(lookup: Lookup, name: &'static str) -> Result<String, ConfigError> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Parses the variable if it's set, otherwise returns the default.
pub fn parsed_or<T>(lookup: Lookup, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name).filter(|v| !v.trim().is_empty()) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
