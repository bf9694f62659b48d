use std::fmt::Debug;

use radiobot_core::{parsed_or, process_env, required, ConfigError, Lookup};

/// How to connect to Discord
#[derive(Clone)]
pub struct DiscordConfig {
    pub token: String,
    /// Whether outcomes are replied in the watched channel
    pub announce: bool,
}

impl DiscordConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self, ConfigError> {
        Ok(Self {
            token: required(lookup, "DISCORD_BOT_TOKEN")?,
            announce: parsed_or(lookup, "DISCORD_ANNOUNCE", false)?,
        })
    }
}

impl Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("announce", &self.announce)
            .finish()
    }
}
