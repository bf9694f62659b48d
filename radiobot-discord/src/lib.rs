//! The Discord part of radiobot is implemented in this crate.

mod announce;
mod bot;
mod config;

pub use announce::*;
pub use bot::*;
pub use config::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("Discord client error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("{0:?} is not a Discord channel id")]
    InvalidChannel(String),
}
