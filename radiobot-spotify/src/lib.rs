//! The Spotify side of radiobot: a [PlaylistService](radiobot_core::PlaylistService)
//! backed by the Spotify Web API.

mod client;
mod config;

pub use client::*;
pub use config::*;

use thiserror::Error;

const API_BASE: &str = "https://api.spotify.com/v1";

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("{0} can't be used as an API base url")]
    InvalidBase(String),

    #[error("Could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
