use std::{fmt::Display, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::timeout;

pub type ArcedPlaylistService = Arc<dyn PlaylistService>;

/// The remote identifier of a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaylistId(String);

impl PlaylistId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PlaylistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A track as reported by the remote playlist, in whatever form the service stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub uri: String,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Index of the item in the playlist, counting items that aren't tracks
    pub position: usize,
}

impl RemoteTrack {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            id: None,
            name: None,
            position: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }
}

/// One page of a playlist's items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistPage {
    /// The version of the playlist the page was read from, if the service versions playlists
    pub snapshot_id: Option<String>,
    pub tracks: Vec<RemoteTrack>,
    /// Offset of the following page, if there is one
    pub next: Option<usize>,
}

/// A single playlist entry to remove.
///
/// The position pins the removal to one entry, so other copies of the same track stay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub uri: String,
    pub position: usize,
    /// The version of the playlist the position was read from
    pub snapshot_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaylistError {
    #[error("Credentials were rejected by the service")]
    Unauthorized,

    #[error("Playlist was not found")]
    NotFound,

    #[error("Rate limited by the service")]
    RateLimited {
        /// How long the service asked us to wait, if it said so
        retry_after: Option<Duration>,
    },

    #[error("Request timed out")]
    Timeout,

    #[error("Failed to reach the service: {0}")]
    Transport(String),

    #[error("Service responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),
}

/// Represents a remote service holding the maintained playlist.
///
/// Implementors own authentication entirely; callers only ever pass playlist ids and URIs.
#[async_trait]
pub trait PlaylistService: Send + Sync {
    /// Returns the page of tracks starting at the given item offset, in the order the
    /// service lists them.
    async fn playlist_page(
        &self,
        playlist: &PlaylistId,
        offset: usize,
    ) -> Result<PlaylistPage, PlaylistError>;

    /// Removes exactly the entry described by the removal.
    async fn remove_track(
        &self,
        playlist: &PlaylistId,
        removal: &Removal,
    ) -> Result<(), PlaylistError>;

    /// Appends the track with the given URI to the end of the playlist.
    async fn append_track(&self, playlist: &PlaylistId, uri: &str) -> Result<(), PlaylistError>;
}

/// Fails with a timeout instead of waiting on the service indefinitely.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, PlaylistError>
where
    F: Future<Output = Result<T, PlaylistError>>,
{
    timeout(limit, fut)
        .await
        .unwrap_or(Err(PlaylistError::Timeout))
}
