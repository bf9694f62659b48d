use std::{fmt::Display, time::Duration};

use log::info;
use thiserror::Error;

use crate::{
    bounded, fetch_snapshot, ArcedPlaylistService, Capacity, Config, PlaylistEntry,
    PlaylistError, PlaylistId, PlaylistSnapshot, Provider, TrackRef,
};

/// Why a candidate was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyPresent,
}

/// The outcome of reconciling one candidate against the playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing was changed.
    Skip { track: TrackRef, reason: SkipReason },
    /// The playlist was full, so its oldest entry made room for the candidate.
    EvictOldestThenAppend {
        evicted: PlaylistEntry,
        appended: TrackRef,
    },
    /// The candidate was appended to a playlist with room to spare.
    Append { appended: TrackRef },
}

/// A remote mutation issued while applying an [Action].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Remove,
    Append,
}

impl Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mutation::Remove => write!(f, "remove"),
            Mutation::Append => write!(f, "append"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The playlist could not be read, nothing was changed.
    #[error("Unable to retrieve playlist tracks: {0}")]
    RemoteUnavailable(PlaylistError),

    /// A mutation failed after the playlist was read.
    #[error("Failed to {operation} track: {cause}")]
    RemoteMutationFailed {
        operation: Mutation,
        cause: PlaylistError,
        /// The entry that was already evicted, if the append failed afterwards
        evicted: Option<PlaylistEntry>,
    },
}

/// Decides what to do with a candidate, given the current contents of the playlist.
///
/// Every combination of inputs yields exactly one action. At most one entry is ever
/// evicted, even if the playlist is already above capacity.
pub fn decide(snapshot: &PlaylistSnapshot, candidate: &TrackRef, capacity: Capacity) -> Action {
    if snapshot.contains(candidate) {
        return Action::Skip {
            track: candidate.clone(),
            reason: SkipReason::AlreadyPresent,
        };
    }

    match snapshot.oldest() {
        Some(oldest) if snapshot.len() >= capacity.get() => Action::EvictOldestThenAppend {
            evicted: oldest.clone(),
            appended: candidate.clone(),
        },
        _ => Action::Append {
            appended: candidate.clone(),
        },
    }
}

/// Keeps the remote playlist within its capacity as candidates arrive.
///
/// Calls to [Maintainer::reconcile] must not overlap for the same playlist,
/// the dispatcher guarantees this by running them on a single worker.
pub struct Maintainer {
    service: ArcedPlaylistService,
    playlist: PlaylistId,
    provider: Provider,
    capacity: Capacity,
    remote_timeout: Duration,
}

impl Maintainer {
    pub fn new(config: &Config, service: ArcedPlaylistService) -> Self {
        Self {
            service,
            playlist: config.playlist_id.clone(),
            provider: config.provider.clone(),
            capacity: config.capacity,
            remote_timeout: config.remote_timeout,
        }
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Reads the current contents of the playlist. Every page is bounded by the remote timeout.
    pub async fn snapshot(&self) -> Result<PlaylistSnapshot, ReconcileError> {
        fetch_snapshot(
            self.service.as_ref(),
            &self.playlist,
            &self.provider,
            self.remote_timeout,
        )
        .await
        .map_err(ReconcileError::RemoteUnavailable)
    }

    /// Reads the playlist, decides what to do with the candidate, and applies it.
    pub async fn reconcile(&self, candidate: &TrackRef) -> Result<Action, ReconcileError> {
        let snapshot = self.snapshot().await?;
        let action = decide(&snapshot, candidate, self.capacity);

        self.apply(&snapshot, &action).await?;

        Ok(action)
    }

    /// Issues the remote mutations of an action, removal first.
    async fn apply(
        &self,
        snapshot: &PlaylistSnapshot,
        action: &Action,
    ) -> Result<(), ReconcileError> {
        match action {
            Action::Skip { .. } => Ok(()),
            Action::Append { appended } => self.append(appended, None).await,
            Action::EvictOldestThenAppend { evicted, appended } => {
                info!(
                    "Playlist cap of {} reached, removing oldest track {}",
                    self.capacity,
                    evicted.label()
                );

                let removal = snapshot.removal(evicted);

                bounded(
                    self.remote_timeout,
                    self.service.remove_track(&self.playlist, &removal),
                )
                .await
                .map_err(|cause| ReconcileError::RemoteMutationFailed {
                    operation: Mutation::Remove,
                    cause,
                    evicted: None,
                })?;

                self.append(appended, Some(evicted)).await
            }
        }
    }

    async fn append(
        &self,
        track: &TrackRef,
        evicted: Option<&PlaylistEntry>,
    ) -> Result<(), ReconcileError> {
        bounded(
            self.remote_timeout,
            self.service.append_track(&self.playlist, track.uri()),
        )
        .await
            .map_err(|cause| ReconcileError::RemoteMutationFailed {
                operation: Mutation::Append,
                cause,
                evicted: evicted.cloned(),
            })
    }
}
