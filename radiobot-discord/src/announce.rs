use std::sync::Arc;

use log::warn;
use radiobot_core::{Action, BridgeEvent, Mutation, ReconcileError};
use serenity::http::Http;

use crate::{discord_channel, DiscordConfig};

/// Replies in the originating channel with the outcome of each reconciliation.
pub struct Announcer {
    http: Arc<Http>,
}

impl Announcer {
    pub fn new(config: &DiscordConfig) -> Self {
        Self {
            http: Arc::new(Http::new(&config.token)),
        }
    }

    pub async fn announce(&self, event: &BridgeEvent) {
        let text = announcement(event);

        let channel = match discord_channel(event.channel_id()) {
            Ok(channel) => channel,
            Err(e) => {
                warn!("Not announcing: {}", e);
                return;
            }
        };

        if let Err(e) = channel.say(&*self.http, text).await {
            warn!("Failed to announce in channel {}: {}", channel, e);
        }
    }
}

/// Returns the message to post for an event.
pub fn announcement(event: &BridgeEvent) -> String {
    match event {
        BridgeEvent::LinkDetected { .. } => {
            "Spotify link detected! Checking playlist...".to_string()
        }
        BridgeEvent::Reconciled { action, .. } => match action {
            Action::Skip { .. } => "Track is already in the playlist.".to_string(),
            Action::Append { .. } => "Track successfully added to the playlist!".to_string(),
            Action::EvictOldestThenAppend { evicted, .. } => format!(
                "Removed the oldest track: {}. Track successfully added to the playlist!",
                evicted.label()
            ),
        },
        BridgeEvent::ReconcileFailed { error, .. } => match error {
            ReconcileError::RemoteUnavailable(cause) => {
                format!("Unable to retrieve playlist tracks: {}", cause)
            }
            ReconcileError::RemoteMutationFailed {
                operation: Mutation::Remove,
                cause,
                ..
            } => format!("Error removing the oldest track: {}", cause),
            ReconcileError::RemoteMutationFailed {
                operation: Mutation::Append,
                cause,
                evicted: Some(evicted),
            } => format!(
                "Removed the oldest track: {}, but adding the new one failed: {}",
                evicted.label(),
                cause
            ),
            ReconcileError::RemoteMutationFailed {
                operation: Mutation::Append,
                cause,
                evicted: None,
            } => format!("Error adding track: {}", cause),
        },
    }
}
