use crossbeam::channel::{Receiver, Sender};

use crate::{Action, ChannelId, ReconcileError, TrackRef};

pub type EventSender = Sender<BridgeEvent>;
pub type EventReceiver = Receiver<BridgeEvent>;

/// Describes the events emitted by the bridge.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// A track link was found in a watched channel and queued for reconciliation.
    LinkDetected {
        channel_id: ChannelId,
        track: TrackRef,
    },
    /// A track was reconciled against the playlist.
    Reconciled {
        /// The channel the link was posted in.
        channel_id: ChannelId,
        action: Action,
    },
    /// Reconciling a track failed. The candidate is not retried.
    ReconcileFailed {
        /// The channel the link was posted in.
        channel_id: ChannelId,
        track: TrackRef,
        error: ReconcileError,
    },
}

impl BridgeEvent {
    /// The channel this event originated from.
    pub fn channel_id(&self) -> &ChannelId {
        match self {
            Self::LinkDetected { channel_id, .. } => channel_id,
            Self::Reconciled { channel_id, .. } => channel_id,
            Self::ReconcileFailed { channel_id, .. } => channel_id,
        }
    }
}
