use std::{fmt::Display, thread};

use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};
use tokio::runtime::Handle;

use crate::{
    ArcedPlaylistService, BridgeEvent, Config, EventSender, LinkExtractor, Maintainer, TrackRef,
};

/// An opaque chat channel identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message delivered by the chat session.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub channel_id: ChannelId,
    pub content: String,
    /// True if the author is a bot, including this one
    pub author_is_bot: bool,
}

/// What the dispatcher did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The message was not from the watched channel, or was written by a bot.
    Ignored,
    /// The message contained no track link.
    NoLink,
    /// The linked track was queued for reconciliation.
    Queued(TrackRef),
    /// The linked track was dropped, since the reconcile worker is gone.
    Dropped(TrackRef),
}

struct Candidate {
    channel_id: ChannelId,
    track: TrackRef,
}

/// Routes chat messages into the playlist.
///
/// Every queued candidate is reconciled by a single worker thread, one at a time and in
/// arrival order. The worker stops once every clone of the dispatcher is dropped.
#[derive(Clone)]
pub struct Dispatcher {
    filter: ChannelId,
    extractor: LinkExtractor,
    sender: Sender<Candidate>,
    events: EventSender,
}

impl Dispatcher {
    /// Creates a dispatcher and spawns its worker, which drives reconciliation on the given runtime.
    pub fn new(
        config: &Config,
        service: ArcedPlaylistService,
        handle: Handle,
        events: EventSender,
    ) -> Self {
        let (sender, receiver) = unbounded();
        let maintainer = Maintainer::new(config, service);

        spawn_reconcile_worker(maintainer, handle, receiver, events.clone());

        Self {
            filter: config.channel_id.clone(),
            extractor: LinkExtractor::new(&config.provider),
            sender,
            events,
        }
    }

    /// Inspects a message and queues its track link, if it has one.
    pub fn dispatch(&self, message: &ChatMessage) -> Dispatch {
        if message.author_is_bot || message.channel_id != self.filter {
            return Dispatch::Ignored;
        }

        let Some(track) = self.extractor.detect(&message.content) else {
            return Dispatch::NoLink;
        };

        self.emit(BridgeEvent::LinkDetected {
            channel_id: message.channel_id.clone(),
            track: track.clone(),
        });

        let candidate = Candidate {
            channel_id: message.channel_id.clone(),
            track: track.clone(),
        };

        // Only fails if the worker panicked
        if self.sender.send(candidate).is_err() {
            error!("Reconcile worker is gone, dropping {}", track);
            return Dispatch::Dropped(track);
        }

        Dispatch::Queued(track)
    }

    fn emit(&self, event: BridgeEvent) {
        if self.events.send(event).is_err() {
            debug!("No one is listening to bridge events");
        }
    }
}

fn spawn_reconcile_worker(
    maintainer: Maintainer,
    handle: Handle,
    receiver: Receiver<Candidate>,
    events: EventSender,
) {
    let run = move || {
        info!(
            "Reconcile worker started with a playlist cap of {}",
            maintainer.capacity()
        );

        while let Ok(Candidate { channel_id, track }) = receiver.recv() {
            let result = handle.block_on(maintainer.reconcile(&track));

            let event = match result {
                Ok(action) => BridgeEvent::Reconciled { channel_id, action },
                Err(error) => BridgeEvent::ReconcileFailed {
                    channel_id,
                    track,
                    error,
                },
            };

            if events.send(event).is_err() {
                debug!("No one is listening to bridge events");
            }
        }

        info!("Reconcile worker stopped");
    };

    thread::Builder::new()
        .name("reconcile-worker".to_string())
        .spawn(run)
        .expect("reconcile-worker thread is spawned");
}
