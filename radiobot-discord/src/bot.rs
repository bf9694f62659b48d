use log::{debug, info};
use radiobot_core::{ChannelId, ChatMessage, Dispatch, Dispatcher};
use serenity::{
    async_trait,
    model::{channel::Message, gateway::Ready, id::ChannelId as DiscordChannelId},
    prelude::{Client, Context, EventHandler, GatewayIntents},
};

use crate::{DiscordConfig, DiscordError};

/// Forwards messages from the Discord gateway to the dispatcher.
pub struct Bot {
    dispatcher: Dispatcher,
}

impl Bot {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Connects to Discord and handles messages until the connection is closed.
    pub async fn run(self, config: &DiscordConfig) -> Result<(), DiscordError> {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let mut client = Client::builder(&config.token, intents)
            .event_handler(self)
            .await?;

        client.start().await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Bot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Bot connected to Discord as {}", ready.user.name);
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let message = ChatMessage {
            channel_id: ChannelId::new(msg.channel_id.get().to_string()),
            content: msg.content,
            author_is_bot: msg.author.bot,
        };

        match self.dispatcher.dispatch(&message) {
            Dispatch::Queued(track) => debug!("Queued {} from message {}", track, msg.id),
            Dispatch::NoLink => debug!("Message {} has no track link", msg.id),
            Dispatch::Ignored | Dispatch::Dropped(_) => {}
        }
    }
}

/// Checks that a channel id is a valid Discord snowflake.
pub fn discord_channel(channel_id: &ChannelId) -> Result<DiscordChannelId, DiscordError> {
    channel_id
        .as_str()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(DiscordChannelId::new)
        .ok_or_else(|| DiscordError::InvalidChannel(channel_id.to_string()))
}
