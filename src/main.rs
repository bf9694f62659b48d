use std::{sync::Arc, thread};

use colored::Colorize;
use crossbeam::channel::unbounded;
use log::{error, info};
use radiobot_core::{Config, ConfigError, Dispatcher, EventReceiver};
use radiobot_discord::{discord_channel, Announcer, Bot, DiscordConfig, DiscordError};
use radiobot_spotify::{SpotifyClient, SpotifyConfig, SpotifyError};
use thiserror::Error;
use tokio::runtime::{self, Handle, Runtime};

mod logging;

/// Mirrors track links shared in a Discord channel into a capped Spotify playlist.
pub struct Radiobot {
    config: Config,
    spotify: SpotifyConfig,
    discord: DiscordConfig,
    runtime: Runtime,
}

#[derive(Debug, Error)]
enum BotError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not set up Spotify: {0}")]
    Spotify(#[from] SpotifyError),

    #[error("Discord failed: {0}")]
    Discord(#[from] DiscordError),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Radiobot {
    fn new() -> Result<Self, BotError> {
        info!("Reading configuration...");
        let config = Config::from_env()?;
        let spotify = SpotifyConfig::from_env()?;
        let discord = DiscordConfig::from_env()?;

        discord_channel(&config.channel_id)?;

        info!("Building async runtime...");
        let runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("radiobot-async")
            .build()
            .map_err(|e| BotError::Fatal(e.to_string()))?;

        Ok(Self {
            config,
            spotify,
            discord,
            runtime,
        })
    }

    fn run(self) -> Result<(), BotError> {
        info!("Playlist cap set to {} songs.", self.config.capacity);
        info!("Bot will monitor channel ID: {}", self.config.channel_id);

        let (event_sender, event_receiver) = unbounded();
        let service = Arc::new(SpotifyClient::new(&self.spotify)?);

        let dispatcher = Dispatcher::new(
            &self.config,
            service,
            self.runtime.handle().clone(),
            event_sender,
        );

        let announcer = self
            .discord
            .announce
            .then(|| Announcer::new(&self.discord));

        spawn_event_consumer(event_receiver, announcer, self.runtime.handle().clone());

        self.runtime
            .block_on(Bot::new(dispatcher).run(&self.discord))?;

        Ok(())
    }
}

/// Logs every bridge event, announcing outcomes in Discord if enabled.
fn spawn_event_consumer(receiver: EventReceiver, announcer: Option<Announcer>, handle: Handle) {
    let run = move || {
        while let Ok(event) = receiver.recv() {
            logging::log_event(&event);

            if let Some(announcer) = &announcer {
                handle.block_on(announcer.announce(&event));
            }
        }
    };

    thread::Builder::new()
        .name("bridge-events".to_string())
        .spawn(run)
        .expect("bridge-events thread is spawned");
}

impl BotError {
    fn hint(&self) -> String {
        match self {
            BotError::Config(_) => "Set the variable in the environment the bot runs in. DISCORD_BOT_TOKEN, DISCORD_CHANNEL_ID, SPOTIFY_PLAYLIST_ID, and SPOTIFY_ACCESS_TOKEN are required.".to_string(),
            BotError::Spotify(_) => "Check SPOTIFY_API_BASE, or leave it unset to use the public API.".to_string(),
            BotError::Discord(DiscordError::InvalidChannel(_)) => "DISCORD_CHANNEL_ID must be the numeric id of a channel, enable developer mode in Discord to copy it.".to_string(),
            BotError::Discord(_) => "Make sure DISCORD_BOT_TOKEN is valid and the Message Content intent is enabled for the bot.".to_string(),
            BotError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn main() {
    logging::init_logger();

    let result = Radiobot::new().and_then(|bot| {
        info!("Initialized successfully.");
        bot.run()
    });

    if let Err(error) = result {
        error!(
            "{} Read the error below to troubleshoot the issue.",
            "radiobot stopped!".bold().red()
        );
        error!("{}", error);
        error!(
            "{}",
            format!("Hint: {}", error.hint()).bright_black().italic()
        );

        std::process::exit(1);
    }
}
