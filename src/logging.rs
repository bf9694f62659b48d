use std::fmt::Display;

use colored::Colorize;
use log::{error, info, warn, Level};
use radiobot_core::{Action, BridgeEvent};

/// External crates only need to log warnings and errors
const ALLOWED_EXTERNAL_LEVELS: [Level; 2] = [Level::Warn, Level::Error];
const ALLOWED_LEVELS: [Level; 3] = [Level::Info, Level::Warn, Level::Error];

pub fn init_logger() {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let target = Target::from_str(record.target());
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                level_to_string(&record.level()),
                now.format("%H:%M:%S").to_string().bright_black(),
                target,
                message
            ))
        })
        .filter(|meta| {
            let target = Target::from_str(meta.target());

            let is_allowed = ALLOWED_LEVELS.contains(&meta.level());
            let is_severe = ALLOWED_EXTERNAL_LEVELS.contains(&meta.level());

            target.is_local() && is_allowed || is_severe
        })
        .chain(std::io::stdout())
        .apply()
        .expect("logging is initialized")
}

/// Logs a bridge event as it is received
pub fn log_event(event: &BridgeEvent) {
    match event {
        BridgeEvent::LinkDetected { channel_id, track } => {
            info!("Track link detected in {}: {}", channel_id, track)
        }
        BridgeEvent::Reconciled { action, .. } => match action {
            Action::Skip { track, .. } => info!("{} is already in the playlist", track),
            Action::Append { appended } => info!("{} added to the playlist", appended),
            Action::EvictOldestThenAppend { evicted, appended } => info!(
                "{} added to the playlist, replacing {}",
                appended,
                evicted.label()
            ),
        },
        BridgeEvent::ReconcileFailed { track, error, .. } => {
            error!("Could not mirror {}: {}", track, error);

            if let radiobot_core::ReconcileError::RemoteMutationFailed {
                evicted: Some(evicted),
                ..
            } = error
            {
                warn!(
                    "{} was already removed, the playlist is one track short",
                    evicted.label()
                );
            }
        }
    }
}

enum Target {
    External(String),
    Bot,
    Core,
    Spotify,
    Discord,
}

impl Target {
    fn from_str(str: &str) -> Self {
        let module = str.split("::").next().unwrap_or_default();

        match module {
            "radiobot" => Self::Bot,
            "radiobot_core" => Self::Core,
            "radiobot_spotify" => Self::Spotify,
            "radiobot_discord" => Self::Discord,
            other => Target::External(other.to_string()),
        }
    }

    fn is_local(&self) -> bool {
        !matches!(self, Self::External(_))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Target::External(x) => x.as_str().clear(),
            Target::Bot => "BOT".bright_cyan(),
            Target::Core => "CORE".blue(),
            Target::Spotify => "SPOTIFY".bright_green(),
            Target::Discord => "DISCORD".bright_purple(),
        };

        Display::fmt(&result, f)
    }
}

fn level_to_string(level: &Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_targets() {
        assert!(Target::from_str("radiobot_core::dispatcher").is_local());
        assert!(Target::from_str("radiobot").is_local());
        assert!(!Target::from_str("serenity::gateway::shard").is_local());
        assert!(!Target::from_str("radiobot_corex").is_local());
    }
}
