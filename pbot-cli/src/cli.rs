//! CLI parser, config loading and backend resolution.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pbot::{BotConfig, BotEvent, Puppet, PuppetOptions, PuppetResolver};
use puppet_mock::MockPuppet;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pbot")]
#[command(about = "Chat bot CLI: run a bot, read its timeline", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a bot until Ctrl-C, logging every event (config from env; name can override PBOT_NAME).
    Run {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Print one page of the bot's timeline.
    Timeline {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long)]
        page_token: Option<String>,
    },
}

/// Load BotConfig from environment. If `name` is provided it overrides PBOT_NAME.
pub fn load_config(name: Option<String>) -> Result<BotConfig> {
    Ok(BotConfig::load(name)?)
}

/// Backends this binary can start.
pub fn resolver() -> PuppetResolver {
    PuppetResolver::new().register("mock", |_options: &PuppetOptions| {
        Ok(Arc::new(MockPuppet::demo()) as Arc<dyn Puppet>)
    })
}

/// One-line summary of a bot event for the console.
pub fn describe(event: &BotEvent) -> String {
    match event {
        BotEvent::Message(message) => format!(
            "message {} from {}: {}",
            message.id(),
            message
                .talker()
                .ok()
                .and_then(|c| c.name().ok())
                .unwrap_or_else(|| "?".to_string()),
            message.text().unwrap_or_default()
        ),
        BotEvent::Login(contact) => format!("login as {}", contact.id()),
        BotEvent::Logout { contact, reason } => format!(
            "logout {} ({})",
            contact.id(),
            reason.as_deref().unwrap_or("no reason")
        ),
        BotEvent::Error(e) => format!("error: {}", e),
        BotEvent::Scan { qrcode, status, .. } => format!(
            "scan status {} {}",
            status.code(),
            qrcode.as_deref().unwrap_or("")
        ),
        BotEvent::RoomTopic {
            room,
            new_topic,
            old_topic,
            ..
        } => format!("room {} topic '{}' -> '{}'", room.id(), old_topic, new_topic),
        other => other.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_timeline_args() {
        let cli = Cli::parse_from(["pbot", "timeline", "--page-size", "5", "--page-token", "10"]);
        match cli.command {
            Commands::Timeline {
                name,
                page_size,
                page_token,
            } => {
                assert!(name.is_none());
                assert_eq!(page_size, Some(5));
                assert_eq!(page_token.as_deref(), Some("10"));
            }
            _ => panic!("expected timeline"),
        }
    }

    #[test]
    fn test_resolver_knows_mock() {
        assert_eq!(resolver().names(), vec!["mock"]);
    }

    #[test]
    fn test_describe_simple_events() {
        assert_eq!(describe(&BotEvent::Ready), "ready");
        assert_eq!(
            describe(&BotEvent::Error(pbot::BotError::NotBound)),
            "error: No puppet bound to this bot yet"
        );
    }
}
