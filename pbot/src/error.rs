//! Framework error type.
//!
//! Backend and background failures are turned into `error` events by the bot; errors returned
//! from direct calls (lookups, hydration, post validation) reach the caller.

use pbot_core::PuppetError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    /// Missing or invalid setup, e.g. no backend to start with.
    #[error("Config error: {0}")]
    Config(String),

    /// Fetching an entity payload from the backend failed.
    #[error("Failed to hydrate {kind} {id}: {reason}")]
    Hydration {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("Puppet error: {0}")]
    Puppet(#[from] PuppetError),

    /// Malformed request, e.g. a post without content.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An attribute was read before the entity reached Ready.
    #[error("{kind} {id} is not ready")]
    NotReady { kind: &'static str, id: String },

    #[error("Invalid {kind} id: must be non-empty")]
    InvalidId { kind: &'static str },

    /// The entity was used before a backend was bound to its bot.
    #[error("No puppet bound to this bot yet")]
    NotBound,

    /// The entity outlived the bot that created it.
    #[error("Bot instance has been dropped")]
    InstanceDropped,
}

impl BotError {
    pub fn hydration(kind: &'static str, id: impl Into<String>, source: PuppetError) -> Self {
        Self::Hydration {
            kind,
            id: id.into(),
            reason: source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
