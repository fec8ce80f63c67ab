//! # pbot
//!
//! Chat-automation framework over a pluggable backend ([`Puppet`]).
//!
//! A [`Bot`] owns one backend, one identity map per entity kind, a lifecycle state machine and
//! the plugins installed on it. Backend events are bridged into hydrated [`BotEvent`]s; entities
//! are obtained through the bot's factories and hydrated lazily.
//!
//! ```ignore
//! let bot = Bot::builder().name("demo").puppet(puppet).build()?;
//! bot.on(|event| tracing::info!(event = event.name(), "event"));
//! bot.start().await;
//! bot.ready().await;
//! ```

mod bot;
mod bridge;
pub mod config;
mod context;
pub mod entity;
pub mod error;
pub mod events;
pub mod moment;
pub mod plugin;
pub mod resolver;
pub mod state;

pub use bot::{Bot, BotBuilder};
pub use config::BotConfig;
pub use entity::{
    Contact, Entity, EntityFactory, EntityKind, Friendship, HydrationState, Message, Post, Room,
    RoomInvitation,
};
pub use error::{BotError, Result};
pub use events::{BotEvent, ContactEvent, RoomEvent};
pub use moment::{PostBuilder, PostDraft, PostPage, MAX_PAGE_SIZE};
pub use plugin::{plugin_fn, Plugin, PluginRegistry, Uninstaller};
pub use resolver::{PuppetFactory, PuppetOptions, PuppetResolver};
pub use state::SwitchState;

pub use pbot_core::{
    init_tracing, ContactPayload, FileBox, MessagePayload, MomentPayload, PaginationRequest,
    PostPayload, PostQuery, Puppet, PuppetError, PuppetEvent, RoomPayload, Sayable, ScanStatus,
    UrlLinkPayload,
};
