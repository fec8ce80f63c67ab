//! # pbot-cli
//!
//! CLI foundation: argument parsing, config loading, the backend resolver.

pub mod cli;

pub use cli::{describe, load_config, resolver, Cli, Commands};
pub use pbot::BotConfig;
