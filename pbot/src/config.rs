use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{BotError, Result};

/// Bot configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Instance name used in logs.
    pub name: String,
    /// Backend name resolved by [`crate::PuppetResolver`] at start.
    pub puppet: String,
    pub puppet_token: Option<String>,
    pub log_file: String,
    /// Default page size for timeline and comment listings.
    pub page_size: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "pbot".to_string(),
            puppet: "mock".to_string(),
            puppet_token: None,
            log_file: "logs/pbot.log".to_string(),
            page_size: 10,
        }
    }
}

impl BotConfig {
    /// Loads the configuration from the environment.
    /// A `name` passed in wins over `PBOT_NAME`.
    pub fn load(name: Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let name = name
            .or_else(|| env::var("PBOT_NAME").ok())
            .unwrap_or(defaults.name);
        let puppet = env::var("PBOT_PUPPET").unwrap_or(defaults.puppet);
        let puppet_token = env::var("PBOT_PUPPET_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        let log_file = env::var("LOG_FILE").unwrap_or(defaults.log_file);
        let page_size = match env::var("PBOT_PAGE_SIZE") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                BotError::Config(format!("PBOT_PAGE_SIZE must be a positive integer, got '{}'", raw))
            })?,
            Err(_) => defaults.page_size,
        };

        let config = Self {
            name,
            puppet,
            puppet_token,
            log_file,
            page_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BotError::Config("bot name must not be empty".to_string()));
        }
        if self.puppet.trim().is_empty() {
            return Err(BotError::Config("puppet name must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(BotError::Config("page size must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "PBOT_NAME",
            "PBOT_PUPPET",
            "PBOT_PUPPET_TOKEN",
            "LOG_FILE",
            "PBOT_PAGE_SIZE",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_load_config_with_defaults() {
        clear_env();

        let config = BotConfig::load(None).unwrap();

        assert_eq!(config, BotConfig::default());
        assert_eq!(config.name, "pbot");
        assert_eq!(config.puppet, "mock");
        assert!(config.puppet_token.is_none());
        assert_eq!(config.log_file, "logs/pbot.log");
        assert_eq!(config.page_size, 10);
    }

    #[test]
    #[serial]
    fn test_load_config_with_custom_values() {
        clear_env();
        env::set_var("PBOT_NAME", "env-bot");
        env::set_var("PBOT_PUPPET", "custom");
        env::set_var("PBOT_PUPPET_TOKEN", "secret");
        env::set_var("LOG_FILE", "/tmp/pbot-test.log");
        env::set_var("PBOT_PAGE_SIZE", "25");

        let config = BotConfig::load(None).unwrap();
        assert_eq!(config.name, "env-bot");
        assert_eq!(config.puppet, "custom");
        assert_eq!(config.puppet_token.as_deref(), Some("secret"));
        assert_eq!(config.log_file, "/tmp/pbot-test.log");
        assert_eq!(config.page_size, 25);

        let config = BotConfig::load(Some("cli-bot".to_string())).unwrap();
        assert_eq!(config.name, "cli-bot");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_bad_page_size() {
        clear_env();
        env::set_var("PBOT_PAGE_SIZE", "many");
        assert!(matches!(BotConfig::load(None), Err(BotError::Config(_))));

        env::set_var("PBOT_PAGE_SIZE", "0");
        assert!(matches!(BotConfig::load(None), Err(BotError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: BotConfig = serde_json::from_str(r#"{"name":"from-file"}"#).unwrap();
        assert_eq!(config.name, "from-file");
        assert_eq!(config.puppet, "mock");
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        let config = BotConfig {
            name: " ".to_string(),
            ..BotConfig::default()
        };
        assert!(config.validate().is_err());

        let config = BotConfig {
            puppet: String::new(),
            ..BotConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
