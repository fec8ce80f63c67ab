//! Backend resolution by name.

use pbot_core::Puppet;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::config::BotConfig;
use crate::error::{BotError, Result};

/// Options handed to a backend factory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PuppetOptions {
    pub name: String,
    pub token: Option<String>,
}

impl From<&BotConfig> for PuppetOptions {
    fn from(config: &BotConfig) -> Self {
        Self {
            name: config.puppet.clone(),
            token: config.puppet_token.clone(),
        }
    }
}

pub type PuppetFactory = Arc<dyn Fn(&PuppetOptions) -> Result<Arc<dyn Puppet>> + Send + Sync>;

/// Maps backend names to factories.
#[derive(Clone, Default)]
pub struct PuppetResolver {
    factories: BTreeMap<String, PuppetFactory>,
}

impl PuppetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&PuppetOptions) -> Result<Arc<dyn Puppet>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Builds the backend named by `options.name`.
    pub fn resolve(&self, options: &PuppetOptions) -> Result<Arc<dyn Puppet>> {
        let factory = self.factories.get(&options.name).ok_or_else(|| {
            BotError::Config(format!(
                "unknown puppet '{}' (known: [{}])",
                options.name,
                self.names().join(", ")
            ))
        })?;
        info!(puppet = %options.name, "step: resolving puppet");
        factory(options)
    }
}

impl fmt::Debug for PuppetResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PuppetResolver")
            .field("names", &self.names())
            .finish()
    }
}
