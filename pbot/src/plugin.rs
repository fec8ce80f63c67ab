//! Plugin registry.
//!
//! A plugin is installed against one [`Bot`] and may hand back an [`Uninstaller`]. A
//! [`PluginRegistry`] holds the "global" plugin list by convention: the hosting application
//! owns it and passes it to every [`crate::BotBuilder`], which installs the accumulated list
//! once, in registration order, when the bot is built.

use std::sync::{Arc, Mutex, RwLock};
use tracing::info;

use crate::bot::Bot;

/// Teardown returned by a plugin. Recorded by the bot; only run by
/// [`Bot::uninstall_plugins`].
pub type Uninstaller = Box<dyn FnOnce() + Send + Sync>;

/// Extension installed against a bot.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn install(&self, bot: &Bot) -> Option<Uninstaller>;
}

/// Plugin backed by a closure.
pub struct FnPlugin<F> {
    name: String,
    install: F,
}

impl<F> Plugin for FnPlugin<F>
where
    F: Fn(&Bot) -> Option<Uninstaller> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn install(&self, bot: &Bot) -> Option<Uninstaller> {
        (self.install)(bot)
    }
}

/// Wraps a closure as a named plugin.
pub fn plugin_fn<F>(name: impl Into<String>, install: F) -> Arc<dyn Plugin>
where
    F: Fn(&Bot) -> Option<Uninstaller> + Send + Sync + 'static,
{
    Arc::new(FnPlugin {
        name: name.into(),
        install,
    })
}

/// Shared, append-only plugin list. Clones share the same list.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: Arc<RwLock<Vec<Arc<dyn Plugin>>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plugin; bots built afterwards install it.
    pub fn register(&self, plugin: Arc<dyn Plugin>) -> &Self {
        info!(plugin = %plugin.name(), "step: plugin registered globally");
        self.plugins
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(plugin);
        self
    }

    pub fn snapshot(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.plugins.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Plugins installed on one bot, with the uninstallers they returned.
#[derive(Default)]
pub(crate) struct InstalledPlugins {
    names: Mutex<Vec<String>>,
    uninstallers: Mutex<Vec<(String, Uninstaller)>>,
}

impl InstalledPlugins {
    /// Runs `plugin.install(bot)` now and records the result.
    pub(crate) fn install(&self, bot: &Bot, plugin: &dyn Plugin) {
        let name = plugin.name().to_string();
        info!(bot = %bot.name(), plugin = %name, "step: installing plugin");
        let uninstaller = plugin.install(bot);
        if let Some(uninstaller) = uninstaller {
            self.uninstallers
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((name.clone(), uninstaller));
        }
        self.names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(name);
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.names.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Runs every recorded uninstaller, most recent first. Returns how many ran.
    pub(crate) fn uninstall_all(&self) -> usize {
        let uninstallers: Vec<(String, Uninstaller)> = self
            .uninstallers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        let count = uninstallers.len();
        for (name, uninstaller) in uninstallers.into_iter().rev() {
            info!(plugin = %name, "step: uninstalling plugin");
            uninstaller();
        }
        count
    }
}
