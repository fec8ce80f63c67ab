//! The bot instance: one backend, one identity map, one lifecycle, one plugin list.

use pbot_core::{FileBox, PaginationRequest, PostQuery, Puppet, PuppetError, Sayable};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn, Instrument};
use uuid::Uuid;

use crate::bridge;
use crate::config::BotConfig;
use crate::context::BotContext;
use crate::entity::{
    Contact, ContactKind, EntityFactory, FriendshipKind, Message, MessageKind, Post, PostKind,
    RoomInvitationKind, RoomKind,
};
use crate::error::{BotError, Result};
use crate::events::BotEvent;
use crate::moment::{self, PostDraft, PostPage};
use crate::plugin::{InstalledPlugins, Plugin, PluginRegistry};
use crate::resolver::{PuppetOptions, PuppetResolver};
use crate::state::{Claim, StateSwitch, SwitchState, Target};

/// A chat bot driving one backend. Cloning is cheap; clones share the same instance.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

struct BotInner {
    ctx: Arc<BotContext>,
    switch: Arc<StateSwitch>,
    plugins: InstalledPlugins,
    bridge: Mutex<Option<JoinHandle<()>>>,
    puppet: Option<Arc<dyn Puppet>>,
    resolver: Option<PuppetResolver>,
    options: PuppetOptions,
}

impl Drop for BotInner {
    fn drop(&mut self) {
        if let Some(handle) = self
            .bridge
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
        if let Some(puppet) = self.ctx.bound_puppet() {
            puppet.unref();
        }
    }
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    /// Unique id of this instance.
    pub fn id(&self) -> &str {
        &self.inner.ctx.id
    }

    pub fn name(&self) -> &str {
        &self.inner.ctx.name
    }

    pub fn state(&self) -> SwitchState {
        self.inner.switch.current()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.switch.is_ready()
    }

    /// The bound backend; `NotBound` before the first `start()` resolved one.
    pub fn puppet(&self) -> Result<Arc<dyn Puppet>> {
        self.inner.ctx.puppet()
    }

    // --- identity maps ---

    pub fn contacts(&self) -> &EntityFactory<ContactKind> {
        &self.inner.ctx.contacts
    }

    pub fn rooms(&self) -> &EntityFactory<RoomKind> {
        &self.inner.ctx.rooms
    }

    pub fn messages(&self) -> &EntityFactory<MessageKind> {
        &self.inner.ctx.messages
    }

    pub fn friendships(&self) -> &EntityFactory<FriendshipKind> {
        &self.inner.ctx.friendships
    }

    pub fn room_invitations(&self) -> &EntityFactory<RoomInvitationKind> {
        &self.inner.ctx.room_invitations
    }

    pub fn posts(&self) -> &EntityFactory<PostKind> {
        &self.inner.ctx.posts
    }

    // --- lifecycle ---

    /// Starts the bot: resolves and binds the backend, wires the event bridge, starts the
    /// backend and emits `start`.
    ///
    /// Never fails: errors are emitted as `error` events followed by a best-effort stop. A
    /// call made while a start is in flight waits for it instead of starting again.
    #[instrument(skip(self), fields(bot = %self.name()))]
    pub async fn start(&self) {
        let switch = &self.inner.switch;
        loop {
            match switch.claim(Target::On) {
                Claim::Run => break,
                Claim::Done => {
                    debug!("already started");
                    return;
                }
                Claim::InFlight => {
                    debug!("start in flight, waiting");
                    switch.settled().await;
                    return;
                }
                Claim::Blocked => {
                    debug!("stop in flight, waiting before start");
                    switch.settled().await;
                }
            }
        }

        // Detached: dropping this future must not leave the switch pending.
        let bot = self.clone();
        let transition = tokio::spawn(async move { bot.run_start().await }.in_current_span());
        if let Err(e) = transition.await {
            error!(error = %e, "start task aborted");
            switch.settle(SwitchState::Off);
        }
    }

    async fn run_start(&self) {
        let switch = &self.inner.switch;
        switch.set_ready(false);
        info!("step: starting bot");
        match self.start_puppet().await {
            Ok(()) => {
                switch.settle(SwitchState::On);
                info!("step: bot started");
                self.inner.ctx.emit(BotEvent::Start);
            }
            Err(e) => {
                error!(error = %e, "bot start failed");
                self.inner.ctx.emit(BotEvent::Error(e));
                self.shutdown_puppet().await;
                switch.settle(SwitchState::Off);
                self.inner.ctx.emit(BotEvent::Stop);
            }
        }
    }

    /// Stops the backend and emits `stop`. Errors are emitted as `error` events; the bot
    /// reaches Off regardless.
    #[instrument(skip(self), fields(bot = %self.name()))]
    pub async fn stop(&self) {
        let switch = &self.inner.switch;
        loop {
            match switch.claim(Target::Off) {
                Claim::Run => break,
                Claim::Done => {
                    debug!("already stopped");
                    return;
                }
                Claim::InFlight => {
                    debug!("stop in flight, waiting");
                    switch.settled().await;
                    return;
                }
                Claim::Blocked => {
                    debug!("start in flight, waiting before stop");
                    switch.settled().await;
                }
            }
        }

        let bot = self.clone();
        let transition = tokio::spawn(async move { bot.run_stop().await }.in_current_span());
        if let Err(e) = transition.await {
            error!(error = %e, "stop task aborted");
            switch.settle(SwitchState::Off);
        }
    }

    async fn run_stop(&self) {
        let switch = &self.inner.switch;
        switch.set_ready(false);
        info!("step: stopping bot");
        self.shutdown_puppet().await;
        switch.settle(SwitchState::Off);
        info!("step: bot stopped");
        self.inner.ctx.emit(BotEvent::Stop);
    }

    /// Restarts the backend in place. Plugins, listeners and the identity map are kept.
    #[instrument(skip(self), fields(bot = %self.name()))]
    pub async fn reset(&self, reason: &str) {
        if self.state() != SwitchState::On {
            warn!(state = ?self.state(), "reset ignored, bot is not on");
            return;
        }
        let Some(puppet) = self.inner.ctx.bound_puppet() else {
            warn!("reset ignored, no puppet bound");
            return;
        };

        info!(reason = %reason, "step: resetting backend");
        self.inner.switch.set_ready(false);
        if let Err(e) = puppet.stop().await {
            error!(error = %e, "backend stop failed during reset");
            self.inner.ctx.emit(BotEvent::Error(e.into()));
        }
        if let Err(e) = puppet.start().await {
            error!(error = %e, "backend start failed during reset");
            self.inner.ctx.emit(BotEvent::Error(e.into()));
        }
    }

    /// Resolves once the backend reported `ready`.
    pub async fn ready(&self) {
        self.inner.switch.wait_ready().await;
    }

    async fn start_puppet(&self) -> Result<()> {
        let ctx = &self.inner.ctx;
        let puppet = self.resolve_puppet()?;
        if ctx.bound_puppet().is_none() {
            ctx.bind_puppet(Arc::clone(&puppet));
        }

        let handle = bridge::spawn(
            Arc::downgrade(ctx),
            Arc::clone(&self.inner.switch),
            puppet.subscribe(),
        );
        let previous = self.lock_bridge().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        info!(puppet = %puppet.name(), "step: event bridge wired");

        puppet.start().await?;
        Ok(())
    }

    fn resolve_puppet(&self) -> Result<Arc<dyn Puppet>> {
        if let Some(puppet) = self.inner.ctx.bound_puppet() {
            return Ok(puppet);
        }
        if let Some(puppet) = &self.inner.puppet {
            return Ok(Arc::clone(puppet));
        }
        match &self.inner.resolver {
            Some(resolver) => resolver.resolve(&self.inner.options),
            None => Err(BotError::Config(format!(
                "no puppet instance and no resolver for '{}'",
                self.inner.options.name
            ))),
        }
    }

    async fn shutdown_puppet(&self) {
        let bridge = self.lock_bridge().take();
        if let Some(handle) = bridge {
            handle.abort();
        }
        if let Some(puppet) = self.inner.ctx.bound_puppet() {
            if let Err(e) = puppet.stop().await {
                error!(error = %e, "backend stop failed");
                self.inner.ctx.emit(BotEvent::Error(e.into()));
            }
        }
    }

    fn lock_bridge(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner.bridge.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- events ---

    /// Registers a bot-level listener.
    pub fn on(&self, listener: impl Fn(&BotEvent) + Send + Sync + 'static) {
        self.inner.ctx.events.add(listener);
    }

    /// Channel receiving every bot-level event from now on.
    pub fn subscribe(&self) -> tokio::sync::mpsc::UnboundedReceiver<BotEvent> {
        self.inner.ctx.events.subscribe()
    }

    // --- account ---

    pub fn is_logged_in(&self) -> bool {
        self.inner
            .ctx
            .bound_puppet()
            .is_some_and(|puppet| puppet.logonoff())
    }

    /// The logged-in account, hydrated.
    pub async fn current_user(&self) -> Result<Arc<Contact>> {
        let self_id = self
            .puppet()?
            .self_id()
            .ok_or(BotError::Puppet(PuppetError::NotLoggedIn))?;
        self.contacts().find(&self_id).await
    }

    /// Asks the backend for a `dong` event carrying `data`.
    pub async fn ding(&self, data: Option<String>) -> Result<()> {
        self.puppet()?.ding(data).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(bot = %self.name()))]
    pub async fn logout(&self) -> Result<()> {
        info!("step: logging out");
        self.puppet()?.logout().await?;
        Ok(())
    }

    /// Sends `sayable` to the logged-in account itself.
    pub async fn say(&self, sayable: impl Into<Sayable>) -> Result<Option<Arc<Message>>> {
        let me = self.current_user().await?;
        self.inner.ctx.say_to(me.id(), sayable.into()).await
    }

    // --- moments ---

    /// Posts a built draft. Validation errors are raised before the backend is called.
    pub async fn post(&self, draft: &PostDraft) -> Result<Option<Arc<Post>>> {
        moment::post(&self.inner.ctx, draft).await
    }

    /// One page of top-level moments.
    pub async fn timeline(&self, pagination: PaginationRequest) -> Result<PostPage> {
        moment::list(&self.inner.ctx, &PostQuery::timeline(), pagination).await
    }

    /// Reads the moment signature, or sets it when `text` is given.
    pub async fn moment_signature(&self, text: Option<String>) -> Result<Option<String>> {
        Ok(self.puppet()?.moment_signature(text).await?)
    }

    /// Reads the moment cover image, or sets it when `cover` is given.
    pub async fn moment_coverage(&self, cover: Option<FileBox>) -> Result<Option<FileBox>> {
        Ok(self.puppet()?.moment_coverage(cover).await?)
    }

    // --- plugins ---

    /// Installs `plugin` on this bot immediately.
    pub fn use_plugin(&self, plugin: Arc<dyn Plugin>) {
        self.inner.plugins.install(self, plugin.as_ref());
    }

    /// Names of the installed plugins, in installation order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.inner.plugins.names()
    }

    /// Runs every recorded uninstaller, most recent first. Returns how many ran.
    pub fn uninstall_plugins(&self) -> usize {
        self.inner.plugins.uninstall_all()
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Builds a [`Bot`]. Plugins from the given registry are installed once, in registration
/// order, when the bot is built.
#[derive(Default)]
pub struct BotBuilder {
    config: BotConfig,
    puppet: Option<Arc<dyn Puppet>>,
    resolver: Option<PuppetResolver>,
    registry: Option<PluginRegistry>,
}

impl BotBuilder {
    pub fn config(mut self, config: BotConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Uses this backend instance instead of resolving one by name.
    pub fn puppet(mut self, puppet: Arc<dyn Puppet>) -> Self {
        self.puppet = Some(puppet);
        self
    }

    pub fn resolver(mut self, resolver: PuppetResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn plugins(mut self, registry: &PluginRegistry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    pub fn build(self) -> Result<Bot> {
        self.config.validate()?;

        let id = Uuid::new_v4().to_string();
        let ctx = BotContext::new(id, self.config.name.clone(), self.config.page_size);
        let bot = Bot {
            inner: Arc::new(BotInner {
                ctx,
                switch: Arc::new(StateSwitch::new()),
                plugins: InstalledPlugins::default(),
                bridge: Mutex::new(None),
                puppet: self.puppet,
                resolver: self.resolver,
                options: PuppetOptions::from(&self.config),
            }),
        };
        info!(bot = %bot.name(), id = %bot.id(), "step: bot created");

        if let Some(registry) = &self.registry {
            for plugin in registry.snapshot() {
                bot.use_plugin(plugin);
            }
        }
        Ok(bot)
    }
}
