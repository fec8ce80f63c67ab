//! State shared by a bot and every entity it created: the bound backend, the identity maps
//! and the bot-level listeners. Entities hold a `Weak` reference so they never keep a dropped
//! bot alive.

use pbot_core::{Puppet, Sayable};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::entity::{
    ContactKind, EntityFactory, FriendshipKind, Message, MessageKind, PostKind, RoomInvitationKind,
    RoomKind,
};
use crate::error::{BotError, Result};
use crate::events::{BotEvent, Listeners};

pub(crate) struct BotContext {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) default_page_size: usize,
    puppet: RwLock<Option<Arc<dyn Puppet>>>,
    pub(crate) contacts: EntityFactory<ContactKind>,
    pub(crate) rooms: EntityFactory<RoomKind>,
    pub(crate) messages: EntityFactory<MessageKind>,
    pub(crate) friendships: EntityFactory<FriendshipKind>,
    pub(crate) room_invitations: EntityFactory<RoomInvitationKind>,
    pub(crate) posts: EntityFactory<PostKind>,
    pub(crate) events: Listeners<BotEvent>,
}

impl BotContext {
    pub(crate) fn new(id: String, name: String, default_page_size: usize) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            id,
            name,
            default_page_size,
            puppet: RwLock::new(None),
            contacts: EntityFactory::new(weak.clone()),
            rooms: EntityFactory::new(weak.clone()),
            messages: EntityFactory::new(weak.clone()),
            friendships: EntityFactory::new(weak.clone()),
            room_invitations: EntityFactory::new(weak.clone()),
            posts: EntityFactory::new(weak.clone()),
            events: Listeners::default(),
        })
    }

    /// Binds the backend every entity of this bot talks to.
    pub(crate) fn bind_puppet(&self, puppet: Arc<dyn Puppet>) {
        info!(bot = %self.name, puppet = %puppet.name(), "step: puppet bound to identity map");
        *self.puppet.write().unwrap_or_else(|e| e.into_inner()) = Some(puppet);
    }

    pub(crate) fn bound_puppet(&self) -> Option<Arc<dyn Puppet>> {
        self.puppet.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn puppet(&self) -> Result<Arc<dyn Puppet>> {
        self.bound_puppet().ok_or(BotError::NotBound)
    }

    pub(crate) fn emit(&self, event: BotEvent) {
        debug!(bot = %self.name, event = event.name(), "emit");
        self.events.emit(&event);
    }

    /// Sends `sayable` to a contact or room and returns the sent message when the backend
    /// reports its id.
    pub(crate) async fn say_to(
        &self,
        conversation_id: &str,
        sayable: Sayable,
    ) -> Result<Option<Arc<Message>>> {
        let puppet = self.puppet()?;
        debug!(bot = %self.name, conversation_id = %conversation_id, kind = sayable.kind(), "say");
        match puppet.message_send(conversation_id, &sayable).await? {
            Some(message_id) => Ok(Some(self.messages.find(&message_id).await?)),
            None => Ok(None),
        }
    }
}
