use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use pbot_core::{timestamp_to_date, MessagePayload, MessageType, Puppet, PuppetResult, Sayable};
use std::sync::Arc;

use super::{Contact, Entity, EntityKind, Room};
use crate::error::Result;
use crate::events::NoEvent;

pub enum MessageKind {}

impl EntityKind for MessageKind {
    type Payload = MessagePayload;
    type Event = NoEvent;
    const NAME: &'static str = "message";

    fn fetch(puppet: Arc<dyn Puppet>, id: String) -> BoxFuture<'static, PuppetResult<MessagePayload>> {
        async move { puppet.message_payload(&id).await }.boxed()
    }
}

pub type Message = Entity<MessageKind>;

impl Entity<MessageKind> {
    pub fn text(&self) -> Result<String> {
        self.with_payload(|p| p.text.clone())
    }

    pub fn message_type(&self) -> Result<MessageType> {
        self.with_payload(|p| p.message_type)
    }

    pub fn date(&self) -> Result<DateTime<Utc>> {
        self.with_payload(|p| timestamp_to_date(p.timestamp))
    }

    /// Sender. Loaded, not hydrated.
    pub fn talker(&self) -> Result<Arc<Contact>> {
        let talker_id = self.with_payload(|p| p.talker_id.clone())?;
        self.context()?.contacts.load(&talker_id)
    }

    /// Room the message was posted in, if any. Loaded, not hydrated.
    pub fn room(&self) -> Result<Option<Arc<Room>>> {
        let room_id = self.with_payload(|p| p.room_id.clone())?;
        match room_id {
            Some(id) => Ok(Some(self.context()?.rooms.load(&id)?)),
            None => Ok(None),
        }
    }

    /// Recipient of a direct message. Loaded, not hydrated.
    pub fn listener(&self) -> Result<Option<Arc<Contact>>> {
        let listener_id = self.with_payload(|p| p.listener_id.clone())?;
        match listener_id {
            Some(id) => Ok(Some(self.context()?.contacts.load(&id)?)),
            None => Ok(None),
        }
    }

    /// Whether the logged-in account sent this message.
    pub fn is_self(&self) -> Result<bool> {
        Ok(self.talker()?.is_self())
    }

    /// Replies in the same conversation: the room for room messages, otherwise the other party.
    pub async fn say(&self, sayable: impl Into<Sayable>) -> Result<Option<Arc<Message>>> {
        let (talker_id, room_id, listener_id) = self.with_payload(|p| {
            (p.talker_id.clone(), p.room_id.clone(), p.listener_id.clone())
        })?;
        let from_self = self.is_self()?;
        let conversation_id = match (room_id, listener_id) {
            (Some(room_id), _) => room_id,
            (None, Some(listener_id)) if from_self => listener_id,
            _ => talker_id,
        };
        self.context()?.say_to(&conversation_id, sayable.into()).await
    }
}
