use futures::future::{BoxFuture, FutureExt};
use pbot_core::{Puppet, PuppetResult, RoomPayload, Sayable};
use std::sync::Arc;
use tracing::debug;

use super::{Contact, Entity, EntityKind, Message};
use crate::error::Result;
use crate::events::RoomEvent;

pub enum RoomKind {}

impl EntityKind for RoomKind {
    type Payload = RoomPayload;
    type Event = RoomEvent;
    const NAME: &'static str = "room";

    fn fetch(puppet: Arc<dyn Puppet>, id: String) -> BoxFuture<'static, PuppetResult<RoomPayload>> {
        async move { puppet.room_payload(&id).await }.boxed()
    }
}

pub type Room = Entity<RoomKind>;

impl Entity<RoomKind> {
    pub fn topic(&self) -> Result<String> {
        self.with_payload(|p| p.topic.clone())
    }

    pub fn owner_id(&self) -> Result<Option<String>> {
        self.with_payload(|p| p.owner_id.clone())
    }

    /// Member ids as of the last hydration.
    pub fn member_ids(&self) -> Result<Vec<String>> {
        self.with_payload(|p| p.member_ids.clone())
    }

    /// Current members, fetched from the backend and hydrated; members that fail to hydrate
    /// are skipped.
    pub async fn members(&self) -> Result<Vec<Arc<Contact>>> {
        let ctx = self.context()?;
        let ids = ctx.puppet()?.room_member_list(self.id()).await?;
        Ok(ctx.contacts.find_all_lossy(&ids).await)
    }

    pub async fn say(&self, sayable: impl Into<Sayable>) -> Result<Option<Arc<Message>>> {
        self.context()?.say_to(self.id(), sayable.into()).await
    }

    /// Drops the room's backend payload and member caches plus the local payload, then
    /// re-hydrates.
    pub async fn sync(&self) -> Result<()> {
        let puppet = self.puppet()?;
        puppet.room_payload_dirty(self.id()).await?;
        puppet.room_member_payload_dirty(self.id()).await?;
        self.invalidate();
        self.ready().await
    }

    /// Marks the room payload and its member payloads dirty in the backend and locally,
    /// without re-fetching.
    pub async fn dirty(&self) -> Result<()> {
        let puppet = self.puppet()?;
        puppet.room_payload_dirty(self.id()).await?;
        puppet.room_member_payload_dirty(self.id()).await?;
        self.invalidate();
        debug!(room_id = %self.id(), "room and member payloads marked dirty");
        Ok(())
    }
}
