use futures::future::{BoxFuture, FutureExt};
use pbot_core::{ContactPayload, ContactType, Puppet, PuppetResult, Sayable};
use std::sync::Arc;

use super::{Entity, EntityKind, Message};
use crate::error::Result;
use crate::events::ContactEvent;

pub enum ContactKind {}

impl EntityKind for ContactKind {
    type Payload = ContactPayload;
    type Event = ContactEvent;
    const NAME: &'static str = "contact";

    fn fetch(puppet: Arc<dyn Puppet>, id: String) -> BoxFuture<'static, PuppetResult<ContactPayload>> {
        async move { puppet.contact_payload(&id).await }.boxed()
    }
}

pub type Contact = Entity<ContactKind>;

impl Entity<ContactKind> {
    pub fn name(&self) -> Result<String> {
        self.with_payload(|p| p.name.clone())
    }

    pub fn alias(&self) -> Result<Option<String>> {
        self.with_payload(|p| p.alias.clone())
    }

    pub fn contact_type(&self) -> Result<ContactType> {
        self.with_payload(|p| p.contact_type)
    }

    pub fn is_friend(&self) -> Result<bool> {
        self.with_payload(|p| p.friend)
    }

    /// Whether this contact is the logged-in account.
    pub fn is_self(&self) -> bool {
        self.puppet()
            .ok()
            .and_then(|p| p.self_id())
            .is_some_and(|id| id == self.id())
    }

    pub async fn say(&self, sayable: impl Into<Sayable>) -> Result<Option<Arc<Message>>> {
        self.context()?.say_to(self.id(), sayable.into()).await
    }

    /// Drops backend and local caches, then re-hydrates.
    pub async fn sync(&self) -> Result<()> {
        self.puppet()?.contact_payload_dirty(self.id()).await?;
        self.invalidate();
        self.ready().await
    }
}
