use futures::future::{BoxFuture, FutureExt};
use pbot_core::{FriendshipPayload, FriendshipType, Puppet, PuppetResult};
use std::sync::Arc;
use tracing::info;

use super::{Contact, Entity, EntityKind};
use crate::error::Result;
use crate::events::NoEvent;

pub enum FriendshipKind {}

impl EntityKind for FriendshipKind {
    type Payload = FriendshipPayload;
    type Event = NoEvent;
    const NAME: &'static str = "friendship";

    fn fetch(
        puppet: Arc<dyn Puppet>,
        id: String,
    ) -> BoxFuture<'static, PuppetResult<FriendshipPayload>> {
        async move { puppet.friendship_payload(&id).await }.boxed()
    }
}

pub type Friendship = Entity<FriendshipKind>;

impl Entity<FriendshipKind> {
    /// The contact on the other side. Loaded, not hydrated.
    pub fn contact(&self) -> Result<Arc<Contact>> {
        let contact_id = self.with_payload(|p| p.contact_id.clone())?;
        self.context()?.contacts.load(&contact_id)
    }

    pub fn hello(&self) -> Result<String> {
        self.with_payload(|p| p.hello.clone())
    }

    pub fn friendship_type(&self) -> Result<FriendshipType> {
        self.with_payload(|p| p.friendship_type)
    }

    /// Accepts a received request, then refreshes this friendship and the new friend.
    pub async fn accept(&self) -> Result<()> {
        info!(friendship_id = %self.id(), "step: accepting friendship");
        self.puppet()?.friendship_accept(self.id()).await?;
        self.invalidate();
        self.ready().await?;
        self.contact()?.sync().await
    }
}
