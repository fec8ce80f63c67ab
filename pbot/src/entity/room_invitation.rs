use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use pbot_core::{timestamp_to_date, Puppet, PuppetResult, RoomInvitationPayload};
use std::sync::Arc;
use tracing::info;

use super::{Contact, Entity, EntityKind};
use crate::error::Result;
use crate::events::NoEvent;

pub enum RoomInvitationKind {}

impl EntityKind for RoomInvitationKind {
    type Payload = RoomInvitationPayload;
    type Event = NoEvent;
    const NAME: &'static str = "room-invitation";

    fn fetch(
        puppet: Arc<dyn Puppet>,
        id: String,
    ) -> BoxFuture<'static, PuppetResult<RoomInvitationPayload>> {
        async move { puppet.room_invitation_payload(&id).await }.boxed()
    }
}

pub type RoomInvitation = Entity<RoomInvitationKind>;

impl Entity<RoomInvitationKind> {
    pub fn inviter(&self) -> Result<Arc<Contact>> {
        let inviter_id = self.with_payload(|p| p.inviter_id.clone())?;
        self.context()?.contacts.load(&inviter_id)
    }

    pub fn topic(&self) -> Result<String> {
        self.with_payload(|p| p.topic.clone())
    }

    pub fn member_count(&self) -> Result<usize> {
        self.with_payload(|p| p.member_count)
    }

    pub fn date(&self) -> Result<DateTime<Utc>> {
        self.with_payload(|p| timestamp_to_date(p.timestamp))
    }

    pub async fn accept(&self) -> Result<()> {
        info!(room_invitation_id = %self.id(), "step: accepting room invitation");
        self.puppet()?.room_invitation_accept(self.id()).await?;
        Ok(())
    }
}
