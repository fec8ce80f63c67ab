//! Backend abstraction. [`Puppet`] is protocol-agnostic; each adapter (network client, browser
//! automation, device emulation, in-memory mock) implements it and the framework consumes only
//! this contract.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::PuppetResult;
use crate::event::PuppetEvent;
use crate::types::{
    ContactPayload, FileBox, FriendshipPayload, MessagePayload, MomentPayload, PaginationRequest,
    PaginationResponse, PostPayload, PostQuery, RoomInvitationPayload, RoomPayload, Sayable,
};

/// Capability contract every backend adapter implements.
#[async_trait]
pub trait Puppet: Send + Sync {
    /// Adapter name, used in logs.
    fn name(&self) -> &str;

    /// Subscribes to the backend event stream. Events emitted before subscribing are not replayed.
    fn subscribe(&self) -> broadcast::Receiver<PuppetEvent>;

    async fn start(&self) -> PuppetResult<()>;
    async fn stop(&self) -> PuppetResult<()>;
    async fn logout(&self) -> PuppetResult<()>;
    /// Whether an account is currently logged in.
    fn logonoff(&self) -> bool;
    /// Id of the logged-in account, if any.
    fn self_id(&self) -> Option<String>;
    /// Asks the backend to answer with a `dong` event carrying `data`.
    async fn ding(&self, data: Option<String>) -> PuppetResult<()>;
    /// Releases resources that would otherwise keep the process alive.
    fn unref(&self);

    async fn contact_payload(&self, contact_id: &str) -> PuppetResult<ContactPayload>;
    async fn room_payload(&self, room_id: &str) -> PuppetResult<RoomPayload>;
    async fn room_member_list(&self, room_id: &str) -> PuppetResult<Vec<String>>;
    async fn message_payload(&self, message_id: &str) -> PuppetResult<MessagePayload>;
    async fn friendship_payload(&self, friendship_id: &str) -> PuppetResult<FriendshipPayload>;
    async fn room_invitation_payload(
        &self,
        room_invitation_id: &str,
    ) -> PuppetResult<RoomInvitationPayload>;
    async fn post_payload(&self, post_id: &str) -> PuppetResult<PostPayload>;

    /// Drops any backend-side cache for the payload so the next fetch is fresh.
    async fn contact_payload_dirty(&self, contact_id: &str) -> PuppetResult<()>;
    async fn room_payload_dirty(&self, room_id: &str) -> PuppetResult<()>;
    async fn room_member_payload_dirty(&self, room_id: &str) -> PuppetResult<()>;

    /// Sends `sayable` to a contact or room; returns the new message id when the backend has one.
    async fn message_send(
        &self,
        conversation_id: &str,
        sayable: &Sayable,
    ) -> PuppetResult<Option<String>>;
    async fn friendship_accept(&self, friendship_id: &str) -> PuppetResult<()>;
    async fn room_invitation_accept(&self, room_invitation_id: &str) -> PuppetResult<()>;

    /// Publishes a moment; returns the new post id when the backend has one.
    async fn moment_post(&self, moment: &MomentPayload) -> PuppetResult<Option<String>>;
    async fn moment_list(
        &self,
        query: &PostQuery,
        pagination: &PaginationRequest,
    ) -> PuppetResult<PaginationResponse<String>>;
    /// Sets the timeline signature when `text` is given; returns the current signature.
    async fn moment_signature(&self, text: Option<String>) -> PuppetResult<Option<String>>;
    /// Sets the timeline cover when `cover` is given; returns the current cover.
    async fn moment_coverage(&self, cover: Option<FileBox>) -> PuppetResult<Option<FileBox>>;
    async fn moment_remove(&self, post_id: &str) -> PuppetResult<bool>;
}
