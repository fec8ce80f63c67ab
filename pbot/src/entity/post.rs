use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use pbot_core::{
    timestamp_to_date, MomentPayload, PaginationRequest, PostPayload, PostQuery, Puppet,
    PuppetResult,
};
use std::sync::Arc;
use tracing::info;

use super::{Contact, Entity, EntityKind};
use crate::error::Result;
use crate::events::NoEvent;
use crate::moment::{self, PostBuilder, PostPage};

pub enum PostKind {}

impl EntityKind for PostKind {
    type Payload = PostPayload;
    type Event = NoEvent;
    const NAME: &'static str = "post";

    fn fetch(puppet: Arc<dyn Puppet>, id: String) -> BoxFuture<'static, PuppetResult<PostPayload>> {
        async move { puppet.post_payload(&id).await }.boxed()
    }
}

/// A timeline moment or a comment on one (a post with a parent).
pub type Post = Entity<PostKind>;

impl Entity<PostKind> {
    pub fn author(&self) -> Result<Arc<Contact>> {
        let contact_id = self.with_payload(|p| p.contact_id.clone())?;
        self.context()?.contacts.load(&contact_id)
    }

    /// Id of the post this one replies to; `None` for top-level moments.
    pub fn parent_id(&self) -> Result<Option<String>> {
        self.with_payload(|p| p.moment.parent_id.clone())
    }

    pub fn moment(&self) -> Result<MomentPayload> {
        self.with_payload(|p| p.moment.clone())
    }

    pub fn text(&self) -> Result<Option<String>> {
        self.with_payload(|p| p.moment.text.clone())
    }

    pub fn date(&self) -> Result<DateTime<Utc>> {
        self.with_payload(|p| timestamp_to_date(p.timestamp))
    }

    /// Posts a text comment whose parent link points at this post.
    pub async fn reply(&self, text: impl Into<String>) -> Result<Option<Arc<Post>>> {
        let draft = PostBuilder::new()
            .reply_to(self.id())
            .add(text.into())
            .build();
        let ctx = self.context()?;
        moment::post(&ctx, &draft).await
    }

    /// One page of direct replies to this post.
    pub async fn child_list(&self, pagination: PaginationRequest) -> Result<PostPage> {
        let ctx = self.context()?;
        moment::list(&ctx, &PostQuery::children_of(self.id()), pagination).await
    }

    /// Deletes the post from the backend. Returns whether anything was removed.
    pub async fn remove(&self) -> Result<bool> {
        info!(post_id = %self.id(), "step: removing post");
        let removed = self.puppet()?.moment_remove(self.id()).await?;
        self.invalidate();
        Ok(removed)
    }
}
