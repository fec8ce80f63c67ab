//! Post composer and paginator.
//!
//! [`PostBuilder`] collects [`Sayable`] items in call order and freezes them into a
//! [`PostDraft`]. Posting converts the draft into the backend's [`MomentPayload`]: at most one
//! text, at most one video, any number of images (order kept) and at most one url-link. Any
//! other item kind, a duplicated single-slot kind, or a draft with no content is a
//! [`BotError::Validation`] raised before the backend is called.

use pbot_core::{MomentPayload, PaginationRequest, PostQuery, Sayable};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::context::BotContext;
use crate::entity::Post;
use crate::error::{BotError, Result};

/// Upper bound on a requested page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Accumulates post content; consumed by [`PostBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct PostBuilder {
    items: Vec<Sayable>,
    parent_id: Option<String>,
}

impl PostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one item.
    pub fn add(mut self, item: impl Into<Sayable>) -> Self {
        self.items.push(item.into());
        self
    }

    /// Makes the post a reply to `parent_id`.
    pub fn reply_to(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn build(self) -> PostDraft {
        PostDraft {
            items: self.items.into(),
            parent_id: self.parent_id,
        }
    }
}

/// Frozen, ordered post content ready to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    items: Arc<[Sayable]>,
    parent_id: Option<String>,
}

impl PostDraft {
    pub fn items(&self) -> &[Sayable] {
        &self.items
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Buckets the items into the backend moment structure.
    pub fn to_moment(&self) -> Result<MomentPayload> {
        let mut moment = MomentPayload {
            parent_id: self.parent_id.clone(),
            ..MomentPayload::default()
        };

        for item in self.items.iter() {
            match item {
                Sayable::Text(text) => {
                    if moment.text.replace(text.clone()).is_some() {
                        return Err(duplicate(item));
                    }
                }
                Sayable::Video(file) => {
                    if moment.video.replace(file.clone()).is_some() {
                        return Err(duplicate(item));
                    }
                }
                Sayable::Image(file) => moment.images.push(file.clone()),
                Sayable::UrlLink(link) => {
                    if moment.url_link.replace(link.clone()).is_some() {
                        return Err(duplicate(item));
                    }
                }
                Sayable::MiniProgram(_) => {
                    return Err(BotError::Validation(format!(
                        "{} items cannot be posted",
                        item.kind()
                    )));
                }
            }
        }

        if moment.is_empty() {
            return Err(BotError::Validation("post has no content".to_string()));
        }
        Ok(moment)
    }
}

fn duplicate(item: &Sayable) -> BotError {
    BotError::Validation(format!("a post carries at most one {} item", item.kind()))
}

/// One page of hydrated posts. `next_page_token == None` marks the final page.
#[derive(Debug, Clone)]
pub struct PostPage {
    pub posts: Vec<Arc<Post>>,
    pub next_page_token: Option<String>,
}

/// Clamps a requested page size to `1..=MAX_PAGE_SIZE`, falling back to `default` when unset.
pub fn bounded_page_size(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
}

/// Validates and posts `draft`; returns the hydrated post, or `None` when the backend does not
/// report an id.
#[instrument(skip(ctx, draft), fields(bot = %ctx.name))]
pub(crate) async fn post(ctx: &BotContext, draft: &PostDraft) -> Result<Option<Arc<Post>>> {
    let moment = draft.to_moment()?;
    let puppet = ctx.puppet()?;

    info!(
        parent_id = ?moment.parent_id,
        images = moment.images.len(),
        "step: posting moment"
    );
    match puppet.moment_post(&moment).await? {
        Some(post_id) => {
            let post = ctx.posts.find(&post_id).await?;
            info!(post_id = %post_id, "step: moment posted");
            Ok(Some(post))
        }
        None => {
            info!("moment posted without id");
            Ok(None)
        }
    }
}

/// Fetches one page of post ids and hydrates them; posts that fail to hydrate are skipped.
#[instrument(skip(ctx, query, pagination), fields(bot = %ctx.name, parent_id = ?query.parent_id))]
pub(crate) async fn list(
    ctx: &BotContext,
    query: &PostQuery,
    pagination: PaginationRequest,
) -> Result<PostPage> {
    let request = PaginationRequest {
        page_size: Some(bounded_page_size(
            pagination.page_size,
            ctx.default_page_size,
        )),
        page_token: pagination.page_token,
    };
    let page = ctx.puppet()?.moment_list(query, &request).await?;
    let posts = ctx.posts.find_all_lossy(&page.response).await;

    info!(
        requested = page.response.len(),
        hydrated = posts.len(),
        has_next = page.next_page_token.is_some(),
        "step: post page assembled"
    );
    Ok(PostPage {
        posts,
        next_page_token: page.next_page_token,
    })
}
