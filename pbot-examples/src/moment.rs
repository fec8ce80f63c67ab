use anyhow::{Context, Result};
use pbot::{Bot, PaginationRequest, PostBuilder, Sayable};
use pbot_core::{init_tracing, FileBox, UrlLinkPayload};
use puppet_mock::MockPuppet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("logs/moment-bot.log")?;

    let bot = Bot::builder()
        .name("moment")
        .puppet(Arc::new(MockPuppet::demo()))
        .build()?;
    bot.start().await;
    tokio::time::timeout(Duration::from_secs(5), bot.ready()).await?;

    let draft = PostBuilder::new()
        .add("Sunday hike")
        .add(Sayable::Image(FileBox::from_url(
            "summit.jpg",
            "https://img.example/summit.jpg",
        )))
        .add(UrlLinkPayload::new("https://trails.example/42", "Trail 42"))
        .build();
    let moment = bot
        .post(&draft)
        .await?
        .context("backend returned no post id")?;
    info!(post_id = %moment.id(), "Posted moment");

    let reply = moment
        .reply("hello world!")
        .await?
        .context("backend returned no reply id")?;
    let nested = reply
        .reply("welcome!")
        .await?
        .context("backend returned no reply id")?;
    info!(
        reply_id = %reply.id(),
        nested_id = %nested.id(),
        nested_parent = ?nested.parent_id()?,
        "Comment chain created"
    );

    let mut request = PaginationRequest::first(1);
    loop {
        let page = bot.timeline(request).await?;
        for post in &page.posts {
            let comments = post.child_list(PaginationRequest::default()).await?;
            info!(
                post_id = %post.id(),
                text = ?post.text()?,
                comments = comments.posts.len(),
                "Timeline entry"
            );
        }
        match page.next_page_token {
            Some(token) => request = PaginationRequest::next(1, token),
            None => break,
        }
    }

    bot.stop().await;
    Ok(())
}
