//! Post composer and paginator: validation before the backend, comment chains, cursor paging.

mod common;

use pbot::{
    BotError, FileBox, MomentPayload, PaginationRequest, PostBuilder, PostPayload, PuppetError,
    UrlLinkPayload,
};

use common::{bot_on, ready_bot, seeded_puppet, SELF_ID};

/// **Test: an empty post never reaches the backend**
#[tokio::test]
async fn test_empty_post_is_rejected_before_backend() {
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;

    let err = bot.post(&PostBuilder::new().build()).await.unwrap_err();

    assert!(matches!(err, BotError::Validation(_)));
    assert_eq!(puppet.call_count("moment_post"), 0);
}

#[tokio::test]
async fn test_validation_precedes_binding() {
    let bot = bot_on(&seeded_puppet());
    let err = bot.post(&PostBuilder::new().build()).await.unwrap_err();
    assert!(matches!(err, BotError::Validation(_)));

    let err = bot
        .post(&PostBuilder::new().add("hello").build())
        .await
        .unwrap_err();
    assert_eq!(err, BotError::NotBound);
}

/// **Test: posting returns the hydrated post**
#[tokio::test]
async fn test_post_returns_hydrated_post() {
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;

    let draft = PostBuilder::new()
        .add("weekend trip")
        .add(pbot::Sayable::Image(FileBox::from_url(
            "beach.jpg",
            "https://img.example/beach.jpg",
        )))
        .add(UrlLinkPayload::new("https://blog.example/trip", "Trip notes"))
        .build();
    let post = bot.post(&draft).await.unwrap().expect("backend returns an id");

    assert!(post.is_ready());
    assert_eq!(post.text().unwrap().as_deref(), Some("weekend trip"));
    assert_eq!(post.moment().unwrap().images.len(), 1);
    assert_eq!(post.author().unwrap().id(), SELF_ID);
    assert!(post.parent_id().unwrap().is_none());
}

/// **Test: two-level comment chain**
///
/// Action: post a moment, `reply("hello world!")` on it, then `reply("welcome!")` on the reply.
/// Expected: each child's parent link is its immediate predecessor's id.
#[tokio::test]
async fn test_reply_chain_links_each_level() {
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;

    let moment = bot
        .post(&PostBuilder::new().add("first moment").build())
        .await
        .unwrap()
        .unwrap();
    let first = moment.reply("hello world!").await.unwrap().unwrap();
    let second = first.reply("welcome!").await.unwrap().unwrap();

    assert_eq!(first.parent_id().unwrap().as_deref(), Some(moment.id()));
    assert_eq!(second.parent_id().unwrap().as_deref(), Some(first.id()));
    assert_eq!(second.text().unwrap().as_deref(), Some("welcome!"));
    assert_eq!(
        puppet.post(second.id()).unwrap().moment.parent_id.as_deref(),
        Some(first.id())
    );

    let children = moment
        .child_list(PaginationRequest::default())
        .await
        .unwrap();
    assert_eq!(children.posts.len(), 1);
    assert_eq!(children.posts[0].id(), first.id());
}

/// **Test: next_page_token is None exactly on the last page**
#[tokio::test]
async fn test_child_list_pages_until_token_is_none() {
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;
    let moment = bot
        .post(&PostBuilder::new().add("poll").build())
        .await
        .unwrap()
        .unwrap();
    for i in 0..5 {
        moment.reply(format!("vote {}", i)).await.unwrap();
    }

    let mut texts = Vec::new();
    let mut pages = 0;
    let mut request = PaginationRequest::first(2);
    loop {
        let page = moment.child_list(request).await.unwrap();
        pages += 1;
        texts.extend(page.posts.iter().map(|p| p.text().unwrap().unwrap()));
        match page.next_page_token {
            Some(token) => {
                assert_eq!(page.posts.len(), 2);
                request = PaginationRequest::next(2, token);
            }
            None => break,
        }
    }

    assert_eq!(pages, 3);
    assert_eq!(
        texts,
        vec!["vote 0", "vote 1", "vote 2", "vote 3", "vote 4"]
    );
}

/// **Test: timeline lists top-level moments only and skips broken posts**
#[tokio::test]
async fn test_timeline_skips_posts_that_fail_to_hydrate() {
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;

    let kept = bot
        .post(&PostBuilder::new().add("kept").build())
        .await
        .unwrap()
        .unwrap();
    kept.reply("a comment").await.unwrap();
    puppet.add_post(PostPayload {
        id: "post-broken".to_string(),
        contact_id: "alice".to_string(),
        timestamp: 1_700_000_000_000,
        moment: MomentPayload {
            text: Some("unreadable".to_string()),
            ..MomentPayload::default()
        },
    });
    puppet.fail_payload("post-broken", PuppetError::Protocol("gone".into()));

    let page = bot.timeline(PaginationRequest::default()).await.unwrap();

    let ids: Vec<&str> = page.posts.iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec![kept.id()]);
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn test_page_size_is_clamped() {
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;
    for i in 0..3 {
        bot.post(&PostBuilder::new().add(format!("m{}", i)).build())
            .await
            .unwrap();
    }

    let page = bot.timeline(PaginationRequest::first(0)).await.unwrap();
    assert_eq!(page.posts.len(), 1);
    assert_eq!(page.next_page_token.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_remove_and_moment_settings() {
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;
    let post = bot
        .post(&PostBuilder::new().add("oops").build())
        .await
        .unwrap()
        .unwrap();

    assert!(post.remove().await.unwrap());
    assert!(!post.remove().await.unwrap());
    assert!(bot
        .timeline(PaginationRequest::default())
        .await
        .unwrap()
        .posts
        .is_empty());

    assert_eq!(bot.moment_signature(None).await.unwrap(), None);
    assert_eq!(
        bot.moment_signature(Some("hi there".to_string()))
            .await
            .unwrap()
            .as_deref(),
        Some("hi there")
    );
    let cover = FileBox::from_url("cover.png", "https://img.example/cover.png");
    assert_eq!(
        bot.moment_coverage(Some(cover.clone())).await.unwrap(),
        Some(cover)
    );
}
