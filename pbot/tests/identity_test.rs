//! Identity map and lazy hydration: one object per id per bot, one backend fetch per
//! hydration, explicit hydration state.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pbot::{BotError, HydrationState, PuppetError};

use common::{bot_on, calls_with, ready_bot, seeded_puppet};

/// **Test: repeated loads return the same object**
///
/// Setup: unstarted bot. Action: `load("alice")` twice, from clones of the bot.
/// Expected: both calls return the identical `Arc`, and nothing is fetched.
#[tokio::test]
async fn test_load_returns_same_instance() {
    let puppet = seeded_puppet();
    let bot = bot_on(&puppet);

    let a = bot.contacts().load("alice").unwrap();
    let b = bot.clone().contacts().load("alice").unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.hydration_state(), HydrationState::Stub);
    assert_eq!(bot.contacts().len(), 1);
    assert_eq!(puppet.call_count("contact_payload"), 0);
}

/// **Test: identity maps are per bot**
///
/// Setup: two bots on the same backend. Expected: the same id yields different objects.
#[tokio::test]
async fn test_identity_maps_are_instance_scoped() {
    let puppet = seeded_puppet();
    let first = bot_on(&puppet);
    let second = bot_on(&puppet);

    let a = first.rooms().load("team").unwrap();
    let b = second.rooms().load("team").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_ne!(first.id(), second.id());
}

#[tokio::test]
async fn test_load_rejects_blank_id() {
    let bot = bot_on(&seeded_puppet());
    let err = bot.contacts().load("  ").unwrap_err();
    assert_eq!(err, BotError::InvalidId { kind: "contact" });
}

/// **Test: concurrent ready() triggers one fetch**
///
/// Setup: started bot, backend latency of 50ms. Action: ten concurrent `ready()` calls on a
/// fresh stub. Expected: one `contact_payload` call for that id; every caller sees Ready.
#[tokio::test]
async fn test_concurrent_ready_fetches_once() {
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;
    puppet.set_latency(Some(Duration::from_millis(50)));

    let alice = bot.contacts().load("alice").unwrap();
    let results = futures::future::join_all((0..10).map(|_| alice.ready())).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(calls_with(&puppet, "contact_payload", "alice"), 1);
    assert_eq!(alice.hydration_state(), HydrationState::Ready);
    assert_eq!(alice.name().unwrap(), "Alice");

    alice.ready().await.unwrap();
    assert_eq!(calls_with(&puppet, "contact_payload", "alice"), 1);
}

/// **Test: attributes of a stub are a typed error**
#[tokio::test]
async fn test_reading_stub_attributes_is_not_ready_error() {
    let bot = bot_on(&seeded_puppet());
    let bob = bot.contacts().load("bob").unwrap();

    assert_eq!(
        bob.name().unwrap_err(),
        BotError::NotReady {
            kind: "contact",
            id: "bob".to_string()
        }
    );
    assert!(!bob.is_ready());
}

/// **Test: entities are inert until a backend is bound**
#[tokio::test]
async fn test_ready_before_start_is_not_bound() {
    let bot = bot_on(&seeded_puppet());
    let bob = bot.contacts().load("bob").unwrap();
    assert_eq!(bob.ready().await.unwrap_err(), BotError::NotBound);
    assert_eq!(bob.hydration_state(), HydrationState::Stub);
}

/// **Test: failed hydration surfaces to the caller and can be retried**
///
/// Setup: backend fails `bob`. Expected: `ready()` returns a Hydration error and the entity is
/// Failed; after the failure is cleared the next `ready()` succeeds.
#[tokio::test]
async fn test_failed_hydration_is_reported_and_retried() {
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;
    puppet.fail_payload("bob", PuppetError::Protocol("backend down".into()));

    let bob = bot.contacts().load("bob").unwrap();
    let err = bob.ready().await.unwrap_err();
    assert!(matches!(err, BotError::Hydration { kind: "contact", ref id, .. } if id == "bob"));
    assert_eq!(bob.hydration_state(), HydrationState::Failed);

    puppet.clear_failure("bob");
    bob.ready().await.unwrap();
    assert_eq!(bob.hydration_state(), HydrationState::Ready);
    assert_eq!(calls_with(&puppet, "contact_payload", "bob"), 2);
}

/// **Test: invalidation forces a re-fetch**
///
/// Setup: hydrated contact, then `sync()`. Expected: the backend dirty call and a second fetch.
#[tokio::test]
async fn test_sync_refetches_after_invalidation() {
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;

    let alice = bot.contacts().find("alice").await.unwrap();
    alice.invalidate();
    assert!(!alice.is_ready());
    assert_eq!(alice.name().unwrap(), "Alice");

    alice.sync().await.unwrap();
    assert!(alice.is_ready());
    assert_eq!(calls_with(&puppet, "contact_payload", "alice"), 2);
    assert_eq!(calls_with(&puppet, "contact_payload_dirty", "alice"), 1);
}

#[tokio::test]
async fn test_find_all_fails_fast_and_lossy_skips() {
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;
    let ids = vec!["alice".to_string(), "ghost".to_string(), "bob".to_string()];

    assert!(bot.contacts().find_all(&ids).await.is_err());

    let found = bot.contacts().find_all_lossy(&ids).await;
    let names: Vec<String> = found.iter().map(|c| c.name().unwrap()).collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
}
