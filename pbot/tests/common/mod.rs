//! Shared helpers for pbot integration tests: a seeded mock backend, bot construction and
//! event waiting with timeouts.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pbot::{Bot, BotEvent, ContactPayload, RoomPayload};
use puppet_mock::MockPuppet;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

pub const SELF_ID: &str = "mock-self";
pub const FRIEND_ID: &str = "mock-friend";
pub const ROOM_ID: &str = "mock-room";
pub const WAIT: Duration = Duration::from_secs(2);

/// Demo backend plus two more contacts (`alice`, `bob`) and a room `team` with all four members.
pub fn seeded_puppet() -> Arc<MockPuppet> {
    let puppet = MockPuppet::demo();
    puppet.add_contact(ContactPayload::new("alice", "Alice"));
    puppet.add_contact(ContactPayload::new("bob", "Bob"));
    puppet.add_room(RoomPayload::new(
        "team",
        "Team",
        vec![
            SELF_ID.to_string(),
            FRIEND_ID.to_string(),
            "alice".to_string(),
            "bob".to_string(),
        ],
    ));
    Arc::new(puppet)
}

/// Routes bot logs to the test output; filter with `RUST_LOG`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Builds a bot on `puppet` without starting it.
pub fn bot_on(puppet: &Arc<MockPuppet>) -> Bot {
    init_test_tracing();
    Bot::builder()
        .name("test-bot")
        .puppet(puppet.clone())
        .build()
        .expect("bot builds")
}

/// Builds, starts and waits for the bot to become ready.
pub async fn ready_bot(puppet: &Arc<MockPuppet>) -> Bot {
    let bot = bot_on(puppet);
    bot.start().await;
    timeout(WAIT, bot.ready())
        .await
        .expect("bot should become ready");
    bot
}

/// Number of recorded `op` calls whose argument is `arg`.
pub fn calls_with(puppet: &MockPuppet, op: &str, arg: &str) -> usize {
    puppet
        .calls()
        .iter()
        .filter(|c| c.op == op && c.arg == arg)
        .count()
}

/// Waits for the first event matching `pred`, skipping the others.
pub async fn wait_for<F>(rx: &mut UnboundedReceiver<BotEvent>, mut pred: F) -> BotEvent
where
    F: FnMut(&BotEvent) -> bool,
{
    timeout(WAIT, async {
        loop {
            let event = rx.recv().await.expect("event channel open");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Waits for the next event with the given name.
pub async fn wait_named(rx: &mut UnboundedReceiver<BotEvent>, name: &str) -> BotEvent {
    wait_for(rx, |e| e.name() == name).await
}

/// Collects the names of every event that arrives within `window`.
pub async fn drain_names(rx: &mut UnboundedReceiver<BotEvent>, window: Duration) -> Vec<&'static str> {
    tokio::time::sleep(window).await;
    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name());
    }
    names
}
