//! Plugin registry: install order, instance plugins, explicit uninstall.

mod common;

use std::sync::{Arc, Mutex};

use pbot::{plugin_fn, Bot, BotEvent, PluginRegistry, Uninstaller};

use common::{bot_on, ready_bot, seeded_puppet, wait_named, FRIEND_ID};

fn recording_plugin(
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
) -> Arc<dyn pbot::Plugin> {
    plugin_fn(name, move |bot: &Bot| -> Option<Uninstaller> {
        log.lock()
            .unwrap()
            .push(format!("install:{}:{}", name, bot.name()));
        let log = log.clone();
        Some(Box::new(move || {
            log.lock().unwrap().push(format!("uninstall:{}", name));
        }))
    })
}

/// **Test: registry plugins install at build, in registration order**
///
/// Setup: registry with `a` then `b`. Action: build a bot; register `c`; build another bot.
/// Expected: the first bot got `a, b`; the second got `a, b, c`.
#[tokio::test]
async fn test_registry_plugins_install_in_order_at_build() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = PluginRegistry::new();
    registry
        .register(recording_plugin("a", log.clone()))
        .register(recording_plugin("b", log.clone()));

    let puppet = seeded_puppet();
    let first = Bot::builder()
        .name("first")
        .puppet(puppet.clone())
        .plugins(&registry)
        .build()
        .unwrap();
    registry.register(recording_plugin("c", log.clone()));
    let second = Bot::builder()
        .name("second")
        .puppet(puppet)
        .plugins(&registry)
        .build()
        .unwrap();

    assert_eq!(first.plugin_names(), vec!["a", "b"]);
    assert_eq!(second.plugin_names(), vec!["a", "b", "c"]);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "install:a:first",
            "install:b:first",
            "install:a:second",
            "install:b:second",
            "install:c:second",
        ]
    );
    assert_eq!(registry.len(), 3);
}

/// **Test: uninstallers only run when asked**
///
/// Expected: stopping and dropping leave uninstallers untouched; `uninstall_plugins` runs them
/// most recent first, once.
#[tokio::test]
async fn test_uninstallers_run_only_explicitly() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let puppet = seeded_puppet();
    let bot = ready_bot(&puppet).await;
    bot.use_plugin(recording_plugin("first", log.clone()));
    bot.use_plugin(recording_plugin("second", log.clone()));
    bot.use_plugin(plugin_fn("no-teardown", |_bot: &Bot| None));

    bot.stop().await;
    assert!(log
        .lock()
        .unwrap()
        .iter()
        .all(|entry| entry.starts_with("install:")));

    assert_eq!(bot.uninstall_plugins(), 2);
    assert_eq!(bot.uninstall_plugins(), 0);
    let entries = log.lock().unwrap().clone();
    assert_eq!(&entries[2..], &["uninstall:second", "uninstall:first"]);
    assert_eq!(bot.plugin_names(), vec!["first", "second", "no-teardown"]);
}

/// **Test: a plugin can wire behavior onto the bot**
///
/// Setup: ding-dong plugin that answers "ding" with "dong". Action: a friend says "ding".
/// Expected: the bot sends "dong" back to the friend.
#[tokio::test]
async fn test_plugin_listener_replies_to_messages() {
    let puppet = seeded_puppet();
    let bot = bot_on(&puppet);
    bot.use_plugin(plugin_fn("ding-dong", |bot: &Bot| {
        bot.on(|event| {
            if let BotEvent::Message(message) = event {
                if message.text().ok().as_deref() == Some("ding") {
                    let message = message.clone();
                    tokio::spawn(async move {
                        let _ = message.say("dong").await;
                    });
                }
            }
        });
        None
    }));
    bot.start().await;
    bot.ready().await;
    let mut events = bot.subscribe();

    puppet.receive_text(FRIEND_ID, None, "ding");
    wait_named(&mut events, "message").await;

    tokio::time::timeout(common::WAIT, async {
        while !puppet.was_called_with("message_send", FRIEND_ID) {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("reply sent");
}
