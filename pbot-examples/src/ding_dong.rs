use anyhow::Result;
use chrono::Local;
use pbot::{plugin_fn, Bot, BotEvent};
use pbot_core::init_tracing;
use puppet_mock::MockPuppet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let log_file = "logs/ding-dong-bot.log";
    init_tracing(log_file)?;

    let puppet = Arc::new(MockPuppet::demo());
    let bot = Bot::builder()
        .name("ding-dong")
        .puppet(puppet.clone())
        .build()?;
    info!(start_time = %Local::now().format("%Y-%m-%d %H:%M:%S"), log_file = %log_file, "Ding-dong Bot started");

    bot.use_plugin(plugin_fn("ding-dong", |bot: &Bot| {
        bot.on(|event| {
            let BotEvent::Message(message) = event else {
                return;
            };
            if message.is_self().unwrap_or(true) || message.text().ok().as_deref() != Some("ding") {
                return;
            }
            let message = message.clone();
            tokio::spawn(async move {
                match message.say("dong").await {
                    Ok(_) => info!(message_id = %message.id(), "Sent dong"),
                    Err(e) => error!(message_id = %message.id(), error = %e, "Failed to send dong"),
                }
            });
        });
        None
    }));

    bot.start().await;
    tokio::time::timeout(Duration::from_secs(5), bot.ready()).await?;

    // The mock backend has no real network; play a friend saying "ding".
    puppet.receive_text("mock-friend", None, "ding");
    puppet.receive_text("mock-friend", Some("mock-room"), "ding");
    tokio::time::sleep(Duration::from_millis(200)).await;

    info!(replies = puppet.call_count("message_send"), "Ding-dong Bot done");
    bot.stop().await;
    Ok(())
}
