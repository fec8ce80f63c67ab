//! pbot CLI: run a bot against a configured backend, print its timeline.

use anyhow::{Context, Result};
use clap::Parser;
use pbot::{Bot, BotConfig, PaginationRequest};
use pbot_cli::{describe, load_config, resolver, Cli, Commands};
use pbot_core::init_tracing;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { name } => {
            let config = load_config(name)?;
            handle_run(config).await
        }
        Commands::Timeline {
            name,
            page_size,
            page_token,
        } => {
            let config = load_config(name)?;
            handle_timeline(config, page_size, page_token).await
        }
    }
}

fn build_bot(config: BotConfig) -> Result<Bot> {
    init_tracing(&config.log_file).context("Initialize logging (check LOG_FILE)")?;
    let bot = Bot::builder()
        .config(config)
        .resolver(resolver())
        .build()
        .context("Build bot from config")?;
    bot.on(|event| match event {
        pbot::BotEvent::Error(_) => error!(event = %describe(event), "bot event"),
        _ => info!(event = %describe(event), "bot event"),
    });
    Ok(bot)
}

/// Starts the bot, runs until Ctrl-C, then stops it.
async fn handle_run(config: BotConfig) -> Result<()> {
    let bot = build_bot(config)?;
    bot.start().await;
    info!(bot = %bot.name(), "Bot running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Listen for Ctrl-C")?;

    bot.stop().await;
    Ok(())
}

/// Starts the bot, waits for ready, prints one timeline page.
async fn handle_timeline(
    config: BotConfig,
    page_size: Option<usize>,
    page_token: Option<String>,
) -> Result<()> {
    let bot = build_bot(config)?;
    bot.start().await;
    tokio::time::timeout(std::time::Duration::from_secs(30), bot.ready())
        .await
        .context("Bot did not become ready within 30s")?;

    let page = bot
        .timeline(PaginationRequest {
            page_size,
            page_token,
        })
        .await
        .context("List timeline")?;

    if page.posts.is_empty() {
        println!("No posts.");
    }
    for post in &page.posts {
        let date = post
            .date()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!(
            "{:<12} {:<20} {}",
            post.id(),
            date,
            post.text().ok().flatten().unwrap_or_default()
        );
    }
    if let Some(token) = page.next_page_token {
        println!("next page token: {}", token);
    }

    bot.stop().await;
    Ok(())
}
