mod config;
mod console;

use std::sync::Arc;

use config::BotConfig;
use console::ConsoleChat;
use parrot_core::{
    Bot, ChatMessage, ChromiumDriver, PlaybackWorker, Settings, TranslateClient, TtsClient,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,parrot_core=info,parrot_bot=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        target: "parrot_bot",
        "Starting Parrot bot demo: console chat -> TTS / translation -> local playback"
    );

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = BotConfig::load();

    let settings = Arc::new(Settings::load_or_default(&cfg.settings_path)?);
    let tts = TtsClient::new(cfg.tts.clone())?;
    let translate = TranslateClient::spawn(
        Arc::new(ChromiumDriver::default()),
        cfg.translate.clone(),
    );
    let chat = ConsoleChat::new();
    let playback = PlaybackWorker::new(chat.clone());
    let bot = Bot::new(chat, settings, playback, tts, translate);

    info!(target: "parrot_bot", "Type commands (default prefix '!'), Ctrl+C to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_id: u64 = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                next_id += 1;
                let msg = ChatMessage {
                    channel: "console".to_string(),
                    id: next_id.to_string(),
                    author: "operator".to_string(),
                    author_voice: Some("console".to_string()),
                    content: line,
                };
                if let Err(e) = bot.handle_message(&msg).await {
                    error!(target: "parrot_bot", error = %e, "Failed to handle message");
                }
            }
            _ = signal::ctrl_c() => {
                info!(target: "parrot_bot", "Shutting down...");
                break;
            }
        }
    }

    Ok(())
}
