//! Command parsing and dispatch.
//!
//! Messages are prefixed text commands (`!tts Brian hello ...`). The parser
//! splits on the first space; everything after it is the argument vector.
//! Handlers reply to the requester on the message's channel: user-input
//! mistakes and external-service failures are chat replies, never crashes.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::chat::{Actor, Capability, ChatMessage, ChatPort};
use crate::settings::Settings;
use crate::translate::{TranslateClient, TranslateError};
use crate::tts::TtsClient;
use crate::voice::{JoinError, PlaybackWorker};
use crate::Result;

const DEFAULT_PREFIX: &str = "!";

/// The bot: shared components plus the command surface over them.
pub struct Bot {
    chat: Arc<dyn ChatPort>,
    settings: Arc<Settings>,
    playback: Arc<PlaybackWorker>,
    tts: TtsClient,
    translate: Arc<TranslateClient>,
}

impl Bot {
    pub fn new(
        chat: Arc<dyn ChatPort>,
        settings: Arc<Settings>,
        playback: Arc<PlaybackWorker>,
        tts: TtsClient,
        translate: Arc<TranslateClient>,
    ) -> Self {
        Self {
            chat,
            settings,
            playback,
            tts,
            translate,
        }
    }

    /// Handle one incoming message. Non-command messages are ignored.
    ///
    /// The returned error is a chat-transport failure only; command-level
    /// problems are replied to the requester.
    pub async fn handle_message(&self, msg: &ChatMessage) -> Result<()> {
        let prefix = self
            .settings
            .get_str("prefix")
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let Some((command, args)) = parse_command(&msg.content, &prefix) else {
            return Ok(());
        };
        debug!(target: "commands", command = %command, author = %msg.author, "Dispatching command");

        match command {
            "ping" => self.reply(msg, "Pong!").await,
            "config" => self.cmd_config(msg, &args, &prefix).await,
            "join" => self.cmd_join(msg).await,
            "leave" => self.cmd_leave(msg).await,
            "tts" => self.cmd_tts(msg, &args, &prefix).await,
            "trs" => self.cmd_trs(msg, &args, &prefix).await,
            "tr" => self.cmd_tr(msg, &args, &prefix).await,
            "help" => self.cmd_help(msg, &prefix).await,
            unknown => {
                self.reply(msg, &format!("No command '{unknown}' found!"))
                    .await
            }
        }
    }

    async fn reply(&self, msg: &ChatMessage, text: &str) -> Result<()> {
        self.chat.send_message(&msg.channel, text).await
    }

    async fn cmd_config(&self, msg: &ChatMessage, args: &[&str], prefix: &str) -> Result<()> {
        // The settings file holds the platform token; reading is gated the
        // same as writing.
        let allowed = self
            .chat
            .has_capability(&msg.channel, Actor::User(&msg.author), Capability::ManageGuild)
            .await;
        if !allowed {
            return self
                .reply(msg, "You don't have permission to do that!")
                .await;
        }

        match args {
            ["get", name] => match self.settings.get(name) {
                Some(value) => {
                    self.reply(msg, &format!("{} = {}", name, fmt_value(&value)))
                        .await
                }
                None => self.reply(msg, &format!("No option '{name}' set!")).await,
            },
            ["set", name, rest @ ..] if !rest.is_empty() => {
                self.settings
                    .set(*name, Value::String(rest.join(" ")));
                if let Err(e) = self.settings.persist() {
                    warn!(target: "commands", error = %e, "Settings persistence failed");
                }
                self.reply(msg, &format!("Option '{name}' updated!")).await
            }
            _ => {
                self.reply(
                    msg,
                    &format!("Usage: {prefix}config get <name> | {prefix}config set <name> <value>"),
                )
                .await
            }
        }
    }

    async fn cmd_join(&self, msg: &ChatMessage) -> Result<()> {
        match self.playback.join(msg).await {
            Ok(()) => self.reply(msg, "Joined your voice channel!").await,
            Err(e) => self.reply(msg, &e.to_string()).await,
        }
    }

    async fn cmd_leave(&self, msg: &ChatMessage) -> Result<()> {
        match self.playback.leave(msg).await {
            Ok(()) => self.reply(msg, "Left the voice channel!").await,
            Err(e) => self.reply(msg, &e.to_string()).await,
        }
    }

    async fn cmd_tts(&self, msg: &ChatMessage, args: &[&str], prefix: &str) -> Result<()> {
        let [voice, text @ ..] = args else {
            return self
                .reply(msg, &format!("Usage: {prefix}tts <voice> <text>"))
                .await;
        };
        if text.is_empty() {
            return self
                .reply(msg, &format!("Usage: {prefix}tts <voice> <text>"))
                .await;
        }
        // Join before rendering: a failed join must leave nothing queued
        // and nothing rendered.
        if let Err(e) = self.ensure_connected(msg).await {
            return self.reply(msg, &e.to_string()).await;
        }

        match self.tts.synthesize(&text.join(" "), voice).await {
            Ok(audio_url) => self.enqueue_and_tidy(msg, audio_url).await,
            Err(e) => {
                self.reply(msg, &format!("Speech rendering failed: {e}"))
                    .await
            }
        }
    }

    async fn cmd_trs(&self, msg: &ChatMessage, args: &[&str], prefix: &str) -> Result<()> {
        let [from, to, text @ ..] = args else {
            return self
                .reply(msg, &format!("Usage: {prefix}trs <from> <to> <text>"))
                .await;
        };
        if text.is_empty() {
            return self
                .reply(msg, &format!("Usage: {prefix}trs <from> <to> <text>"))
                .await;
        }
        if let Err(e) = self.ensure_connected(msg).await {
            return self.reply(msg, &e.to_string()).await;
        }

        match self.translate.translate_speech(from, to, &text.join(" ")).await {
            Ok(audio_url) => self.enqueue_and_tidy(msg, audio_url).await,
            Err(TranslateError::InvalidLanguage) => {
                self.reply(msg, "Invalid language code!").await
            }
            Err(e) => self.reply(msg, &format!("Translation failed: {e}")).await,
        }
    }

    async fn cmd_tr(&self, msg: &ChatMessage, args: &[&str], prefix: &str) -> Result<()> {
        let [from, to, text @ ..] = args else {
            return self
                .reply(msg, &format!("Usage: {prefix}tr <from> <to> <text>"))
                .await;
        };
        if text.is_empty() {
            return self
                .reply(msg, &format!("Usage: {prefix}tr <from> <to> <text>"))
                .await;
        }

        match self.translate.translate_text(from, to, &text.join(" ")).await {
            Ok(translation) => self.reply(msg, &translation).await,
            Err(TranslateError::InvalidLanguage) => {
                self.reply(msg, "Invalid language code!").await
            }
            Err(e) => self.reply(msg, &format!("Translation failed: {e}")).await,
        }
    }

    async fn cmd_help(&self, msg: &ChatMessage, prefix: &str) -> Result<()> {
        let help = format!(
            "Commands:\n\
             {prefix}ping - check that I'm alive\n\
             {prefix}config get <name> / {prefix}config set <name> <value>\n\
             {prefix}join - join your voice channel\n\
             {prefix}leave - leave the voice channel\n\
             {prefix}tts <voice> <text> - speak text in your voice channel\n\
             {prefix}trs <from> <to> <text> - speak a translation\n\
             {prefix}tr <from> <to> <text> - translate text\n\
             {prefix}help - this message"
        );
        self.reply(msg, &help).await
    }

    async fn ensure_connected(&self, msg: &ChatMessage) -> std::result::Result<(), JoinError> {
        if self.playback.is_connected().await {
            return Ok(());
        }
        self.playback.join(msg).await
    }

    async fn enqueue_and_tidy(&self, msg: &ChatMessage, audio_url: String) -> Result<()> {
        if let Err(e) = self.playback.enqueue(msg, audio_url).await {
            return self.reply(msg, &e.to_string()).await;
        }
        // Keep the text channel clean; platforms may refuse and that's fine.
        if let Err(e) = self.chat.delete_message(&msg.channel, &msg.id).await {
            debug!(target: "commands", error = %e, "Could not delete invoking message");
        }
        Ok(())
    }
}

fn fmt_value(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// Split a prefixed message into command and argument vector.
///
/// Mirrors the platform convention: the first space ends the command name,
/// arguments are space-separated and may be empty when the user doubles a
/// space (joining them back with spaces restores the original text).
fn parse_command<'a>(content: &'a str, prefix: &str) -> Option<(&'a str, Vec<&'a str>)> {
    let rest = content.strip_prefix(prefix)?;
    match rest.split_once(' ') {
        None => Some((rest, Vec::new())),
        Some((command, arguments)) => Some((command, arguments.split(' ').collect())),
    }
}
