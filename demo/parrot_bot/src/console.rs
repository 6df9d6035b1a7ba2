//! Console chat adapter for local end-to-end runs.
//!
//! Stands in for a real chat platform: replies are printed, the operator is
//! trusted with every permission, and "voice playback" hands the audio URL
//! to a local player binary when one is on PATH (ffplay, mpv, cvlc), else
//! just logs it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parrot_core::{Actor, Capability, ChatPort, ParrotError, VoiceConnection};
use tokio::process::Command;
use tracing::{debug, info};

pub struct ConsoleChat;

impl ConsoleChat {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl ChatPort for ConsoleChat {
    async fn send_message(&self, channel: &str, text: &str) -> parrot_core::Result<()> {
        info!(target: "chat", channel = %channel, "{}", text);
        Ok(())
    }

    async fn delete_message(&self, _channel: &str, message_id: &str) -> parrot_core::Result<()> {
        debug!(target: "chat", message_id = %message_id, "delete_message is a no-op on the console");
        Ok(())
    }

    async fn join_voice(
        &self,
        destination: &str,
    ) -> parrot_core::Result<Arc<dyn VoiceConnection>> {
        let player = select_player();
        match &player {
            Some(bin) => info!(target: "chat", player = ?bin, "Using local audio player"),
            None => info!(target: "chat", "No local audio player found; playback will be logged only"),
        }
        Ok(Arc::new(ConsolePlayback {
            destination: destination.to_string(),
            player,
        }))
    }

    async fn has_capability(
        &self,
        _destination: &str,
        _actor: Actor<'_>,
        _capability: Capability,
    ) -> bool {
        // The local operator owns the process.
        true
    }
}

struct ConsolePlayback {
    destination: String,
    player: Option<PathBuf>,
}

#[async_trait]
impl VoiceConnection for ConsolePlayback {
    fn destination(&self) -> &str {
        &self.destination
    }

    async fn play(&self, audio_url: &str) -> parrot_core::Result<()> {
        let Some(bin) = &self.player else {
            info!(target: "chat", url = %audio_url, "Would play audio");
            return Ok(());
        };
        let status = player_command(bin, audio_url).status().await?;
        if !status.success() {
            return Err(ParrotError::VoiceError(format!(
                "player exited with {status}"
            )));
        }
        Ok(())
    }

    async fn disconnect(&self) -> parrot_core::Result<()> {
        info!(target: "chat", destination = %self.destination, "Disconnected");
        Ok(())
    }
}

fn player_command(bin: &Path, audio_url: &str) -> Command {
    let name = bin.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let mut cmd = Command::new(bin);
    match name {
        "ffplay" => {
            cmd.arg("-autoexit")
                .arg("-nodisp")
                .arg("-loglevel")
                .arg("quiet")
                .arg(audio_url);
        }
        "mpv" => {
            cmd.arg("--no-video").arg("--really-quiet").arg(audio_url);
        }
        _ => {
            cmd.arg(audio_url);
        }
    }
    cmd
}

fn select_player() -> Option<PathBuf> {
    for candidate in ["ffplay", "mpv", "cvlc"] {
        if let Some(path) = get_from_path(candidate) {
            return Some(path);
        }
    }
    None
}

fn get_from_path(bin: &str) -> Option<PathBuf> {
    if let Ok(paths) = std::env::var("PATH") {
        let path_separator = if cfg!(windows) { ';' } else { ':' };
        for dir in paths.split(path_separator) {
            let candidate = Path::new(dir).join(bin);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}
