// Parrot Core Library
// Voice-channel TTS & translation chat-bot runtime

pub mod chat;
pub mod commands;
pub mod queue;
pub mod settings;
pub mod translate;
pub mod tts;
pub mod voice;

#[cfg(feature = "browser")]
pub mod browser;

// Export core types
pub use chat::{Actor, Capability, ChatMessage, ChatPort, VoiceConnection};
pub use commands::Bot;
pub use queue::AsyncQueue;
pub use settings::Settings;
pub use translate::{
    BrowserDriver, BrowserSession, TranslateClient, TranslateConfig, TranslateError,
};
pub use tts::{TtsClient, TtsConfig};
pub use voice::{JoinError, LeaveError, PlaybackWorker};

#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParrotError {
    #[error("Chat error: {0}")]
    ChatError(String),

    #[error("Voice error: {0}")]
    VoiceError(String),

    #[error("TTS error: {0}")]
    TtsError(String),

    #[error("Settings error: {0}")]
    SettingsError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, ParrotError>;
