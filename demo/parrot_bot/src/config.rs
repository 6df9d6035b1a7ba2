use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parrot_core::{TranslateConfig, TtsConfig};

/// High-level configuration for the Parrot bot demo
#[derive(Clone, Debug)]
pub struct BotConfig {
    /// Path of the flat key-value settings file (prefix, token, ...)
    pub settings_path: PathBuf,
    pub tts: TtsConfig,
    pub translate: TranslateConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            settings_path: std::env::var("PARROT_SETTINGS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config.json")),
            tts: TtsConfig::default(),
            translate: TranslateConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a TOML file (path via PARROT_BOT_CONFIG or
    /// ./parrot_bot.toml), overlaying values onto sane defaults and
    /// env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path =
            std::env::var("PARROT_BOT_CONFIG").unwrap_or_else(|_| "parrot_bot.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "parrot_bot", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match toml::from_str::<BotToml>(&s) {
                Ok(t) => t.overlay(default),
                Err(e) => {
                    tracing::warn!(target: "parrot_bot", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "parrot_bot", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct BotToml {
    pub settings_path: Option<PathBuf>,
    pub tts: Option<TtsToml>,
    pub translate: Option<TranslateToml>,
}

impl BotToml {
    fn overlay(self, mut base: BotConfig) -> BotConfig {
        if let Some(p) = self.settings_path {
            base.settings_path = p;
        }
        if let Some(t) = self.tts {
            t.apply(&mut base.tts);
        }
        if let Some(t) = self.translate {
            t.apply(&mut base.translate);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct TtsToml {
    pub base_url: Option<String>,
}
impl TtsToml {
    fn apply(self, t: &mut TtsConfig) {
        if let Some(v) = self.base_url {
            t.base_url = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct TranslateToml {
    pub base_url: Option<String>,
    pub result_selector: Option<String>,
    pub speech_pattern: Option<String>,
    pub wait_ms: Option<u64>,
    pub idle_grace_ms: Option<u64>,
}
impl TranslateToml {
    fn apply(self, t: &mut TranslateConfig) {
        if let Some(v) = self.base_url {
            t.base_url = v;
        }
        if let Some(v) = self.result_selector {
            t.result_selector = v;
        }
        if let Some(v) = self.speech_pattern {
            t.speech_pattern = v;
        }
        if let Some(v) = self.wait_ms {
            t.wait = Duration::from_millis(v);
        }
        if let Some(v) = self.idle_grace_ms {
            t.idle_grace = Duration::from_millis(v);
        }
    }
}
