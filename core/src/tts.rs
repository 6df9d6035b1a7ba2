//! Text-to-speech HTTP client.
//!
//! The renderer exposes a two-step surface: POST the text and voice to
//! `makemp3.php`, which answers with the name of the generated MP3, then
//! derive the download URL from the `dlmp3.php?mp3=` template. The download
//! URL is what gets queued for voice playback.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{ParrotError, Result};

#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub base_url: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("TTS_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://ttsmp3.com".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MakeMp3Response {
    #[serde(rename = "MP3")]
    mp3: String,
    #[serde(rename = "Error", default)]
    error: Option<i64>,
}

/// HTTP client for the text-to-speech renderer.
///
/// No request timeout is set: the renderer call is a plain round-trip and
/// the playback pipeline tolerates a slow render.
#[derive(Clone)]
pub struct TtsClient {
    http: Client,
    cfg: TtsConfig,
}

impl TtsClient {
    pub fn new(cfg: TtsConfig) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self { http, cfg })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(TtsConfig::default())
    }

    /// Render `text` with `voice` and return the audio download URL.
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<String> {
        let endpoint = format!("{}/makemp3.php", self.base());
        debug!(target: "tts", endpoint = %endpoint, voice = %voice, "Requesting speech render");

        let form = [("msg", text), ("lang", voice), ("source", "ttsmp3")];
        let resp = self.http.post(&endpoint).form(&form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ParrotError::TtsError(format!(
                "renderer returned HTTP {status}"
            )));
        }
        let body: MakeMp3Response = resp.json().await?;
        if let Some(code) = body.error {
            if code != 0 {
                return Err(ParrotError::TtsError(format!(
                    "renderer reported error {code}"
                )));
            }
        }
        Ok(download_url(self.base(), &body.mp3))
    }

    fn base(&self) -> &str {
        self.cfg.base_url.trim_end_matches('/')
    }
}

fn download_url(base: &str, mp3: &str) -> String {
    format!("{base}/dlmp3.php?mp3={mp3}")
}
