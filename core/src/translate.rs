//! Translation and translated-speech retrieval over a browser automation
//! session.
//!
//! The translation backend is not a clean API: a page templated as
//! `{base}/#{from}/{to}/{url-encoded text}` is loaded in an automated
//! browser, and the result is either scraped from a CSS-selected element
//! (text translation) or captured from the page's outbound requests
//! (translated speech audio).
//!
//! Jobs are serviced strictly in submission order by one worker task per
//! capability, each owning a single automation session. The session is
//! launched lazily on the first job and torn down once the queue has been
//! idle past a grace window, so a job racing the teardown finds the session
//! still open or triggers a clean relaunch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::queue::AsyncQueue;

/// How a translation job failed. Delivered to the requester as a value,
/// never as a worker panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// The result element never appeared: the language pair was not
    /// accepted by the backend.
    #[error("invalid language code")]
    InvalidLanguage,
    /// The bounded wait expired without a captured resource.
    #[error("translation timed out")]
    Timeout,
    /// Navigation, driver, or session failure.
    #[error("translation backend failure: {0}")]
    Backend(String),
}

/// Launches automation sessions.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, TranslateError>;
}

/// One live automation session (a browser context).
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url`, wait up to `wait` for `selector`, return its text.
    ///
    /// The selector never appearing within the bound means the backend did
    /// not produce a translation: [`TranslateError::InvalidLanguage`].
    async fn scrape_text(
        &mut self,
        url: &str,
        selector: &str,
        wait: Duration,
    ) -> Result<String, TranslateError>;

    /// Navigate to `url` and resolve with the first outbound request URL
    /// matching `pattern`, aborting the page's remaining navigation once
    /// captured. No match within `wait` is [`TranslateError::Timeout`].
    async fn capture_request(
        &mut self,
        url: &str,
        pattern: &str,
        wait: Duration,
    ) -> Result<String, TranslateError>;

    /// Release the session.
    async fn close(&mut self);
}

#[derive(Debug, Clone)]
pub struct TranslateConfig {
    pub base_url: String,
    /// CSS selector identifying the rendered translation.
    pub result_selector: String,
    /// Substring identifying the translated-speech audio request.
    pub speech_pattern: String,
    /// Bounded wait for the selector / captured request.
    pub wait: Duration,
    /// How long a queue may sit empty before its session is closed.
    pub idle_grace: Duration,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("TRANSLATE_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://translate.google.com".to_string()),
            result_selector: ".translation span".to_string(),
            speech_pattern: "translate_tts".to_string(),
            wait: Duration::from_millis(
                std::env::var("TRANSLATE_WAIT_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(10_000),
            ),
            idle_grace: Duration::from_millis(
                std::env::var("TRANSLATE_IDLE_GRACE_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(3_000),
            ),
        }
    }
}

// One unit of automation work. The oneshot sender is the completion
// callback; the worker fulfills it exactly once.
struct AutomationJob {
    url: String,
    reply: oneshot::Sender<Result<String, TranslateError>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobKind {
    Text,
    Speech,
}

impl JobKind {
    fn as_str(self) -> &'static str {
        match self {
            JobKind::Text => "text",
            JobKind::Speech => "speech",
        }
    }
}

// Lifecycle wrapper around one driver session: Closed (None) or Open (Some).
struct AutomationSession {
    driver: Arc<dyn BrowserDriver>,
    session: Option<Box<dyn BrowserSession>>,
}

impl AutomationSession {
    fn is_open(&self) -> bool {
        self.session.is_some()
    }

    async fn open_if_closed(&mut self) -> Result<(), TranslateError> {
        if self.session.is_none() {
            info!(target: "translate", "Launching automation session");
            self.session = Some(self.driver.launch().await?);
        }
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
            info!(target: "translate", "Automation session closed");
        }
    }
}

/// Client for the translation backend. Spawns one worker task per
/// capability (text, speech); each worker drains its own FIFO job queue
/// against its own automation session.
pub struct TranslateClient {
    cfg: TranslateConfig,
    text_queue: Arc<AsyncQueue<AutomationJob>>,
    speech_queue: Arc<AsyncQueue<AutomationJob>>,
}

impl TranslateClient {
    pub fn spawn(driver: Arc<dyn BrowserDriver>, cfg: TranslateConfig) -> Arc<Self> {
        let text_queue = Arc::new(AsyncQueue::new());
        let speech_queue = Arc::new(AsyncQueue::new());
        tokio::spawn(run_worker(
            Arc::clone(&text_queue),
            Arc::clone(&driver),
            JobKind::Text,
            cfg.clone(),
        ));
        tokio::spawn(run_worker(
            Arc::clone(&speech_queue),
            driver,
            JobKind::Speech,
            cfg.clone(),
        ));
        Arc::new(Self {
            cfg,
            text_queue,
            speech_queue,
        })
    }

    /// Translate `text` from `from` to `to`, returning the rendered text.
    pub async fn translate_text(
        &self,
        from: &str,
        to: &str,
        text: &str,
    ) -> Result<String, TranslateError> {
        self.submit(&self.text_queue, from, to, text).await
    }

    /// Retrieve the audio URL for `text` spoken in the `to` language.
    pub async fn translate_speech(
        &self,
        from: &str,
        to: &str,
        text: &str,
    ) -> Result<String, TranslateError> {
        self.submit(&self.speech_queue, from, to, text).await
    }

    async fn submit(
        &self,
        queue: &AsyncQueue<AutomationJob>,
        from: &str,
        to: &str,
        text: &str,
    ) -> Result<String, TranslateError> {
        let (reply, rx) = oneshot::channel();
        queue.push(AutomationJob {
            url: self.page_url(from, to, text),
            reply,
        });
        match rx.await {
            Ok(result) => result,
            // Worker gone mid-job; only happens at shutdown.
            Err(_) => Err(TranslateError::Backend(
                "translation worker stopped".to_string(),
            )),
        }
    }

    fn page_url(&self, from: &str, to: &str, text: &str) -> String {
        format!(
            "{}/#{}/{}/{}",
            self.cfg.base_url.trim_end_matches('/'),
            from,
            to,
            urlencoding::encode(text)
        )
    }
}

// Worker loop: FIFO over one queue, one session. A job failure is replied
// to the requester and never aborts the loop; the session is closed only
// after the queue has been idle past the grace window.
async fn run_worker(
    queue: Arc<AsyncQueue<AutomationJob>>,
    driver: Arc<dyn BrowserDriver>,
    kind: JobKind,
    cfg: TranslateConfig,
) {
    let mut session = AutomationSession {
        driver,
        session: None,
    };
    loop {
        let job = if session.is_open() {
            match timeout(cfg.idle_grace, queue.next_item()).await {
                Ok(Some(job)) => job,
                // Queue stopped or idle grace expired: release the session
                // and go back to an unbounded wait.
                Ok(None) | Err(_) => {
                    session.close().await;
                    continue;
                }
            }
        } else {
            match queue.next_item().await {
                Some(job) => job,
                None => continue,
            }
        };

        debug!(target: "translate", kind = kind.as_str(), url = %job.url, "Serving automation job");
        let result = serve_job(&mut session, kind, &job.url, &cfg).await;
        if let Err(e) = &result {
            warn!(target: "translate", kind = kind.as_str(), url = %job.url, error = %e, "Automation job failed");
        }
        // Receiver gone means the requester stopped waiting; nothing to do.
        let _ = job.reply.send(result);
    }
}

async fn serve_job(
    session: &mut AutomationSession,
    kind: JobKind,
    url: &str,
    cfg: &TranslateConfig,
) -> Result<String, TranslateError> {
    session.open_if_closed().await?;
    let live = match session.session.as_mut() {
        Some(live) => live,
        None => return Err(TranslateError::Backend("session closed".to_string())),
    };
    match kind {
        JobKind::Text => live.scrape_text(url, &cfg.result_selector, cfg.wait).await,
        JobKind::Speech => {
            live.capture_request(url, &cfg.speech_pattern, cfg.wait)
                .await
        }
    }
}
