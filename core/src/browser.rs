//! chromiumoxide-backed automation driver.
//!
//! One [`ChromiumSession`] wraps one headless browser process with its CDP
//! handler drained on a spawned task. Each job gets a fresh page, closed
//! when the job finishes, so a failed job never poisons the next one.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::EventRequestWillBeSent;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::translate::{BrowserDriver, BrowserSession, TranslateError};

const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches headless Chromium sessions.
pub struct ChromiumDriver {
    args: Vec<String>,
}

impl Default for ChromiumDriver {
    fn default() -> Self {
        Self {
            // Same flags the backend needs in containerized deployments.
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-setuid-sandbox".to_string(),
            ],
        }
    }
}

impl ChromiumDriver {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, TranslateError> {
        let mut builder = BrowserConfig::builder();
        for arg in &self.args {
            builder = builder.arg(arg.clone());
        }
        let config = builder.build().map_err(TranslateError::Backend)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| TranslateError::Backend(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(res) = handler.next().await {
                if let Err(e) = res {
                    debug!(target: "browser", error = %e, "CDP handler event error");
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn scrape_text(
        &mut self,
        url: &str,
        selector: &str,
        wait: Duration,
    ) -> Result<String, TranslateError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| TranslateError::Backend(e.to_string()))?;

        let deadline = Instant::now() + wait;
        let result = wait_for_text(&page, selector, deadline).await;
        if let Err(e) = page.close().await {
            warn!(target: "browser", error = %e, "Failed to close page");
        }
        result
    }

    async fn capture_request(
        &mut self,
        url: &str,
        pattern: &str,
        wait: Duration,
    ) -> Result<String, TranslateError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| TranslateError::Backend(e.to_string()))?;
        let mut requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| TranslateError::Backend(e.to_string()))?;

        // Navigate on a side task so the listener sees requests fired while
        // the page is still loading; the first match wins and the rest of
        // the navigation is abandoned.
        let navigation = {
            let page = page.clone();
            let url = url.to_string();
            tokio::spawn(async move {
                let _ = page.goto(url).await;
            })
        };

        let captured = timeout(wait, async {
            while let Some(event) = requests.next().await {
                if event.request.url.contains(pattern) {
                    return Some(event.request.url.clone());
                }
            }
            None
        })
        .await;

        navigation.abort();
        if let Err(e) = page.close().await {
            warn!(target: "browser", error = %e, "Failed to close page");
        }

        match captured {
            Ok(Some(resource_url)) => Ok(resource_url),
            Ok(None) => Err(TranslateError::Backend(
                "request stream ended".to_string(),
            )),
            Err(_) => Err(TranslateError::Timeout),
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(target: "browser", error = %e, "Browser close failed");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }
}

// Poll for the selector until it yields non-empty text or the deadline
// passes. The selector never appearing means the backend rejected the
// language pair.
async fn wait_for_text(
    page: &Page,
    selector: &str,
    deadline: Instant,
) -> Result<String, TranslateError> {
    loop {
        if let Ok(element) = page.find_element(selector).await {
            if let Ok(Some(text)) = element.inner_text().await {
                if !text.is_empty() {
                    return Ok(text);
                }
            }
        }
        if Instant::now() >= deadline {
            return Err(TranslateError::InvalidLanguage);
        }
        sleep(ELEMENT_POLL_INTERVAL).await;
    }
}
