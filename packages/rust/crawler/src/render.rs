//! Page rendering seam.
//!
//! The crawler drives anything that can navigate to a URL, wait for
//! script-driven content to settle, and hand back the rendered markup.
//! [`HttpRenderer`] is the plain-HTTP implementation; a headless browser
//! can satisfy the same contract behind [`PageRenderer`].

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use ragpipe_shared::{CrawlConfig, RagpipeError, Result};

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("ragpipe/", env!("CARGO_PKG_VERSION"));

/// Navigate to a URL, let content settle, return the rendered markup.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &Url) -> Result<String>;
}

/// HTTP-backed renderer.
///
/// Fetches the page body and then holds for a fixed settle delay, standing in
/// for a browser's script execution window; the delay also paces the crawl.
pub struct HttpRenderer {
    client: reqwest::Client,
    settle: Duration,
}

impl HttpRenderer {
    /// Build a renderer from crawl settings.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagpipeError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            settle: Duration::from_millis(config.settle_ms),
        })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| RagpipeError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RagpipeError::Fetch(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RagpipeError::Fetch(format!("{url}: body read failed: {e}")))?;

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        Ok(body)
    }
}
