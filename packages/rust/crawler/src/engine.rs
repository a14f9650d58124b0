//! Breadth-first crawl engine.
//!
//! Maintains a visited set and a FIFO frontier seeded with the start URL.
//! Each iteration pops the front, renders the page, extracts content and
//! links, and enqueues unseen same-origin links at the tail. A failed fetch
//! or parse skips that page; the crawl continues with the rest of the
//! frontier.

use std::collections::{HashSet, VecDeque};

use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use ragpipe_dataset::RecordSink;
use ragpipe_shared::{CrawlConfig, PageRecord, Result};

use crate::extract;
use crate::render::{HttpRenderer, PageRenderer};

/// Link extensions never enqueued (binary assets).
const SKIPPED_EXTENSIONS: [&str; 3] = [".pdf", ".jpg", ".png"];

// ---------------------------------------------------------------------------
// CrawlSummary
// ---------------------------------------------------------------------------

/// Summary of a completed crawl operation.
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Pages fetched and emitted as records.
    pub pages_fetched: usize,
    /// Pages skipped after a fetch or parse failure.
    pub pages_skipped: usize,
    /// Errors encountered (URL, error message).
    pub errors: Vec<(String, String)>,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting crawl status.
pub trait CrawlObserver: Send + Sync {
    /// Called when a page is about to be rendered.
    fn page_visited(&self, url: &str, fetched: usize, frontier_len: usize);
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl CrawlObserver for SilentObserver {
    fn page_visited(&self, _url: &str, _fetched: usize, _frontier_len: usize) {}
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Sequential breadth-first crawler over a [`PageRenderer`].
pub struct Crawler<R: PageRenderer> {
    renderer: R,
}

impl Crawler<HttpRenderer> {
    /// Create a crawler backed by the plain-HTTP renderer.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        Ok(Self {
            renderer: HttpRenderer::new(config)?,
        })
    }
}

impl<R: PageRenderer> Crawler<R> {
    /// Create a crawler over a custom renderer implementation.
    pub fn with_renderer(renderer: R) -> Self {
        Self { renderer }
    }

    /// Crawl from `seed`, appending one record per fetched page to `sink`
    /// in visit order.
    ///
    /// Traversal stays within the seed's origin. Fetches are strictly
    /// sequential; the single crawl owns all of its state. Sink failures are
    /// fatal, per-page failures are not.
    #[instrument(skip_all, fields(seed = %seed))]
    pub async fn crawl(
        &self,
        seed: &Url,
        sink: &mut dyn RecordSink,
        observer: &dyn CrawlObserver,
    ) -> Result<CrawlSummary> {
        let origin = seed.origin();
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<Url> = VecDeque::from([seed.clone()]);

        let mut pages_fetched = 0usize;
        let mut pages_skipped = 0usize;
        let mut errors: Vec<(String, String)> = Vec::new();

        info!("starting crawl");

        while let Some(url) = frontier.pop_front() {
            if !visited.insert(normalize_url(&url)) {
                continue;
            }

            observer.page_visited(url.as_str(), pages_fetched, frontier.len());
            debug!(%url, "visiting");

            let html = match self.renderer.render(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(%url, error = %e, "fetch failed, skipping page");
                    errors.push((url.to_string(), e.to_string()));
                    pages_skipped += 1;
                    continue;
                }
            };

            let page = extract::extract(&html);
            sink.append(&PageRecord {
                url: url.to_string(),
                title: page.title,
                content: page.content,
            })?;
            pages_fetched += 1;

            for link in extract_links(&html, &url) {
                if link.origin() != origin {
                    continue;
                }
                if has_skipped_extension(&link) {
                    continue;
                }
                if !visited.contains(&normalize_url(&link)) {
                    frontier.push_back(link);
                }
            }
        }

        let summary = CrawlSummary {
            pages_fetched,
            pages_skipped,
            errors,
        };

        info!(
            pages_fetched = summary.pages_fetched,
            pages_skipped = summary.pages_skipped,
            errors = summary.errors.len(),
            "crawl completed"
        );

        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Link handling
// ---------------------------------------------------------------------------

/// Extract all links from a document, resolved against the base URL.
fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").expect("valid selector");
    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };

        // Skip anchors, javascript:, mailto:
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:")
        {
            continue;
        }

        // Resolve relative URLs and strip fragments
        if let Ok(mut resolved) = base_url.join(href) {
            resolved.set_fragment(None);
            links.push(resolved);
        }
    }

    links
}

/// Check whether a link points at a binary asset the crawl never follows.
fn has_skipped_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Normalize a URL for deduplication (strip fragment, trailing slash).
fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let mut s = normalized.to_string();
    // Remove trailing slash for consistency (except root path)
    if s.ends_with('/') && s.matches('/').count() > 3 {
        s.pop();
    }
    s
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
