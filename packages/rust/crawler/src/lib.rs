//! Breadth-first site crawler with pluggable page rendering.
//!
//! The crawler walks same-origin links from a seed URL in FIFO order,
//! extracts `(title, content)` per page, and appends one immutable record
//! per visited page to a [`ragpipe_dataset::RecordSink`].

pub mod engine;
pub mod extract;
pub mod render;

pub use engine::{CrawlObserver, CrawlSummary, Crawler, SilentObserver};
pub use extract::{Extracted, extract};
pub use render::{HttpRenderer, PageRenderer};
