//! Shared types, error model, and configuration for ragpipe.
//!
//! This crate is the foundation depended on by all other ragpipe crates.
//! It provides:
//! - [`RagpipeError`] — the unified error type
//! - Domain types ([`PageRecord`], [`SessionId`], [`ChatMessage`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConverterConfig, CrawlConfig, CrawlSettingsConfig, DefaultsConfig, LlmConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{RagpipeError, Result};
pub use types::{ChatMessage, MessageRole, PageRecord, SessionId};
