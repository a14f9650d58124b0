//! Application configuration for ragpipe.
//!
//! User config lives at `~/.ragpipe/ragpipe.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RagpipeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "ragpipe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".ragpipe";

// ---------------------------------------------------------------------------
// Config structs (matching ragpipe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Crawl settings.
    #[serde(default)]
    pub crawl: CrawlSettingsConfig,

    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Dataset converter settings.
    #[serde(default)]
    pub converter: ConverterConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default crawl dataset path.
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,

    /// Number of snippets the research stage retrieves per question.
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            retrieval_k: default_retrieval_k(),
        }
    }
}

fn default_dataset_path() -> String {
    "data/crawl.jsonl".into()
}
fn default_retrieval_k() -> usize {
    10
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettingsConfig {
    /// Milliseconds to let script-driven content settle after navigation.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CrawlSettingsConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_settle_ms() -> u64 {
    2000
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible chat-completions base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,

    /// Completion token cap per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_model() -> String {
    "llama-3.1-70b-versatile".into()
}
fn default_max_tokens() -> u32 {
    400
}

/// `[converter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Character limit applied to prompt, completion, and their sum.
    #[serde(default = "default_char_limit")]
    pub char_limit: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            char_limit: default_char_limit(),
        }
    }
}

fn default_char_limit() -> usize {
    10_000
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Settle delay after navigation, in milliseconds.
    pub settle_ms: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            settle_ms: config.crawl.settle_ms,
            timeout_secs: config.crawl.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.ragpipe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RagpipeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.ragpipe/ragpipe.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RagpipeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| RagpipeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RagpipeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RagpipeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RagpipeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the LLM API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(RagpipeError::config(format!(
            "LLM API key not found. Set the {var_name} environment variable."
        ))),
    }
}
