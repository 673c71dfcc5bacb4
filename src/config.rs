//! TOML configuration with environment overrides.
//!
//! Every section is optional; a missing config file yields [`Config::default`].
//! The model provider credentials come from the environment (after `.env` is
//! loaded) and are read exactly once, in [`load_config`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the model provider API key.
pub const ENV_API_KEY: &str = "COMMET_API_KEY";
/// Environment variable overriding the model provider base URL.
pub const ENV_API_BASE: &str = "COMMET_API_BASE_URL";

pub const DEFAULT_API_BASE: &str = "https://api.cometapi.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash-lite";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Origins allowed by CORS. `"*"` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_allowed_origins(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}
fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

/// Chat-completion provider settings. Shared by the embedding client for
/// the base URL and key, since both talk to the same OpenAI-compatible API.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Never read from the TOML file; filled from [`ENV_API_KEY`].
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            chat_model: default_chat_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    10_000
}
fn default_overlap_chars() -> usize {
    1_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Results per index when searching every index in the session.
    #[serde(default = "default_k_all")]
    pub k_all: usize,
    /// Results when a single file is selected.
    #[serde(default = "default_k_selected")]
    pub k_selected: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k_all: default_k_all(),
            k_selected: default_k_selected(),
        }
    }
}

fn default_k_all() -> usize {
    4
}
fn default_k_selected() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

fn default_max_attempts() -> u32 {
    6
}
fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_multiplier() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_root")]
    pub root: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: default_index_root(),
        }
    }
}

fn default_index_root() -> PathBuf {
    PathBuf::from("./data/indexes")
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    /// Leading characters of each raw file placed in the chat context.
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            context_chars: default_context_chars(),
        }
    }
}

fn default_context_chars() -> usize {
    1_500
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummaryConfig {
    #[serde(default = "default_condense_chars")]
    pub condense_chars: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            condense_chars: default_condense_chars(),
        }
    }
}

fn default_condense_chars() -> usize {
    800
}

/// Load configuration from `path` (if it exists), then apply environment
/// overrides and validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let _ = dotenvy::dotenv();

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        Config::default()
    };

    if let Ok(key) = std::env::var(ENV_API_KEY) {
        if !key.trim().is_empty() {
            config.model.api_key = Some(key);
        }
    }
    if let Ok(base) = std::env::var(ENV_API_BASE) {
        if !base.trim().is_empty() {
            config.model.api_base = base;
        }
    }

    validate(&config)?;
    Ok(config)
}

/// Parse TOML content without touching the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.max_chars {
        anyhow::bail!("chunking.overlap_chars must be smaller than chunking.max_chars");
    }

    if config.retrieval.k_all == 0 || config.retrieval.k_selected == 0 {
        anyhow::bail!("retrieval.k_all and retrieval.k_selected must be >= 1");
    }

    if config.retry.max_attempts == 0 {
        anyhow::bail!("retry.max_attempts must be >= 1");
    }
    if config.retry.multiplier == 0 {
        anyhow::bail!("retry.multiplier must be >= 1");
    }

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(())
}
