//! Application configuration for ContentForge.
//!
//! User config lives at `~/.contentforge/contentforge.toml`.
//! CLI flags override config file values, which override defaults.
//! Credentials are never written here, only the env var names that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContentForgeError, Result};
use crate::types::ApiKey;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "contentforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".contentforge";

// ---------------------------------------------------------------------------
// Config structs (matching contentforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Extraction/search provider settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Language-model provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Prompt and fan-out tuning.
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Endpoint that turns a URL into content, links and images.
    #[serde(default = "default_reader_url")]
    pub reader_url: String,

    /// Endpoint that returns snippets for a query.
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_extraction_key_env")]
    pub api_key_env: String,

    /// Per-request timeout.
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            reader_url: default_reader_url(),
            search_url: default_search_url(),
            api_key_env: default_extraction_key_env(),
            timeout_secs: default_extraction_timeout(),
        }
    }
}

fn default_reader_url() -> String {
    "https://r.jina.ai/".into()
}
fn default_search_url() -> String {
    "https://s.jina.ai/".into()
}
fn default_extraction_key_env() -> String {
    "JINA_API_KEY".into()
}
fn default_extraction_timeout() -> u64 {
    60
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model used for both outline and section requests.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,

    /// Required prefix for model provider keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Per-request timeout.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_model(),
            api_key_env: default_llm_key_env(),
            key_prefix: default_key_prefix(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_llm_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_key_prefix() -> String {
    "sk-".into()
}
fn default_llm_timeout() -> u64 {
    120
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Characters of website content kept in the outline prompt.
    #[serde(default = "default_outline_context_chars")]
    pub outline_context_chars: usize,

    /// Characters of related content kept in each section prompt.
    #[serde(default = "default_section_context_chars")]
    pub section_context_chars: usize,

    /// Sampling temperature for every completion.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Output token cap for the outline request.
    #[serde(default = "default_outline_max_tokens")]
    pub outline_max_tokens: u32,

    /// Output token cap for each section request.
    #[serde(default = "default_section_max_tokens")]
    pub section_max_tokens: u32,

    /// Maximum section requests in flight at once.
    #[serde(default = "default_section_concurrency")]
    pub section_concurrency: usize,

    /// Fetch the website and search related content at the same time.
    #[serde(default)]
    pub parallel_prefetch: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            outline_context_chars: default_outline_context_chars(),
            section_context_chars: default_section_context_chars(),
            temperature: default_temperature(),
            outline_max_tokens: default_outline_max_tokens(),
            section_max_tokens: default_section_max_tokens(),
            section_concurrency: default_section_concurrency(),
            parallel_prefetch: false,
        }
    }
}

fn default_outline_context_chars() -> usize {
    2000
}
fn default_section_context_chars() -> usize {
    1500
}
fn default_temperature() -> f32 {
    0.7
}
fn default_outline_max_tokens() -> u32 {
    500
}
fn default_section_max_tokens() -> u32 {
    1000
}
fn default_section_concurrency() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub reader_url: String,
    pub search_url: String,
    pub extraction_timeout_secs: u64,
    pub llm_base_url: String,
    pub model: String,
    pub key_prefix: String,
    pub llm_timeout_secs: u64,
    pub outline_context_chars: usize,
    pub section_context_chars: usize,
    pub temperature: f32,
    pub outline_max_tokens: u32,
    pub section_max_tokens: u32,
    /// Always at least 1.
    pub section_concurrency: usize,
    pub parallel_prefetch: bool,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            reader_url: config.extraction.reader_url.clone(),
            search_url: config.extraction.search_url.clone(),
            extraction_timeout_secs: config.extraction.timeout_secs,
            llm_base_url: config.llm.base_url.clone(),
            model: config.llm.model.clone(),
            key_prefix: config.llm.key_prefix.clone(),
            llm_timeout_secs: config.llm.timeout_secs,
            outline_context_chars: config.generation.outline_context_chars,
            section_context_chars: config.generation.section_context_chars,
            temperature: config.generation.temperature,
            outline_max_tokens: config.generation.outline_max_tokens,
            section_max_tokens: config.generation.section_max_tokens,
            section_concurrency: config.generation.section_concurrency.max(1),
            parallel_prefetch: config.generation.parallel_prefetch,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.contentforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ContentForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.contentforge/contentforge.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| ContentForgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ContentForgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ContentForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ContentForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ContentForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a credential from the named env var. Missing or empty yields `None`,
/// leaving the "please enter" message to request validation.
pub fn api_key_from_env(var_name: &str) -> Option<ApiKey> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Some(ApiKey::new(val)),
        _ => None,
    }
}
