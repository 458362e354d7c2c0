//! Chat-completion client for the language-model provider.
//!
//! Only what the pipeline needs: one system + one user message in, the text of
//! the first choice out. The [`ChatModel`] trait is the seam the pipeline and
//! its tests program against.

mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use contentforge_shared::{ApiKey, ContentForgeError, PipelineConfig, Result};

pub use types::{CompletionRequest, Message, Usage};

use types::{ChatRequest, ChatResponseRaw, ErrorEnvelope};

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("ContentForge/", env!("CARGO_PKG_VERSION"));

/// Anything that can answer a single-turn chat completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Text of the first choice, or an empty string when the provider
    /// returned no content.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Model name, endpoint and timeout for [`ChatClient`].
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl From<&PipelineConfig> for ChatSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            base_url: config.llm_base_url.clone(),
            model: config.model.clone(),
            timeout_secs: config.llm_timeout_secs,
        }
    }
}

/// OpenAI-compatible chat-completion client bound to one run's credential.
#[derive(Clone)]
pub struct ChatClient {
    http_client: Client,
    api_key: ApiKey,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl ChatClient {
    pub fn new(settings: &ChatSettings, api_key: ApiKey) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ContentForgeError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            timeout_secs: settings.timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let start = std::time::Instant::now();
        let body = ChatRequest::new(&self.model, request);

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "chat completion request failed");
                if e.is_timeout() {
                    ContentForgeError::timeout("chat completion", self.timeout_secs)
                } else {
                    ContentForgeError::Provider(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let from_body = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|env| env.error)
                .and_then(|detail| detail.message)
                .filter(|m| !m.trim().is_empty());
            let message = from_body.unwrap_or_else(|| match status.canonical_reason() {
                Some(reason) => format!("{} {reason}", status.as_u16()),
                None => status.as_u16().to_string(),
            });
            warn!(%status, %message, "chat completion rejected");
            return Err(ContentForgeError::Provider(message));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| ContentForgeError::Provider(format!("malformed response: {e}")))?;

        let usage = raw.usage.unwrap_or_default();
        debug!(
            model = %self.model,
            tokens_in = usage.prompt_tokens,
            tokens_out = usage.completion_tokens,
            duration_ms = start.elapsed().as_millis(),
            "chat completion"
        );

        Ok(raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
