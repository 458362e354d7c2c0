//! HTTP client for the reader (`fetch`) and search endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use contentforge_shared::{
    ApiKey, ContentForgeError, LabeledUrls, PipelineConfig, RelatedContentBundle, Result,
    SourceDocument,
};

use crate::ContentSource;

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("ContentForge/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Endpoints and timeout for the extraction provider.
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    pub reader_url: String,
    pub search_url: String,
    pub timeout_secs: u64,
}

impl From<&PipelineConfig> for ReaderSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            reader_url: config.reader_url.clone(),
            search_url: config.search_url.clone(),
            timeout_secs: config.extraction_timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FetchEnvelope {
    data: Option<FetchData>,
}

#[derive(Debug, Deserialize)]
struct FetchData {
    content: Option<String>,
    images: Option<Value>,
    links: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    data: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    content: Option<String>,
}

/// Error payload some provider responses carry.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// ReaderClient
// ---------------------------------------------------------------------------

/// Extraction provider client bound to one run's credential.
pub struct ReaderClient {
    client: Client,
    reader_url: Url,
    search_url: Url,
    api_key: ApiKey,
    timeout_secs: u64,
}

impl ReaderClient {
    /// Build a client. Fails if either endpoint is not a valid URL.
    pub fn new(settings: &ReaderSettings, api_key: ApiKey) -> Result<Self> {
        let parse = |raw: &str| {
            Url::parse(raw)
                .map_err(|e| ContentForgeError::config(format!("invalid endpoint '{raw}': {e}")))
        };

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ContentForgeError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            reader_url: parse(&settings.reader_url)?,
            search_url: parse(&settings.search_url)?,
            api_key,
            timeout_secs: settings.timeout_secs,
        })
    }

    async fn post(&self, endpoint: &Url, body: &Value) -> reqwest::Result<Response> {
        self.client
            .post(endpoint.clone())
            .bearer_auth(self.api_key.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .header("X-With-Links-Summary", "true")
            .header("X-With-Images-Summary", "true")
            .json(body)
            .send()
            .await
    }
}

#[async_trait]
impl ContentSource for ReaderClient {
    #[instrument(skip(self))]
    async fn fetch_source(&self, url: &str) -> Result<SourceDocument> {
        let body = serde_json::json!({ "url": url });
        let response = self.post(&self.reader_url, &body).await.map_err(|e| {
            transport_error(e, "website fetch", self.timeout_secs, |m| ContentForgeError::fetch(m))
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response, "Failed to fetch website content").await;
            warn!(%status, %message, "reader request rejected");
            return Err(ContentForgeError::fetch(message));
        }

        let envelope: FetchEnvelope = response
            .json()
            .await
            .map_err(|e| ContentForgeError::parse(format!("reader response: {e}")))?;

        let data = envelope.data.ok_or(ContentForgeError::EmptyContent)?;
        let content = data
            .content
            .filter(|c| !c.is_empty())
            .ok_or(ContentForgeError::EmptyContent)?;

        let document = SourceDocument {
            content,
            images: labeled_urls(data.images.as_ref()),
            links: labeled_urls(data.links.as_ref()),
        };

        debug!(
            content_len = document.content.len(),
            images = document.images.len(),
            links = document.links.len(),
            "reader response parsed"
        );

        Ok(document)
    }

    #[instrument(skip(self))]
    async fn search_related(&self, keyword: &str) -> Result<RelatedContentBundle> {
        let body = serde_json::json!({ "q": keyword, "options": "Markdown" });
        let response = self.post(&self.search_url, &body).await.map_err(|e| {
            transport_error(e, "related content search", self.timeout_secs, |m| {
                ContentForgeError::search(m)
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response, "Failed to search related content").await;
            warn!(%status, %message, "search request rejected");
            return Err(ContentForgeError::search(message));
        }

        let envelope: SearchEnvelope = response
            .json()
            .await
            .map_err(|e| ContentForgeError::parse(format!("search response: {e}")))?;

        let items = envelope.data.unwrap_or_default();
        if items.is_empty() {
            return Err(ContentForgeError::NoResults);
        }

        Ok(RelatedContentBundle {
            snippets: items
                .into_iter()
                .map(|item| item.content.unwrap_or_default())
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Server-provided message if the body has one, otherwise `"<context>: <code> <reason>"`.
async fn error_message(response: Response, context: &str) -> String {
    let status = response.status();
    let from_body = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .filter(|m| !m.trim().is_empty());

    from_body.unwrap_or_else(|| format!("{context}: {}", status_line(status)))
}

/// `401 Unauthorized`-style status text.
fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

fn transport_error(
    err: reqwest::Error,
    operation: &str,
    timeout_secs: u64,
    wrap: fn(String) -> ContentForgeError,
) -> ContentForgeError {
    if err.is_timeout() {
        ContentForgeError::timeout(operation, timeout_secs)
    } else {
        wrap(format!("{operation} failed: {err}"))
    }
}

/// Accepts `{label: url}` objects and `[[label, url], ...]` arrays; anything
/// else (including non-string values) is skipped.
fn labeled_urls(value: Option<&Value>) -> LabeledUrls {
    match value {
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(label, url)| url.as_str().map(|u| (label.clone(), u.to_string())))
            .collect(),
        Some(Value::Array(pairs)) => pairs
            .iter()
            .filter_map(|pair| match pair.as_array().map(Vec::as_slice) {
                Some([Value::String(label), Value::String(url)]) => {
                    Some((label.clone(), url.clone()))
                }
                _ => None,
            })
            .collect(),
        _ => LabeledUrls::default(),
    }
}
