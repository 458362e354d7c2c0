//! Core domain types for a content-generation run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{ContentForgeError, Result};

// ---------------------------------------------------------------------------
// ApiKey
// ---------------------------------------------------------------------------

/// A caller-supplied credential. Never logged, never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

// ---------------------------------------------------------------------------
// GenerationRequest
// ---------------------------------------------------------------------------

/// Everything one run needs. Built once per user-triggered run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Main topic keyword, also used as the search query.
    pub keyword: String,
    /// Absolute http(s) URL of the source website.
    pub website_url: String,
    /// Language-model provider credential.
    pub model_key: ApiKey,
    /// Extraction/search provider credential.
    pub extraction_key: ApiKey,
}

impl GenerationRequest {
    /// Caller-layer input checks. The pipeline itself assumes these passed.
    ///
    /// Checks run in a fixed order and the first failure wins.
    pub fn validate(&self, model_key_prefix: &str) -> Result<()> {
        if self.keyword.trim().is_empty() {
            return Err(ContentForgeError::validation("Please enter a keyword"));
        }
        if self.website_url.trim().is_empty() {
            return Err(ContentForgeError::validation("Please enter a website URL"));
        }
        if !is_http_url(&self.website_url) {
            return Err(ContentForgeError::validation(
                "Please enter a valid website URL starting with http:// or https://",
            ));
        }
        if self.model_key.is_blank() {
            return Err(ContentForgeError::validation(
                "Please enter your OpenAI API key",
            ));
        }
        if !self.model_key.expose().starts_with(model_key_prefix) {
            return Err(ContentForgeError::validation("Invalid OpenAI API key format"));
        }
        if self.extraction_key.is_blank() {
            return Err(ContentForgeError::validation(
                "Please enter your Jina AI API key",
            ));
        }
        Ok(())
    }
}

fn is_http_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// SourceDocument / RelatedContentBundle
// ---------------------------------------------------------------------------

/// Ordered `label → url` pairs, kept in the order the provider returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabeledUrls(pub Vec<(String, String)>);

impl LabeledUrls {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(label, _)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, u)| (l.as_str(), u.as_str()))
    }
}

impl<L: Into<String>, U: Into<String>> FromIterator<(L, U)> for LabeledUrls {
    fn from_iter<T: IntoIterator<Item = (L, U)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(l, u)| (l.into(), u.into())).collect())
    }
}

/// Normalized content of the source website. `content` is never empty.
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    /// Page content as Markdown.
    pub content: String,
    /// Inline images, alt text → URL.
    pub images: LabeledUrls,
    /// Links, link text → URL.
    pub links: LabeledUrls,
}

/// Search snippets related to the keyword. Never empty.
#[derive(Debug, Clone, Default)]
pub struct RelatedContentBundle {
    pub snippets: Vec<String>,
}

impl RelatedContentBundle {
    /// All snippets joined by a blank line, in result order.
    pub fn merged(&self) -> String {
        self.snippets.join("\n\n")
    }
}

// ---------------------------------------------------------------------------
// OutlineSection / GeneratedDocument
// ---------------------------------------------------------------------------

/// One top-level section of a generated outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineSection {
    /// Header text without the `## ` marker.
    pub heading: String,
    /// Everything up to the next top-level header.
    pub body: String,
}

impl OutlineSection {
    /// The section as it is handed to the model: heading line, then body.
    pub fn prompt_text(&self) -> String {
        if self.body.is_empty() {
            self.heading.clone()
        } else {
            format!("{}\n{}", self.heading, self.body)
        }
    }
}

/// Final article: expanded sections joined by a blank line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub content: String,
}

impl GeneratedDocument {
    pub fn from_sections(sections: &[String]) -> Self {
        Self {
            content: sections.join("\n\n"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

// ---------------------------------------------------------------------------
// LogEvent
// ---------------------------------------------------------------------------

/// Severity of a run log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
    Success,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
            Self::Success => "success",
        }
    }
}

/// A single entry in a run's event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    /// Unique, time-sortable event id.
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEvent {
    pub fn new(
        severity: Severity,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            severity,
            message: message.into(),
            details,
        }
    }
}
