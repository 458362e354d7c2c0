//! In-process fakes for the two providers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use contentforge_extraction::ContentSource;
use contentforge_llm::{ChatModel, CompletionRequest};
use contentforge_shared::{
    ContentForgeError, LabeledUrls, RelatedContentBundle, Result, SourceDocument,
};

use crate::prompts::{OUTLINE_SYSTEM, SECTION_LEAD};

/// Returns canned content; never validates, so the pipeline's own guards are exercised.
pub(crate) struct FakeSource {
    pub document: SourceDocument,
    pub snippets: Vec<String>,
    pub fetch_error: Option<String>,
    pub fetch_delay: Duration,
    pub search_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(content: &str) -> Self {
        Self {
            document: SourceDocument {
                content: content.to_string(),
                images: [("Hero bike", "https://example.com/hero.png")]
                    .into_iter()
                    .collect(),
                links: [("Buy now", "https://example.com/shop")].into_iter().collect(),
            },
            snippets: vec!["Related snippet".into()],
            fetch_error: None,
            fetch_delay: Duration::ZERO,
            search_calls: AtomicUsize::new(0),
        }
    }

    pub fn without_media(mut self) -> Self {
        self.document.images = LabeledUrls::default();
        self.document.links = LabeledUrls::default();
        self
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn fetch_source(&self, _url: &str) -> Result<SourceDocument> {
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        match &self.fetch_error {
            Some(message) => Err(ContentForgeError::fetch(message.clone())),
            None => Ok(self.document.clone()),
        }
    }

    async fn search_related(&self, _keyword: &str) -> Result<RelatedContentBundle> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RelatedContentBundle {
            snippets: self.snippets.clone(),
        })
    }
}

/// Answers the outline request with `outline` and each section request with
/// `expanded <heading>`, after an optional per-heading delay.
pub(crate) struct FakeModel {
    pub outline: String,
    pub delays_ms: HashMap<String, u64>,
    pub fail_heading: Option<String>,
    pub requests: Mutex<Vec<CompletionRequest>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeModel {
    pub fn new(outline: &str) -> Self {
        Self {
            outline: outline.to_string(),
            delays_ms: HashMap::new(),
            fail_heading: None,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn delay(mut self, heading: &str, ms: u64) -> Self {
        self.delays_ms.insert(heading.to_string(), ms);
        self
    }

    pub fn fail_on(mut self, heading: &str) -> Self {
        self.fail_heading = Some(heading.to_string());
        self
    }

    pub fn recorded(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn section_requests(&self) -> Vec<CompletionRequest> {
        self.recorded()
            .into_iter()
            .filter(|r| r.system != OUTLINE_SYSTEM)
            .collect()
    }
}

/// Heading line of a section prompt.
pub(crate) fn section_heading(user_prompt: &str) -> String {
    user_prompt
        .lines()
        .skip_while(|line| *line != SECTION_LEAD)
        .nth(1)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl ChatModel for FakeModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        if request.system == OUTLINE_SYSTEM {
            return Ok(self.outline.clone());
        }

        let heading = section_heading(&request.user);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays_ms.get(&heading).copied().unwrap_or(0);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_heading.as_deref() == Some(heading.as_str()) {
            return Err(ContentForgeError::Provider(
                "You exceeded your current quota".into(),
            ));
        }
        Ok(format!("expanded {heading}"))
    }
}
