//! Session boundary for form-style callers.
//!
//! A [`GenerationSession`] keeps the loading flag, the last error and the last
//! content between runs, and owns the log that every new run clears. Starting
//! a run cancels the one in flight; a superseded run can no longer touch the
//! session's state or log.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use contentforge_extraction::{ContentSource, ReaderClient, ReaderSettings};
use contentforge_llm::{ChatClient, ChatModel, ChatSettings};
use contentforge_shared::{
    ContentForgeError, GeneratedDocument, GenerationRequest, LogEvent, PipelineConfig, Result,
};

use crate::events::{LogSink, MemoryLog, RunLog, lock};
use crate::pipeline::{Pipeline, RunState};

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// The two providers one run talks to.
pub struct Providers {
    pub source: Box<dyn ContentSource>,
    pub model: Box<dyn ChatModel>,
}

/// Builds providers from the credentials carried by a request.
pub trait Backend: Send + Sync {
    fn connect(&self, request: &GenerationRequest, config: &PipelineConfig) -> Result<Providers>;
}

/// Real HTTP providers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpBackend;

impl Backend for HttpBackend {
    fn connect(&self, request: &GenerationRequest, config: &PipelineConfig) -> Result<Providers> {
        let source = ReaderClient::new(&ReaderSettings::from(config), request.extraction_key.clone())?;
        let model = ChatClient::new(&ChatSettings::from(config), request.model_key.clone())?;
        Ok(Providers {
            source: Box::new(source),
            model: Box::new(model),
        })
    }
}

// ---------------------------------------------------------------------------
// GenerationSession
// ---------------------------------------------------------------------------

/// What a caller renders between and during runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub is_loading: bool,
    /// Message of the last failed run, shown as-is.
    pub error: Option<String>,
    pub content: Option<String>,
}

pub struct GenerationSession<B = HttpBackend> {
    backend: B,
    config: PipelineConfig,
    log: MemoryLog,
    observer: Option<Arc<dyn LogSink>>,
    state: Mutex<SessionState>,
    inflight: Mutex<Option<CancellationToken>>,
    latest_run: AtomicU64,
}

impl GenerationSession<HttpBackend> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_backend(HttpBackend, config)
    }
}

impl<B: Backend> GenerationSession<B> {
    pub fn with_backend(backend: B, config: PipelineConfig) -> Self {
        Self {
            backend,
            config,
            log: MemoryLog::new(),
            observer: None,
            state: Mutex::new(SessionState::default()),
            inflight: Mutex::new(None),
            latest_run: AtomicU64::new(0),
        }
    }

    /// Also deliver every event and state change of the current run to
    /// `observer`, after the session log has recorded it.
    pub fn with_observer(mut self, observer: Arc<dyn LogSink>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> SessionState {
        lock(&self.state).clone()
    }

    /// Events of the latest run.
    pub fn events(&self) -> Vec<LogEvent> {
        self.log.events()
    }

    /// Cancel the run in flight, if any.
    pub fn cancel(&self) {
        if let Some(token) = lock(&self.inflight).take() {
            token.cancel();
        }
    }

    /// Validate `request`, run the pipeline and record the outcome.
    ///
    /// The outcome is also returned, so headless callers need not poll
    /// [`GenerationSession::state`].
    #[instrument(skip_all, fields(keyword = %request.keyword))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDocument> {
        let (run_id, token) = self.begin_run();
        let sink = RunSink {
            session: self,
            run_id,
        };
        let log = RunLog::new(&sink);

        let outcome = self.attempt(request, run_id, &sink, &token).await;

        match &outcome {
            Ok(_) => log.success("Content generation completed successfully", None),
            Err(e) => log.error(format!("Content generation failed: {e}"), None),
        }

        self.finish_run(run_id, &outcome);
        outcome
    }

    async fn attempt(
        &self,
        request: &GenerationRequest,
        run_id: u64,
        sink: &RunSink<'_, B>,
        token: &CancellationToken,
    ) -> Result<GeneratedDocument> {
        request.validate(&self.config.key_prefix)?;

        self.update_if_current(run_id, |state| state.is_loading = true);
        RunLog::new(sink).info("Starting content generation with provided configuration", None);

        let providers = self.backend.connect(request, &self.config)?;
        let document = Pipeline::new(providers.source.as_ref(), providers.model.as_ref(), &self.config)
            .run_until_cancelled(&request.keyword, &request.website_url, sink, token)
            .await?;

        if document.is_empty() {
            return Err(ContentForgeError::NothingGenerated);
        }
        Ok(document)
    }

    /// Supersede the previous run and reset state for a new one.
    fn begin_run(&self) -> (u64, CancellationToken) {
        let mut state = lock(&self.state);
        let run_id = self.latest_run.fetch_add(1, Ordering::SeqCst) + 1;

        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.inflight).replace(token.clone()) {
            debug!(run_id, "superseding run in flight");
            previous.cancel();
        }

        *state = SessionState::default();
        self.log.clear();
        (run_id, token)
    }

    fn is_current(&self, run_id: u64) -> bool {
        self.latest_run.load(Ordering::SeqCst) == run_id
    }

    /// Record the outcome and release the run's token, unless a newer run
    /// has started. Holds the state lock throughout, as `begin_run` does.
    fn finish_run(&self, run_id: u64, outcome: &Result<GeneratedDocument>) {
        let mut state = lock(&self.state);
        if !self.is_current(run_id) {
            return;
        }
        match outcome {
            Ok(document) => state.content = Some(document.content.clone()),
            Err(e) => {
                state.error = Some(e.to_string());
                state.content = None;
            }
        }
        state.is_loading = false;
        lock(&self.inflight).take();
    }

    /// Apply `f` under the state lock, unless a newer run has started.
    fn update_if_current(&self, run_id: u64, f: impl FnOnce(&mut SessionState)) {
        let mut state = lock(&self.state);
        if self.is_current(run_id) {
            f(&mut state);
        }
    }
}

/// Per-run view of the session log that goes quiet once the run is superseded.
struct RunSink<'s, B> {
    session: &'s GenerationSession<B>,
    run_id: u64,
}

impl<B: Backend> RunSink<'_, B> {
    /// Run `record` under the state lock if this run is still current.
    fn if_current(&self, record: impl FnOnce(&MemoryLog)) -> bool {
        let _state = lock(&self.session.state);
        let current = self.session.is_current(self.run_id);
        if current {
            record(&self.session.log);
        }
        current
    }
}

impl<B: Backend> LogSink for RunSink<'_, B> {
    fn emit(&self, event: LogEvent) {
        match &self.session.observer {
            Some(observer) => {
                if self.if_current(|log| log.emit(event.clone())) {
                    observer.emit(event);
                }
            }
            None => {
                self.if_current(|log| log.emit(event));
            }
        }
    }

    fn state_changed(&self, state: RunState) {
        if self.if_current(|log| log.state_changed(state)) {
            if let Some(observer) = &self.session.observer {
                observer.state_changed(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use contentforge_shared::{ApiKey, Severity};

    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::testing::{FakeModel, FakeSource};

    /// Fake providers; keyword `slow` stalls the fetch.
    struct FakeBackend {
        outline: &'static str,
        fetch_error: Option<&'static str>,
    }

    impl FakeBackend {
        fn new(outline: &'static str) -> Self {
            Self {
                outline,
                fetch_error: None,
            }
        }
    }

    impl Backend for FakeBackend {
        fn connect(&self, request: &GenerationRequest, _config: &PipelineConfig) -> Result<Providers> {
            let mut source = FakeSource::new("Electric bikes are popular.");
            source.fetch_error = self.fetch_error.map(str::to_string);
            if request.keyword == "slow" {
                source.fetch_delay = Duration::from_secs(5);
            } else if request.keyword == "steady" {
                source.fetch_delay = Duration::from_millis(100);
            }
            Ok(Providers {
                source: Box::new(source),
                model: Box::new(FakeModel::new(self.outline)),
            })
        }
    }

    fn request(keyword: &str) -> GenerationRequest {
        GenerationRequest {
            keyword: keyword.into(),
            website_url: "https://example.com".into(),
            model_key: ApiKey::new("sk-test"),
            extraction_key: ApiKey::new("jina_test"),
        }
    }

    fn session(backend: FakeBackend) -> GenerationSession<FakeBackend> {
        GenerationSession::with_backend(backend, PipelineConfig::default())
    }

    #[tokio::test]
    async fn successful_run_sets_content() {
        let session = session(FakeBackend::new("## Intro\nfoo"));

        let doc = session.generate(&request("electric bikes")).await.unwrap();

        assert_eq!(doc.content, "expanded Intro");
        assert_eq!(
            session.state(),
            SessionState {
                is_loading: false,
                error: None,
                content: Some("expanded Intro".into()),
            }
        );
        let events = session.events();
        assert_eq!(
            events[0].message,
            "Starting content generation with provided configuration"
        );
        let last = events.last().unwrap();
        assert_eq!(last.severity, Severity::Success);
        assert_eq!(last.message, "Content generation completed successfully");
    }

    #[tokio::test]
    async fn invalid_request_never_starts_a_run() {
        let session = session(FakeBackend::new("## Intro\nfoo"));

        let err = session.generate(&request("   ")).await.unwrap_err();

        assert_eq!(err.to_string(), "Please enter a keyword");
        let state = session.state();
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("Please enter a keyword"));

        let events = session.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Content generation failed: Please enter a keyword");
    }

    #[tokio::test]
    async fn provider_error_is_shown_verbatim() {
        let mut backend = FakeBackend::new("## Intro\nfoo");
        backend.fetch_error = Some("Failed to fetch website content: 401 Unauthorized");
        let session = session(backend);

        session.generate(&request("electric bikes")).await.unwrap_err();

        let state = session.state();
        assert_eq!(
            state.error.as_deref(),
            Some("Failed to fetch website content: 401 Unauthorized")
        );
        assert_eq!(state.content, None);
        assert!(!state.is_loading);
        assert!(
            session
                .events()
                .iter()
                .any(|e| e.message == "Error fetching website content")
        );
    }

    #[tokio::test]
    async fn empty_document_is_reported_as_failure() {
        let session = session(FakeBackend::new("No headers here."));

        let err = session.generate(&request("electric bikes")).await.unwrap_err();

        assert!(matches!(err, ContentForgeError::NothingGenerated));
        assert_eq!(session.state().error.as_deref(), Some("No content was generated"));
        assert_eq!(
            session.events().last().unwrap().message,
            "Content generation failed: No content was generated"
        );
    }

    #[tokio::test]
    async fn new_run_clears_previous_error_and_log() {
        let session = session(FakeBackend::new("## Intro\nfoo"));
        session.generate(&request("")).await.unwrap_err();

        session.generate(&request("electric bikes")).await.unwrap();

        assert_eq!(session.state().error, None);
        assert!(
            !session
                .events()
                .iter()
                .any(|e| e.severity == Severity::Error)
        );
    }

    #[tokio::test]
    async fn loading_flag_is_set_while_running() {
        let session = session(FakeBackend::new("## Intro\nfoo"));

        let steady = request("steady");

        let (result, seen_loading) = tokio::join!(session.generate(&steady), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            session.state().is_loading
        });

        assert!(result.is_ok());
        assert!(seen_loading);
        assert!(!session.state().is_loading);
    }

    #[tokio::test]
    async fn newer_run_supersedes_the_one_in_flight() {
        let session = session(FakeBackend::new("## Intro\nfoo"));

        let slow = request("slow");
        let fresh = request("electric bikes");

        let (first, second) = tokio::join!(session.generate(&slow), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            session.generate(&fresh).await
        });

        assert!(matches!(first.unwrap_err(), ContentForgeError::Cancelled));
        assert_eq!(second.unwrap().content, "expanded Intro");
        assert_eq!(
            session.state(),
            SessionState {
                is_loading: false,
                error: None,
                content: Some("expanded Intro".into()),
            }
        );
        assert!(
            !session
                .events()
                .iter()
                .any(|e| e.severity == Severity::Error)
        );
    }

    #[tokio::test]
    async fn cancel_reaches_the_run_that_superseded_another() {
        let session = session(FakeBackend::new("## Intro\nfoo"));
        let slow = request("slow");
        let steady = request("steady");

        let (first, second, ()) = tokio::join!(
            session.generate(&slow),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                session.generate(&steady).await
            },
            async {
                tokio::time::sleep(Duration::from_millis(60)).await;
                session.cancel();
            }
        );

        assert!(matches!(first.unwrap_err(), ContentForgeError::Cancelled));
        assert!(matches!(second.unwrap_err(), ContentForgeError::Cancelled));
        let state = session.state();
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("content generation was cancelled"));
    }

    #[tokio::test]
    async fn observer_sees_only_the_current_run() {
        let observer = Arc::new(MemoryLog::new());
        let session = session(FakeBackend::new("## Intro\nfoo")).with_observer(observer.clone());
        let slow = request("slow");
        let fresh = request("electric bikes");

        let (first, second) = tokio::join!(session.generate(&slow), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            session.generate(&fresh).await
        });

        assert!(first.is_err());
        assert!(second.is_ok());

        let seen: Vec<_> = observer.events().into_iter().map(|e| e.message).collect();
        assert!(seen.contains(&"Content generation completed successfully".to_string()));
        assert!(!seen.iter().any(|m| m.contains("cancelled")));
        assert_eq!(observer.states().last(), Some(&RunState::Done));

        let recorded: Vec<_> = session.events().into_iter().map(|e| e.message).collect();
        assert!(seen.ends_with(&recorded));
    }

    #[tokio::test]
    async fn generates_over_http_providers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/reader/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "content": "Electric bikes are popular.",
                    "images": { "Hero": "https://example.com/hero.png" },
                    "links": { "Shop": "https://example.com/shop" }
                }
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/search/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "content": "Batteries last five years." }]
            })))
            .mount(&server)
            .await;

        let completion = |text: &str| {
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": text } }]
            }))
        };

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("Create a detailed outline"))
            .respond_with(completion("## Intro\nfoo\n## Specs\nbar"))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("section of the article"))
            .and(body_string_contains("Intro"))
            .respond_with(completion("Intro text"))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("section of the article"))
            .and(body_string_contains("Specs"))
            .respond_with(completion("Specs text"))
            .mount(&server)
            .await;

        let config = PipelineConfig {
            reader_url: format!("{}/reader/", server.uri()),
            search_url: format!("{}/search/", server.uri()),
            llm_base_url: format!("{}/v1", server.uri()),
            ..PipelineConfig::default()
        };
        let session = GenerationSession::new(config);

        let doc = session.generate(&request("electric bikes")).await.unwrap();

        assert_eq!(doc.content, "Intro text\n\nSpecs text");
        assert_eq!(session.state().content.as_deref(), Some("Intro text\n\nSpecs text"));
    }
}
