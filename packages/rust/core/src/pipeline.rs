//! End-to-end generation pipeline: fetch → search → outline → split → expand → join.

use futures::{StreamExt, TryStreamExt, stream};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use contentforge_extraction::ContentSource;
use contentforge_llm::ChatModel;
use contentforge_markdown::{document_stats, split_outline};
use contentforge_shared::{
    ContentForgeError, GeneratedDocument, OutlineSection, PipelineConfig, RelatedContentBundle,
    Result, SourceDocument,
};

use crate::events::{LogSink, RunLog};
use crate::expand::{SectionContext, expand_section};
use crate::outline::generate_outline;

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Stage of a single run. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    FetchingSource,
    SearchingRelated,
    GeneratingOutline,
    SplittingOutline,
    ExpandingSections,
    Done,
    Failed,
}

impl RunState {
    /// The state a successful stage leads to, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::FetchingSource),
            Self::FetchingSource => Some(Self::SearchingRelated),
            Self::SearchingRelated => Some(Self::GeneratingOutline),
            Self::GeneratingOutline => Some(Self::SplittingOutline),
            Self::SplittingOutline => Some(Self::ExpandingSections),
            Self::ExpandingSections => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Forward by exactly one stage, or to `Failed` from any non-terminal state.
    pub fn can_advance_to(self, to: RunState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingSource => "fetching_source",
            Self::SearchingRelated => "searching_related",
            Self::GeneratingOutline => "generating_outline",
            Self::SplittingOutline => "splitting_outline",
            Self::ExpandingSections => "expanding_sections",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Current state of one run, reporting each transition to the sink.
struct StateTracker<'a> {
    state: RunState,
    log: RunLog<'a>,
}

impl<'a> StateTracker<'a> {
    fn new(log: RunLog<'a>) -> Self {
        Self {
            state: RunState::Idle,
            log,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            self.enter(next);
        }
    }

    fn fail(&mut self) {
        self.enter(RunState::Failed);
    }

    fn enter(&mut self, to: RunState) {
        if !self.state.can_advance_to(to) {
            debug!(from = self.state.as_str(), to = to.as_str(), "ignoring illegal transition");
            return;
        }
        self.state = to;
        self.log.state(to);
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One content-generation run over a pair of providers.
///
/// Holds no state between runs; every run gets its own sink.
pub struct Pipeline<'a> {
    source: &'a dyn ContentSource,
    model: &'a dyn ChatModel,
    config: &'a PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn ContentSource,
        model: &'a dyn ChatModel,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            source,
            model,
            config,
        }
    }

    /// Run every stage, failing fast on the first error.
    ///
    /// The error is logged once at `error` severity and returned unchanged.
    #[instrument(skip_all, fields(keyword = %keyword, url = %website_url))]
    pub async fn run(
        &self,
        keyword: &str,
        website_url: &str,
        sink: &dyn LogSink,
    ) -> Result<GeneratedDocument> {
        let log = RunLog::new(sink);
        let mut states = StateTracker::new(log);
        log.info("Starting content generation process", None);

        match self.run_stages(keyword, website_url, log, &mut states).await {
            Ok(document) => {
                states.advance();
                Ok(document)
            }
            Err(e) => {
                states.fail();
                log.error(
                    "Error in content generation process",
                    Some(json!({ "error": e.to_string() })),
                );
                Err(e)
            }
        }
    }

    /// Like [`Pipeline::run`], but gives up with `Cancelled` once `token` fires.
    ///
    /// In-flight provider requests are dropped.
    pub async fn run_until_cancelled(
        &self,
        keyword: &str,
        website_url: &str,
        sink: &dyn LogSink,
        token: &CancellationToken,
    ) -> Result<GeneratedDocument> {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                let log = RunLog::new(sink);
                log.state(RunState::Failed);
                log.error("Content generation cancelled", None);
                Err(ContentForgeError::Cancelled)
            }
            result = self.run(keyword, website_url, sink) => result,
        }
    }

    async fn run_stages(
        &self,
        keyword: &str,
        website_url: &str,
        log: RunLog<'_>,
        states: &mut StateTracker<'_>,
    ) -> Result<GeneratedDocument> {
        states.advance();
        let (source, related) = if self.config.parallel_prefetch {
            states.advance();
            tokio::try_join!(
                fetch_source(self.source, website_url, log),
                search_related(self.source, keyword, log),
            )?
        } else {
            let source = fetch_source(self.source, website_url, log).await?;
            states.advance();
            let related = search_related(self.source, keyword, log).await?;
            (source, related)
        };

        states.advance();
        let outline = generate_outline(self.model, keyword, &source, self.config, log).await?;

        states.advance();
        let sections = split_outline(&outline);
        debug!(sections = sections.len(), "outline split");

        states.advance();
        let shared = SectionContext::new(
            &related.merged(),
            &source.images,
            &source.links,
            self.config,
        );
        let texts = self.expand_all(&sections, &shared, log).await?;

        let document = GeneratedDocument::from_sections(&texts);
        let stats = document_stats(&document.content);
        log.success(
            "Successfully generated content",
            Some(json!({
                "contentLength": stats.char_count,
                "wordCount": stats.word_count,
                "imageCount": source.images.len(),
                "sectionCount": texts.len(),
            })),
        );
        Ok(document)
    }

    /// Expand every section with at most `section_concurrency` requests in
    /// flight. Results land in outline order whatever order they finish in;
    /// the first failure drops the rest.
    async fn expand_all(
        &self,
        sections: &[OutlineSection],
        shared: &SectionContext,
        log: RunLog<'_>,
    ) -> Result<Vec<String>> {
        let mut slots: Vec<Option<String>> = vec![None; sections.len()];

        let mut pending = stream::iter(sections.iter().enumerate())
            .map(|(idx, section)| async move {
                expand_section(self.model, section, shared, self.config, log)
                    .await
                    .map(|text| (idx, text))
            })
            .buffer_unordered(self.config.section_concurrency.max(1));

        while let Some((idx, text)) = pending.try_next().await? {
            slots[idx] = Some(text);
        }

        Ok(slots.into_iter().map(Option::unwrap_or_default).collect())
    }
}

// ---------------------------------------------------------------------------
// Provider stages
// ---------------------------------------------------------------------------

async fn fetch_source(
    source: &dyn ContentSource,
    url: &str,
    log: RunLog<'_>,
) -> Result<SourceDocument> {
    log.info(format!("Fetching content from website: {url}"), None);

    let fetched = source.fetch_source(url).await.and_then(|doc| {
        if doc.content.is_empty() {
            Err(ContentForgeError::EmptyContent)
        } else {
            Ok(doc)
        }
    });

    match fetched {
        Ok(doc) => {
            log.success(
                "Successfully fetched website content",
                Some(json!({
                    "contentLength": doc.content.chars().count(),
                    "hasLinks": !doc.links.is_empty(),
                    "hasImages": !doc.images.is_empty(),
                })),
            );
            Ok(doc)
        }
        Err(e) => {
            log.error(
                "Error fetching website content",
                Some(json!({ "error": e.to_string() })),
            );
            Err(e)
        }
    }
}

async fn search_related(
    source: &dyn ContentSource,
    keyword: &str,
    log: RunLog<'_>,
) -> Result<RelatedContentBundle> {
    log.info(
        format!("Searching for related content with keyword: {keyword}"),
        None,
    );

    let found = source.search_related(keyword).await.and_then(|bundle| {
        if bundle.snippets.is_empty() {
            Err(ContentForgeError::NoResults)
        } else {
            Ok(bundle)
        }
    });

    match found {
        Ok(bundle) => {
            log.success(
                "Successfully fetched related content",
                Some(json!({ "resultsCount": bundle.snippets.len() })),
            );
            Ok(bundle)
        }
        Err(e) => {
            log.error(
                "Error searching related content",
                Some(json!({ "error": e.to_string() })),
            );
            Err(e)
        }
    }
}
