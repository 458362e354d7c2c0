//! Section expansion: one model request per outline section.

use tracing::instrument;

use contentforge_llm::{ChatModel, CompletionRequest};
use contentforge_markdown::{format_image_markdown, format_link_labels, truncate_text};
use contentforge_shared::{LabeledUrls, OutlineSection, PipelineConfig, Result};

use crate::events::RunLog;
use crate::prompts;

/// Media and context shared by every section of one run.
pub(crate) struct SectionContext {
    /// Merged related content, already truncated.
    pub context: String,
    pub image_list: String,
    pub link_labels: String,
}

impl SectionContext {
    pub(crate) fn new(
        related: &str,
        images: &LabeledUrls,
        links: &LabeledUrls,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            context: truncate_text(related, config.section_context_chars),
            image_list: format_image_markdown(images),
            link_labels: format_link_labels(links),
        }
    }
}

/// Turn one outline section into full Markdown prose.
///
/// Only link labels go into the prompt; the model is left to reuse them as
/// it sees fit and nothing is substituted afterwards.
#[instrument(skip_all, fields(heading = %section.heading))]
pub(crate) async fn expand_section(
    model: &dyn ChatModel,
    section: &OutlineSection,
    shared: &SectionContext,
    config: &PipelineConfig,
    log: RunLog<'_>,
) -> Result<String> {
    log.info(
        format!("Generating content for section: {}", section.heading),
        None,
    );

    let request = CompletionRequest {
        system: prompts::SECTION_SYSTEM.to_string(),
        user: prompts::section_prompt(
            &section.prompt_text(),
            &shared.context,
            &shared.image_list,
            &shared.link_labels,
        ),
        temperature: config.temperature,
        max_tokens: config.section_max_tokens,
    };

    model.complete(request).await
}
