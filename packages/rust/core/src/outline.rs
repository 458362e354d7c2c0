//! Outline generation: one model request from keyword + source content.

use tracing::instrument;

use contentforge_llm::{ChatModel, CompletionRequest};
use contentforge_markdown::{format_image_markdown, truncate_text};
use contentforge_shared::{PipelineConfig, Result, SourceDocument};

use crate::events::RunLog;
use crate::prompts;

/// Ask the model for a Markdown outline of an article about `keyword`.
///
/// Returns the raw text of the first choice. An empty string is a valid
/// answer; splitting it simply yields no sections.
#[instrument(skip_all, fields(keyword = %keyword))]
pub(crate) async fn generate_outline(
    model: &dyn ChatModel,
    keyword: &str,
    source: &SourceDocument,
    config: &PipelineConfig,
    log: RunLog<'_>,
) -> Result<String> {
    log.info("Generating content outline", None);

    let content = truncate_text(&source.content, config.outline_context_chars);
    let image_list = format_image_markdown(&source.images);

    let request = CompletionRequest {
        system: prompts::OUTLINE_SYSTEM.to_string(),
        user: prompts::outline_prompt(keyword, &content, &image_list),
        temperature: config.temperature,
        max_tokens: config.outline_max_tokens,
    };

    model.complete(request).await
}
