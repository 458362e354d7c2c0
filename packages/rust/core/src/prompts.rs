//! Prompt text for the outline and section requests.

/// System instruction for the outline request.
pub const OUTLINE_SYSTEM: &str = "Create a structured outline for an article with clear sections and subsections. Include relevant images where they enhance the content.";

/// System instruction for each section request.
pub const SECTION_SYSTEM: &str = "Write engaging article content using markdown formatting. Include relevant images and links to enhance the content.";

/// Line that introduces the section text in a section prompt.
pub(crate) const SECTION_LEAD: &str = "Write content for this section of the article:";

/// User prompt for the outline request. `content` is expected to be truncated already.
pub fn outline_prompt(keyword: &str, content: &str, image_list: &str) -> String {
    format!(
        r#"Create a detailed outline for an article about "{keyword}" based on this content:
{content}

Available images:
{image_list}

Format the outline with main sections and subsections using markdown headers.
Include relevant images from the list above in appropriate sections."#
    )
}

/// User prompt for one section request. `context` is expected to be truncated already.
pub fn section_prompt(section: &str, context: &str, image_list: &str, link_labels: &str) -> String {
    format!(
        r#"{SECTION_LEAD}
{section}

Use this context:
{context}

Available images:
{image_list}

Available links: {link_labels}

Requirements:
- Use markdown formatting
- Include relevant images from the list above where they enhance the content
- Add appropriate links from the available list
- Keep the content focused and engaging"#
    )
}
