//! Markdown helpers used while building prompts and assembling articles.
//!
//! Pure functions only: image list rendering, prompt-size truncation,
//! outline splitting, and document statistics.

mod outline;

use contentforge_shared::LabeledUrls;

pub use outline::split_outline;

/// Appended to text cut by [`truncate_text`].
pub const TRUNCATION_MARKER: &str = "...";

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Render `alt → url` pairs as Markdown image lines, one per line.
pub fn format_image_markdown(images: &LabeledUrls) -> String {
    images
        .iter()
        .map(|(alt, url)| format!("![{alt}]({url})"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Comma-separated link labels. URLs are left out to keep prompts compact.
pub fn format_link_labels(links: &LabeledUrls) -> String {
    links.labels().collect::<Vec<_>>().join(", ")
}

// ---------------------------------------------------------------------------
// Truncator
// ---------------------------------------------------------------------------

/// Keep at most `max_chars` characters, marking the cut with [`TRUNCATION_MARKER`].
///
/// Counts `char`s, not bytes, so multi-byte text is never split mid-codepoint.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Size figures reported when a document is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStats {
    pub char_count: usize,
    pub word_count: usize,
}

/// Compute [`DocumentStats`] for a Markdown document.
pub fn document_stats(markdown: &str) -> DocumentStats {
    DocumentStats {
        char_count: markdown.chars().count(),
        word_count: count_words(markdown),
    }
}

/// Whitespace-separated word count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
