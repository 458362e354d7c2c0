//! Source fetching and related-content search against the extraction provider.
//!
//! The provider turns a URL into Markdown content plus link and image
//! summaries, and answers keyword searches with content snippets. Both calls
//! are exposed through the [`ContentSource`] trait so the pipeline can be
//! driven by fakes in tests.

mod client;

use async_trait::async_trait;

use contentforge_shared::{RelatedContentBundle, Result, SourceDocument};

pub use client::{ReaderClient, ReaderSettings};

/// Where a run gets its source material from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch and normalize the page at `url`.
    ///
    /// Fails with `Fetch` on a non-success status and `EmptyContent` when the
    /// page yields no content.
    async fn fetch_source(&self, url: &str) -> Result<SourceDocument>;

    /// Search for snippets related to `keyword`.
    ///
    /// Fails with `Search` on a non-success status and `NoResults` when
    /// nothing matched.
    async fn search_related(&self, keyword: &str) -> Result<RelatedContentBundle>;
}
