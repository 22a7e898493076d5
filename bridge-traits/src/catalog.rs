//! Content Catalog Abstraction
//!
//! The remote catalog knows, for a title, where its cover and chapter pages
//! live. The offline cache only reads from it.

use async_trait::async_trait;

use crate::assets::ChapterSourceSet;
use crate::error::Result;

/// Remote content catalog
///
/// # Example
///
/// ```ignore
/// use bridge_traits::catalog::ContentCatalog;
///
/// async fn chapter_count(catalog: &dyn ContentCatalog, title_id: &str) -> Result<usize> {
///     Ok(catalog.get_sources(title_id).await?.pages.len())
/// }
/// ```
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Cover reference plus the ordered page references of every chapter of a title.
    async fn get_sources(&self, title_id: &str) -> Result<ChapterSourceSet>;
}
