//! Batch archival of home feed notes.
//!
//! ```text
//! list feeds → truncate → detail per feed (failures skipped) → sort by title → number → write
//! ```
//!
//! Fetching is sequential over one page. File naming and writing live in
//! [`writer`].

mod document;
pub mod writer;

pub use document::{document_title, render, ArchiveDocument};
pub use writer::{sanitize_filename, unique_path, ArchiveWriter};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::app::Result;
use crate::browser::Page;
use crate::domain::{Feed, FeedDetail};
use crate::flows;

pub const DEFAULT_LIMIT: usize = 10;

/// Where archived notes come from.
#[async_trait]
pub trait NoteSource: Send + Sync {
    async fn list_feeds(&self) -> Result<Vec<Feed>>;

    async fn feed_detail(&self, feed: &Feed) -> Result<FeedDetail>;
}

/// [`NoteSource`] backed by the list and detail flows on one page.
pub struct PageSource<P> {
    page: P,
}

impl<P: Page> PageSource<P> {
    pub fn new(page: P) -> Self {
        Self { page }
    }
}

#[async_trait]
impl<P: Page> NoteSource for PageSource<P> {
    async fn list_feeds(&self) -> Result<Vec<Feed>> {
        flows::list_feeds(&self.page).await
    }

    async fn feed_detail(&self, feed: &Feed) -> Result<FeedDetail> {
        flows::feed_detail(&self.page, &feed.id, &feed.xsec_token).await
    }
}

/// Digits in the filename prefix for a batch of `count` documents.
pub fn prefix_width(count: usize) -> usize {
    count.to_string().len().max(2)
}

/// Sort case-insensitively by title and assign order-preserving prefixes.
pub fn order_documents(mut documents: Vec<ArchiveDocument>) -> Vec<ArchiveDocument> {
    documents.sort_by_cached_key(|d| d.title.to_lowercase());

    let width = prefix_width(documents.len());
    for (index, doc) in documents.iter_mut().enumerate() {
        doc.prefix = format!("{:0width$}", index + 1, width = width);
    }
    documents
}

/// Fetch up to `limit` home feed notes (0 means [`DEFAULT_LIMIT`]) and render
/// them in title order.
///
/// A failed detail fetch skips that note. Cancellation and launch failures
/// end the batch.
pub async fn collect<S: NoteSource>(source: &S, limit: usize) -> Result<Vec<ArchiveDocument>> {
    let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };

    let mut feeds = source.list_feeds().await?;
    feeds.truncate(limit);
    info!(count = feeds.len(), "Archiving feeds");

    let mut documents = Vec::with_capacity(feeds.len());
    for feed in &feeds {
        match source.feed_detail(feed).await {
            Ok(detail) => documents.push(render(feed, &detail)),
            Err(e) if e.is_skippable() => {
                warn!(feed_id = %feed.id, "Skipping feed: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(order_documents(documents))
}
