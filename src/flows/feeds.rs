use tracing::info;

use crate::app::Result;
use crate::browser::Page;
use crate::domain::Feed;
use crate::extract::{self, StateRoot};

pub const HOME_URL: &str = "https://www.xiaohongshu.com";

/// Feeds rendered on the home page.
pub async fn list_feeds<P: Page>(page: &P) -> Result<Vec<Feed>> {
    let page = page.with_timeout(page.timeouts().page());

    let raw = extract::load_state(&page, HOME_URL, StateRoot::HomeFeed).await?;
    let feeds = extract::decode_feeds(&raw, StateRoot::HomeFeed)?;

    info!(count = feeds.len(), "Loaded home feed");
    Ok(feeds)
}
