use tracing::info;
use url::Url;

use crate::app::{Result, RednoteError};
use crate::browser::Page;
use crate::domain::Feed;
use crate::extract::{self, StateRoot};

const SEARCH_URL: &str = "https://www.xiaohongshu.com/search_result";
const SEARCH_SOURCE: &str = "web_explore_feed";

/// Search result page URL for `keyword`.
pub fn search_url(keyword: &str) -> Result<Url> {
    let url = Url::parse_with_params(
        SEARCH_URL,
        &[("keyword", keyword), ("source", SEARCH_SOURCE)],
    )?;
    Ok(url)
}

/// Feeds on the first search result page for `keyword`.
///
/// The keyword is sent as given; only a blank one is rejected.
pub async fn search<P: Page>(page: &P, keyword: &str) -> Result<Vec<Feed>> {
    if keyword.trim().is_empty() {
        return Err(RednoteError::Validation("search keyword is empty".into()));
    }

    let page = page.with_timeout(page.timeouts().page());
    let url = search_url(keyword)?;

    let raw = extract::load_state(&page, url.as_str(), StateRoot::Search).await?;
    let feeds = extract::decode_feeds(&raw, StateRoot::Search)?;

    info!(keyword, count = feeds.len(), "Search finished");
    Ok(feeds)
}
