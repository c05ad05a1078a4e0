use tracing::info;
use url::Url;

use crate::app::{Result, RednoteError};
use crate::browser::Page;
use crate::domain::FeedDetail;
use crate::extract::{self, StateRoot};

const EXPLORE_BASE: &str = "https://www.xiaohongshu.com/explore/";

/// Detail page URL. The token is forwarded exactly as received.
pub fn detail_url(feed_id: &str, xsec_token: &str) -> Result<Url> {
    let mut url = Url::parse(EXPLORE_BASE)?.join(feed_id)?;
    url.query_pairs_mut()
        .append_pair("xsec_token", xsec_token)
        .append_pair("xsec_source", "pc_feed");
    Ok(url)
}

pub(crate) fn require_id(feed_id: &str) -> Result<()> {
    if feed_id.trim().is_empty() || feed_id.contains(['/', '?', '#']) {
        return Err(RednoteError::Validation(format!(
            "invalid feed id: {:?}",
            feed_id
        )));
    }
    Ok(())
}

/// Note and rendered comments for one feed.
pub async fn feed_detail<P: Page>(page: &P, feed_id: &str, xsec_token: &str) -> Result<FeedDetail> {
    require_id(feed_id)?;
    let page = page.with_timeout(page.timeouts().page());
    let url = detail_url(feed_id, xsec_token)?;

    let raw = extract::load_state(&page, url.as_str(), StateRoot::NoteDetail).await?;
    let detail = extract::decode_note(&raw, feed_id)?;

    info!(
        feed_id,
        images = detail.note.image_list.len(),
        comments = detail.comments.list.len(),
        "Loaded feed detail"
    );
    Ok(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ExtractError;
    use crate::browser::testing::FakePage;
    use serde_json::json;

    #[test]
    fn test_detail_url_carries_token() {
        let url = detail_url("64f1a2", "AB=cd").unwrap();
        assert_eq!(url.path(), "/explore/64f1a2");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("xsec_token".to_string(), "AB=cd".to_string()),
                ("xsec_source".to_string(), "pc_feed".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_detail_reads_requested_note() {
        let page = FakePage::new();
        let state = json!({"note": {"noteDetailMap": {
            "n1": {"note": {"noteId": "n1", "title": "Hello", "imageList": [{"urlDefault": "u"}]}}
        }}});
        page.on_eval("JSON.stringify", json!(state.to_string()));

        let detail = feed_detail(&page, "n1", "tok").await.unwrap();
        assert_eq!(detail.note.title, "Hello");
        assert_eq!(detail.note.image_list.len(), 1);
        assert!(page.navigations()[0].contains("/explore/n1?xsec_token=tok"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_detail_missing_note_is_missing_key() {
        let page = FakePage::new();
        page.on_eval(
            "JSON.stringify",
            json!(json!({"note": {"noteDetailMap": {}}}).to_string()),
        );

        let err = feed_detail(&page, "n1", "tok").await.unwrap_err();
        assert!(matches!(
            err,
            RednoteError::Extraction(ExtractError::MissingKey(_))
        ));
    }

    #[tokio::test]
    async fn test_feed_id_with_path_rejected() {
        let page = FakePage::new();
        let err = feed_detail(&page, "../login", "tok").await.unwrap_err();
        assert!(matches!(err, RednoteError::Validation(_)));
        assert!(page.calls().is_empty());
    }
}
