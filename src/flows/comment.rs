use std::time::Duration;

use tracing::info;

use crate::app::{Phase, PhaseExt, Result, RednoteError};
use crate::browser::{js_string, wait, Page};
use crate::flows::detail::{detail_url, require_id};

const COMMENT_TRIGGER: &str = "div.input-box div.content-edit span";
const COMMENT_INPUT: &str = "div.input-box div.content-edit p.content-input";
const COMMENT_SUBMIT: &str = "div.bottom button.submit";
const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Holds once the comment box no longer contains `content`.
fn cleared_predicate(content: &str) -> String {
    format!(
        r#"(() => {{
            const input = document.querySelector({selector});
            return !input || !(input.textContent || '').includes({content});
        }})()"#,
        selector = js_string(COMMENT_INPUT),
        content = js_string(content),
    )
}

/// Post `content` as a top-level comment on a feed.
///
/// Success requires the comment box to clear after submit; anything else is
/// an error for the call. Nothing is retried.
pub async fn post_comment<P: Page>(
    page: &P,
    feed_id: &str,
    xsec_token: &str,
    content: &str,
) -> Result<()> {
    require_id(feed_id)?;
    if content.trim().is_empty() {
        return Err(RednoteError::Validation("comment content is empty".into()));
    }

    let page = page.with_timeout(page.timeouts().page());
    let url = detail_url(feed_id, xsec_token)?;

    async {
        page.navigate(url.as_str()).await?;
        wait::wait_stable(&page).await
    }
    .await
    .phase(Phase::OpenNote)?;

    async {
        wait::wait_visible(&page, COMMENT_TRIGGER).await?;
        page.click(COMMENT_TRIGGER, 0).await?;
        wait::wait_present(&page, COMMENT_INPUT).await?;
        page.type_text(COMMENT_INPUT, content).await
    }
    .await
    .phase(Phase::CommentInput)?;

    async {
        page.click(COMMENT_SUBMIT, 0).await?;
        wait::settle(&page, "comment submit", Duration::from_secs(1)).await
    }
    .await
    .phase(Phase::CommentSubmit)?;

    let verify = page.with_timeout(VERIFY_TIMEOUT);
    match wait::wait_for(&verify, "comment box to clear", &cleared_predicate(content)).await {
        Ok(()) => {}
        Err(RednoteError::Timeout(_)) => {
            return Err(RednoteError::Interaction(
                "comment box still holds the submitted text".into(),
            )
            .in_phase(Phase::CommentVerify));
        }
        Err(e) => return Err(e.in_phase(Phase::CommentVerify)),
    }

    info!(feed_id, "Comment posted");
    Ok(())
}
