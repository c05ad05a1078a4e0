//! Image post publishing through the creator composer.
//!
//! The flow is an explicit state machine; each state is one phase of the
//! composer and failures are reported with the phase they occurred in:
//!
//! ```text
//! OpenComposer → SelectImageTab → Upload → FillTitle → FillBody → Submit → Verify → Done
//! ```
//!
//! Tag entry happens inside `FillBody` and is labelled `TagInput`.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::{Phase, PhaseExt, Result, RednoteError};
use crate::browser::{js_string, resolve_first, wait, Page, Strategy};
use crate::domain::{validate_title, PublishImageContent};

pub const PUBLISH_URL: &str = "https://creator.xiaohongshu.com/publish/publish?source=official";

const UPLOAD_CONTAINER: &str = "div.upload-content";
const CREATOR_TAB: &str = "div.creator-tab";
const IMAGE_TAB_LABEL: &str = "上传图文";
const UPLOAD_INPUT: &str = ".upload-input";
const TITLE_INPUT: &str = "div.d-input input";
const SUBMIT_BUTTON: &str = "div.submit div.d-button-content";
const TOPIC_ITEM: &str = "#creator-editor-topic-container .item";

const BODY_EDITOR: [Strategy; 2] = [
    Strategy::Selector("div.ql-editor"),
    Strategy::PlaceholderAncestor {
        tag: "p",
        placeholder: "输入正文描述",
        role: "textbox",
        max_depth: 5,
    },
];

/// Presses of ArrowDown that move the caret past any multi-line body.
const CURSOR_ADVANCE_PRESSES: usize = 20;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether the platform acknowledged the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    Confirmed,
    Unconfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PublishState {
    OpenComposer,
    SelectImageTab,
    Upload,
    FillTitle,
    FillBody,
    Submit,
    Verify,
    Done(PublishOutcome),
}

/// Publish an image post. Input is validated before the composer is opened.
///
/// Opening the composer and picking the tab share the page timeout, the
/// upload has its own bound, and every later step gets a fresh page timeout
/// of its own. Tags are bounded one at a time, so a long tag list never
/// runs into a deadline meant for a single step.
pub async fn publish<P: Page>(page: &P, content: &PublishImageContent) -> Result<PublishOutcome> {
    validate_title(&content.title)?;
    content.validate()?;

    let step_timeout = page.timeouts().page();
    let setup = page.with_timeout(step_timeout);
    let mut state = PublishState::OpenComposer;

    loop {
        debug!(state = ?state, "Publish step");
        state = match state {
            PublishState::OpenComposer => {
                open_composer(&setup).await.phase(Phase::OpenComposer)?;
                PublishState::SelectImageTab
            }
            PublishState::SelectImageTab => {
                select_image_tab(&setup).await.phase(Phase::SelectImageTab)?;
                PublishState::Upload
            }
            PublishState::Upload => {
                upload_images(page, content).await.phase(Phase::Upload)?;
                PublishState::FillTitle
            }
            PublishState::FillTitle => {
                fill_title(&page.with_timeout(step_timeout), &content.title)
                    .await
                    .phase(Phase::FillTitle)?;
                PublishState::FillBody
            }
            PublishState::FillBody => {
                let editor = fill_body(&page.with_timeout(step_timeout), &content.content)
                    .await
                    .phase(Phase::FillBody)?;
                input_tags(page, &editor, &content.tags)
                    .await
                    .phase(Phase::TagInput)?;
                PublishState::Submit
            }
            PublishState::Submit => {
                submit(&page.with_timeout(step_timeout)).await.phase(Phase::Submit)?;
                PublishState::Verify
            }
            PublishState::Verify => PublishState::Done(verify(page).await?),
            PublishState::Done(outcome) => {
                info!(title = %content.title, outcome = ?outcome, "Publish finished");
                return Ok(outcome);
            }
        };
    }
}

async fn open_composer<P: Page>(page: &P) -> Result<()> {
    page.navigate(PUBLISH_URL).await?;
    wait::wait_visible(page, UPLOAD_CONTAINER).await?;
    info!("Composer ready");
    wait::settle(page, "composer render", Duration::from_secs(1)).await
}

/// Click the image post tab. A missing or unclickable tab is only logged.
async fn select_image_tab<P: Page>(page: &P) -> Result<()> {
    let labels = page.texts(CREATOR_TAB).await?;
    debug!(count = labels.len(), "Found creator tabs");

    match labels.iter().position(|l| l.trim() == IMAGE_TAB_LABEL) {
        Some(index) => match page.click(CREATOR_TAB, index).await {
            Ok(()) => {}
            Err(RednoteError::Cancelled) => return Err(RednoteError::Cancelled),
            Err(e) => warn!("Could not click image tab: {}", e),
        },
        None => warn!("Image tab not found, staying on current tab"),
    }

    wait::settle(page, "tab switch", Duration::from_secs(1)).await
}

async fn upload_images<P: Page>(page: &P, content: &PublishImageContent) -> Result<()> {
    let page = page.with_timeout(page.timeouts().upload());

    wait::wait_present(&page, UPLOAD_INPUT).await?;
    page.set_files(UPLOAD_INPUT, &content.image_paths).await?;
    info!(count = content.image_paths.len(), "Images attached");

    wait::settle(&page, "image upload", Duration::from_secs(3)).await
}

async fn fill_title<P: Page>(page: &P, title: &str) -> Result<()> {
    wait::wait_present(page, TITLE_INPUT).await?;
    page.type_text(TITLE_INPUT, title).await?;
    wait::settle(page, "title input", Duration::from_secs(1)).await
}

/// Type the body and return the selector of the resolved editor.
async fn fill_body<P: Page>(page: &P, body: &str) -> Result<String> {
    let editor = resolve_first(page, "body editor", &BODY_EDITOR).await?;
    page.type_text(&editor.selector, body).await?;
    Ok(editor.selector)
}

/// Append tags on their own paragraph after the body.
///
/// The caret is moved to the end of the body, two line breaks are inserted,
/// then each tag is typed as `#tag` and committed through the topic dropdown
/// when it offers a suggestion, or with a trailing space when it does not.
/// Leading `#` characters are stripped and tags left empty are skipped.
async fn input_tags<P: Page>(page: &P, editor: &str, tags: &[String]) -> Result<()> {
    let tags: Vec<&str> = tags
        .iter()
        .map(|t| t.trim().trim_start_matches('#'))
        .filter(|t| !t.is_empty())
        .collect();
    if tags.is_empty() {
        return Ok(());
    }

    let step_timeout = page.timeouts().page();
    let caret = page.with_timeout(step_timeout);
    wait::settle(&caret, "editor focus", Duration::from_secs(1)).await?;
    for _ in 0..CURSOR_ADVANCE_PRESSES {
        caret.press_key(editor, "ArrowDown").await?;
        wait::settle(&caret, "cursor advance", Duration::from_millis(10)).await?;
    }
    caret.press_key(editor, "Enter").await?;
    caret.press_key(editor, "Enter").await?;
    wait::settle(&caret, "tag paragraph", Duration::from_secs(1)).await?;

    for tag in tags {
        input_tag(&page.with_timeout(step_timeout), editor, tag).await?;
    }
    Ok(())
}

async fn input_tag<P: Page>(page: &P, editor: &str, tag: &str) -> Result<()> {
    page.type_text(editor, "#").await?;
    wait::settle(page, "topic trigger", Duration::from_millis(200)).await?;

    for ch in tag.chars() {
        page.type_text(editor, &ch.to_string()).await?;
        wait::settle(page, "tag keystroke", Duration::from_millis(50)).await?;
    }
    wait::settle(page, "topic suggestions", Duration::from_secs(1)).await?;

    if page.has(TOPIC_ITEM).await? {
        page.click(TOPIC_ITEM, 0).await?;
        debug!(tag, "Picked topic suggestion");
        wait::settle(page, "topic pick", Duration::from_millis(200)).await?;
    } else {
        debug!(tag, "No topic suggestion, ending tag with a space");
        page.type_text(editor, " ").await?;
    }

    wait::settle(page, "tag commit", Duration::from_millis(500)).await
}

async fn submit<P: Page>(page: &P) -> Result<()> {
    wait::settle(page, "before submit", Duration::from_secs(1)).await?;
    wait::wait_present(page, SUBMIT_BUTTON).await?;
    page.click(SUBMIT_BUTTON, 0).await?;
    info!("Publish submitted");
    wait::settle(page, "after submit", Duration::from_secs(3)).await
}

fn success_predicate() -> String {
    format!(
        r#"(() => {{
            if (!location.pathname.startsWith('/publish/publish')) return true;
            if (document.querySelector('.success-container')) return true;
            return (document.body && document.body.innerText || '').includes({text});
        }})()"#,
        text = js_string("发布成功"),
    )
}

/// Look for a sign that the post was accepted. Absence is not an error.
async fn verify<P: Page>(page: &P) -> Result<PublishOutcome> {
    let bounded = page.with_timeout(VERIFY_TIMEOUT);
    match wait::wait_for(&bounded, "publish confirmation", &success_predicate()).await {
        Ok(()) => Ok(PublishOutcome::Confirmed),
        Err(RednoteError::Cancelled) => Err(RednoteError::Cancelled),
        Err(e) => {
            warn!("Publish not confirmed: {}", e);
            Ok(PublishOutcome::Unconfirmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::browser::testing::FakePage;
    use serde_json::json;

    fn composer() -> FakePage {
        let page = FakePage::new();
        page.add_element(UPLOAD_CONTAINER);
        page.set_texts(CREATOR_TAB, &["上传视频", "上传图文", "写长文"]);
        page.add_element(UPLOAD_INPUT);
        page.add_element(TITLE_INPUT);
        page.add_element("div.ql-editor");
        page.add_element(SUBMIT_BUTTON);
        page.on_eval("输入正文描述", json!(false));
        page
    }

    fn post(tags: &[&str]) -> PublishImageContent {
        PublishImageContent::new(
            "Morning coffee",
            "Flat white at the corner cafe",
            tags.iter().map(|t| t.to_string()).collect(),
            vec![PathBuf::from("/tmp/a.jpg"), PathBuf::from("/tmp/b.jpg")],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_runs_phases_in_order() {
        let page = composer();

        let outcome = publish(&page, &post(&[])).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Confirmed);
        assert_eq!(
            page.calls(),
            vec![
                format!("navigate {}", PUBLISH_URL),
                format!("click {}#1", CREATOR_TAB),
                format!("files {} 2", UPLOAD_INPUT),
                format!("type {} Morning coffee", TITLE_INPUT),
                "type div.ql-editor Flat white at the corner cafe".to_string(),
                format!("click {}#0", SUBMIT_BUTTON),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_sequence_without_suggestions() {
        let page = composer();

        publish(&page, &post(&["#ab"])).await.unwrap();

        let calls = page.calls();
        let body = calls
            .iter()
            .position(|c| c == "type div.ql-editor Flat white at the corner cafe")
            .unwrap();
        let tag_calls = &calls[body + 1..calls.len() - 1];

        let arrows = tag_calls
            .iter()
            .filter(|c| *c == "press div.ql-editor ArrowDown")
            .count();
        assert_eq!(arrows, 20);
        assert_eq!(
            &tag_calls[20..],
            &[
                "press div.ql-editor Enter",
                "press div.ql-editor Enter",
                "type div.ql-editor #",
                "type div.ql-editor a",
                "type div.ql-editor b",
                "type div.ql-editor  ",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_commits_through_suggestion() {
        let page = composer();
        page.add_element(TOPIC_ITEM);

        publish(&page, &post(&["cafe"])).await.unwrap();

        let calls = page.calls();
        assert!(calls.contains(&format!("click {}#0", TOPIC_ITEM)));
        assert!(!calls.contains(&"type div.ql-editor  ".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_upload_input_is_upload_phase_error() {
        let page = FakePage::new();
        page.add_element(UPLOAD_CONTAINER);

        let err = publish(&page, &post(&[])).await.unwrap_err();
        assert!(matches!(
            err,
            RednoteError::Phase { phase: Phase::Upload, .. }
        ));
        assert!(matches!(err.root(), RednoteError::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_editor_is_fill_body_error() {
        let page = FakePage::new();
        page.add_element(UPLOAD_CONTAINER);
        page.add_element(UPLOAD_INPUT);
        page.add_element(TITLE_INPUT);
        page.on_eval("输入正文描述", json!(false));

        let err = publish(&page, &post(&[])).await.unwrap_err();
        assert!(matches!(
            err,
            RednoteError::Phase { phase: Phase::FillBody, .. }
        ));
        assert!(matches!(err.root(), RednoteError::ElementNotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_publish_is_not_an_error() {
        let page = composer();
        page.on_eval("发布成功", json!(false));

        let outcome = publish(&page, &post(&[])).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Unconfirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_tag_list_outlasts_page_timeout() {
        let page = composer();
        let tags: Vec<String> = (0..25).map(|i| format!("coffeetag{}", i % 10)).collect();
        let tags: Vec<&str> = tags.iter().map(String::as_str).collect();

        let outcome = publish(&page, &post(&tags)).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Confirmed);

        let calls = page.calls();
        let triggers = calls.iter().filter(|c| *c == "type div.ql-editor #").count();
        assert_eq!(triggers, 25);
        assert_eq!(calls.last().unwrap(), &format!("click {}#0", SUBMIT_BUTTON));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hashes_stripped_from_literal_content() {
        let page = composer();
        let content = PublishImageContent {
            title: "Morning coffee".into(),
            content: "Flat white".into(),
            tags: vec!["##foo".into(), "#".into()],
            image_paths: vec![PathBuf::from("/tmp/a.jpg")],
        };

        publish(&page, &content).await.unwrap();

        let calls = page.calls();
        let triggers = calls.iter().filter(|c| *c == "type div.ql-editor #").count();
        assert_eq!(triggers, 1);
        let start = calls.iter().position(|c| c == "type div.ql-editor #").unwrap();
        assert_eq!(
            &calls[start + 1..start + 4],
            &["type div.ql-editor f", "type div.ql-editor o", "type div.ql-editor o"]
        );
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_before_navigation() {
        let page = composer();

        let wide = PublishImageContent::new("咖".repeat(21), "body", vec![], vec![PathBuf::from("a.jpg")]);
        assert!(matches!(
            publish(&page, &wide).await,
            Err(RednoteError::Validation(_))
        ));

        let no_images = PublishImageContent::new("ok", "body", vec![], vec![]);
        assert!(matches!(
            publish(&page, &no_images).await,
            Err(RednoteError::Validation(_))
        ));
        assert!(page.calls().is_empty());
    }
}
