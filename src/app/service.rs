//! Operations as seen by the CLI: one browser session per call.

use std::path::PathBuf;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::Result;
use crate::archive::{self, ArchiveWriter, PageSource};
use crate::browser::with_session;
use crate::config::{ArchiveConfig, BrowserSettings};
use crate::domain::{validate_title, Feed, FeedDetail, PublishImageContent};
use crate::flows::{self, PublishOutcome};
use crate::images::ImageResolver;

#[derive(Debug, Clone, Serialize)]
pub struct LoginStatusResponse {
    pub is_logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    pub title: String,
    pub content: String,
    /// URLs or local paths.
    pub images: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishResponse {
    pub title: String,
    pub content: String,
    pub images: usize,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedsListResponse {
    pub feeds: Vec<Feed>,
    pub count: usize,
}

impl From<Vec<Feed>> for FeedsListResponse {
    fn from(feeds: Vec<Feed>) -> Self {
        Self {
            count: feeds.len(),
            feeds,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedDetailResponse {
    pub feed_id: String,
    pub data: FeedDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostCommentResponse {
    pub feed_id: String,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveFeedsResponse {
    pub saved: usize,
    pub files: Vec<PathBuf>,
}

pub fn publish_status(outcome: PublishOutcome) -> &'static str {
    match outcome {
        PublishOutcome::Confirmed => "published",
        PublishOutcome::Unconfirmed => "submitted (unconfirmed)",
    }
}

pub struct XhsService {
    browser: BrowserSettings,
    archive: ArchiveConfig,
    images: ImageResolver,
}

impl XhsService {
    pub fn new(browser: BrowserSettings, archive: ArchiveConfig, images: ImageResolver) -> Self {
        Self {
            browser,
            archive,
            images,
        }
    }

    pub fn browser_settings(&self) -> &BrowserSettings {
        &self.browser
    }

    pub async fn check_login_status(&self, cancel: &CancellationToken) -> Result<LoginStatusResponse> {
        let is_logged_in = with_session(&self.browser, cancel, |page| async move {
            flows::check_login_status(&page).await
        })
        .await?;

        Ok(LoginStatusResponse {
            is_logged_in,
            username: self.browser.username.clone(),
        })
    }

    /// Wait for a QR code login; the session saves its cookies on close.
    pub async fn login(&self, cancel: &CancellationToken) -> Result<LoginStatusResponse> {
        with_session(&self.browser, cancel, |page| async move { flows::login(&page).await }).await?;

        Ok(LoginStatusResponse {
            is_logged_in: true,
            username: self.browser.username.clone(),
        })
    }

    /// Validate, resolve images, then publish in a fresh session.
    pub async fn publish_content(
        &self,
        request: PublishRequest,
        cancel: &CancellationToken,
    ) -> Result<PublishResponse> {
        validate_title(&request.title)?;
        let image_paths = self.images.resolve(&request.images).await?;

        let content = PublishImageContent::new(
            request.title.clone(),
            request.content.clone(),
            request.tags,
            image_paths,
        );
        content.validate()?;

        let outcome = with_session(&self.browser, cancel, |page| async move {
            flows::publish(&page, &content).await
        })
        .await?;

        Ok(PublishResponse {
            title: request.title,
            content: request.content,
            images: request.images.len(),
            status: publish_status(outcome).to_string(),
        })
    }

    pub async fn list_feeds(&self, cancel: &CancellationToken) -> Result<FeedsListResponse> {
        let feeds = with_session(&self.browser, cancel, |page| async move {
            flows::list_feeds(&page).await
        })
        .await?;
        Ok(feeds.into())
    }

    pub async fn search_feeds(&self, keyword: &str, cancel: &CancellationToken) -> Result<FeedsListResponse> {
        let feeds = with_session(&self.browser, cancel, |page| async move {
            flows::search(&page, keyword).await
        })
        .await?;
        Ok(feeds.into())
    }

    pub async fn feed_detail(
        &self,
        feed_id: &str,
        xsec_token: &str,
        cancel: &CancellationToken,
    ) -> Result<FeedDetailResponse> {
        let data = with_session(&self.browser, cancel, |page| async move {
            flows::feed_detail(&page, feed_id, xsec_token).await
        })
        .await?;

        Ok(FeedDetailResponse {
            feed_id: feed_id.to_string(),
            data,
        })
    }

    pub async fn post_comment(
        &self,
        feed_id: &str,
        xsec_token: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<PostCommentResponse> {
        with_session(&self.browser, cancel, |page| async move {
            flows::post_comment(&page, feed_id, xsec_token, content).await
        })
        .await?;

        Ok(PostCommentResponse {
            feed_id: feed_id.to_string(),
            success: true,
            message: "comment posted".to_string(),
        })
    }

    /// Archive up to `limit` home feed notes as Markdown.
    ///
    /// `limit` and `output_dir` fall back to the `[archive]` configuration,
    /// then to 10 notes under `./content`.
    pub async fn save_recommended_feeds(
        &self,
        limit: Option<usize>,
        output_dir: Option<PathBuf>,
        cancel: &CancellationToken,
    ) -> Result<SaveFeedsResponse> {
        let limit = limit.unwrap_or(self.archive.limit);
        let output_dir = match output_dir.or_else(|| self.archive.output_dir.clone()) {
            Some(dir) => dir,
            None => std::env::current_dir()?.join("content"),
        };

        let documents = with_session(&self.browser, cancel, |page| async move {
            archive::collect(&PageSource::new(page), limit).await
        })
        .await?;

        let files = ArchiveWriter::new(output_dir).write_batch(&documents)?;
        info!(saved = files.len(), "Archive finished");

        Ok(SaveFeedsResponse {
            saved: files.len(),
            files,
        })
    }
}
