use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::{
    GetDocumentParams, QuerySelectorParams, SetFileInputFilesParams,
};
use chromiumoxide::cdp::browser_protocol::network::SetCookiesParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page as CdpPage;
use futures::{FutureExt, StreamExt};
use serde_json::Value;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::{Result, RednoteError};
use crate::browser::cookies::{cookie_param, CookieJar};
use crate::browser::{js_string, narrowed_deadline, Page};
use crate::config::{BrowserSettings, TimeoutConfig};

/// One browser process and the tab opened in it.
///
/// Owned by a single operation. Chrome runs on a profile directory private
/// to the session, removed when the session is dropped; the login carries
/// over through the [`CookieJar`]. [`Session::close`] shuts the tab and the
/// process down; dropping a session without closing it still kills the
/// child process through chromiumoxide's `Browser` drop.
pub struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<CdpPage>,
    settings: BrowserSettings,
    jar: Option<CookieJar>,
    profile: TempDir,
}

impl Session {
    /// Launch a browser configured from `settings`.
    pub async fn open(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .window_size(settings.window_width, settings.window_height);

        if !settings.headless {
            builder = builder.with_head();
        }

        if let Some(ref path) = settings.binary_path {
            builder = builder.chrome_executable(path);
        }

        let profile = session_profile()?;
        builder = builder.user_data_dir(profile.path());

        let browser_config = builder
            .build()
            .map_err(|e| RednoteError::Launch(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            RednoteError::Launch(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        info!(
            headless = settings.headless,
            profile = %profile.path().display(),
            "Browser session opened"
        );

        Ok(Self {
            browser,
            handler,
            page: None,
            settings: settings.clone(),
            jar: settings.resolved_cookies_path().map(CookieJar::new),
            profile,
        })
    }

    /// Open the session's tab.
    pub async fn new_page(&mut self) -> Result<ChromePage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RednoteError::Launch(format!("Failed to create page: {}", e)))?;

        if let Some(ref ua) = self.settings.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| RednoteError::Launch(format!("Failed to set user agent: {}", e)))?;
        }

        self.restore_cookies(&page).await?;

        self.page = Some(page.clone());
        Ok(ChromePage::new(page, self.settings.timeouts.clone()))
    }

    async fn restore_cookies(&self, page: &CdpPage) -> Result<()> {
        let Some(ref jar) = self.jar else {
            return Ok(());
        };

        let params: Vec<_> = jar.load()?.iter().filter_map(cookie_param).collect();
        if params.is_empty() {
            return Ok(());
        }

        let count = params.len();
        match page.execute(SetCookiesParams::new(params)).await {
            Ok(_) => debug!(count, path = %jar.path().display(), "Restored cookies"),
            Err(e) => warn!("Failed to restore cookies: {}", e),
        }
        Ok(())
    }

    async fn persist_cookies(&self, page: &CdpPage) {
        let Some(ref jar) = self.jar else {
            return;
        };

        let cookies = match page.get_cookies().await {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!("Failed to read cookies: {}", e);
                return;
            }
        };

        let saved = serde_json::to_value(cookies)
            .map_err(RednoteError::from)
            .and_then(|value| match value {
                Value::Array(cookies) => jar.save(cookies),
                _ => Ok(0),
            });
        if let Err(e) = saved {
            warn!(path = %jar.path().display(), "Failed to save cookies: {}", e);
        }
    }

    /// Save cookies, close the tab, then the browser. Failures are logged,
    /// not returned.
    pub async fn close(mut self) {
        if let Some(page) = self.page.take() {
            self.persist_cookies(&page).await;
            if let Err(e) = page.close().await {
                warn!("Failed to close page: {}", e);
            }
        }

        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to reap browser process: {}", e);
        }

        self.handler.abort();
        debug!(profile = %self.profile.path().display(), "Browser session closed");
    }
}

/// Empty Chrome profile directory owned by one session.
fn session_profile() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix("rednote-profile-").tempdir()?)
}

/// Run `flow` on a fresh session and release the session on every exit path.
///
/// The page handed to `flow` is bound to `cancel`. The tab and browser are
/// closed after success, error and cancellation alike; a panic inside `flow`
/// is resumed after the release.
pub async fn with_session<T, F, Fut>(
    settings: &BrowserSettings,
    cancel: &CancellationToken,
    flow: F,
) -> Result<T>
where
    F: FnOnce(ChromePage) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(RednoteError::Cancelled);
    }

    let mut session = Session::open(settings).await?;
    let page = match session.new_page().await {
        Ok(page) => page.with_cancellation(cancel.clone()),
        Err(e) => {
            session.close().await;
            return Err(e);
        }
    };

    let outcome = AssertUnwindSafe(flow(page)).catch_unwind().await;
    session.close().await;

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// [`Page`] backed by a chromiumoxide tab.
#[derive(Clone)]
pub struct ChromePage {
    inner: CdpPage,
    timeouts: TimeoutConfig,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl ChromePage {
    pub fn new(inner: CdpPage, timeouts: TimeoutConfig) -> Self {
        Self {
            inner,
            timeouts,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Bound `fut` by the page deadline and cancellation token.
    async fn guard<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send,
    {
        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| RednoteError::Timeout(what.to_string()))?,
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RednoteError::Cancelled),
            result = bounded => result,
        }
    }

    /// Poll until `selector` matches, like a waiting element lookup.
    async fn element(&self, selector: &str) -> Result<Element> {
        let poll = self.timeouts.poll_interval();
        loop {
            match self.inner.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(e) => debug!("{} not attached yet: {}", selector, e),
            }

            if self.deadline.is_some_and(|d| Instant::now() + poll >= d) {
                return Err(RednoteError::ElementNotFound(selector.to_string()));
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(RednoteError::Cancelled),
                _ = tokio::time::sleep(poll) => {}
            }
        }
    }

    async fn eval_value(&self, expression: &str) -> Result<Value> {
        let result = self
            .inner
            .evaluate(expression)
            .await
            .map_err(|e| RednoteError::Interaction(format!("Script execution failed: {}", e)))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Page for ChromePage {
    fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            deadline: narrowed_deadline(self.deadline, timeout),
            ..self.clone()
        }
    }

    fn without_timeout(&self) -> Self {
        Self {
            deadline: None,
            ..self.clone()
        }
    }

    fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.guard(url, async {
            self.inner
                .goto(url)
                .await
                .map_err(|e| RednoteError::Navigation(format!("{}: {}", url, e)))?;
            Ok(())
        })
        .await
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        self.guard("script evaluation", self.eval_value(expression))
            .await
    }

    async fn has(&self, selector: &str) -> Result<bool> {
        let script = format!("document.querySelector({}) !== null", js_string(selector));
        let value = self.guard(selector, self.eval_value(&script)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({});
                if (!el) return false;
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                return rect.width > 0 && rect.height > 0
                    && style.visibility !== 'hidden' && style.display !== 'none';
            }})()"#,
            js_string(selector)
        );
        let value = self.guard(selector, self.eval_value(&script)).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(el => el.innerText || '')",
            js_string(selector)
        );
        let value = self.guard(selector, self.eval_value(&script)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn click(&self, selector: &str, index: usize) -> Result<()> {
        self.guard(selector, async {
            let element = if index == 0 {
                self.element(selector).await?
            } else {
                let mut elements = self.inner.find_elements(selector).await.map_err(|e| {
                    RednoteError::ElementNotFound(format!("{}: {}", selector, e))
                })?;
                if index >= elements.len() {
                    return Err(RednoteError::ElementNotFound(format!(
                        "{} (index {} of {})",
                        selector,
                        index,
                        elements.len()
                    )));
                }
                elements.swap_remove(index)
            };

            element
                .click()
                .await
                .map_err(|e| RednoteError::Interaction(format!("click {}: {}", selector, e)))?;
            Ok(())
        })
        .await
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.guard(selector, async {
            let element = self.element(selector).await?;
            element
                .focus()
                .await
                .map_err(|e| RednoteError::Interaction(format!("focus {}: {}", selector, e)))?;
            element
                .type_str(text)
                .await
                .map_err(|e| RednoteError::Interaction(format!("type into {}: {}", selector, e)))?;
            Ok(())
        })
        .await
    }

    async fn press_key(&self, selector: &str, key: &str) -> Result<()> {
        self.guard(selector, async {
            let element = self.element(selector).await?;
            element
                .focus()
                .await
                .map_err(|e| RednoteError::Interaction(format!("focus {}: {}", selector, e)))?;
            element
                .press_key(key)
                .await
                .map_err(|e| RednoteError::Interaction(format!("press {} on {}: {}", key, selector, e)))?;
            Ok(())
        })
        .await
    }

    async fn set_files(&self, selector: &str, paths: &[PathBuf]) -> Result<()> {
        let files: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();

        self.guard(selector, async {
            // Wait for the input before resolving its node id.
            self.element(selector).await?;

            let doc = self
                .inner
                .execute(GetDocumentParams::builder().depth(0).build())
                .await
                .map_err(|e| RednoteError::Interaction(format!("Failed to get document: {}", e)))?;

            let query = QuerySelectorParams::new(doc.result.root.node_id, selector);
            let node = self
                .inner
                .execute(query)
                .await
                .map_err(|e| RednoteError::ElementNotFound(format!("{}: {}", selector, e)))?;

            let mut set_files = SetFileInputFilesParams::new(files);
            set_files.node_id = Some(node.result.node_id);
            self.inner
                .execute(set_files)
                .await
                .map_err(|e| RednoteError::Interaction(format!("Failed to set files: {}", e)))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_session_gets_its_own_profile() {
        let first = session_profile().unwrap();
        let second = session_profile().unwrap();

        assert_ne!(first.path(), second.path());
        assert!(first.path().is_dir());
        assert!(std::fs::read_dir(second.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_profile_removed_on_drop() {
        let profile = session_profile().unwrap();
        let path = profile.path().to_path_buf();
        drop(profile);
        assert!(!path.exists());
    }
}
