//! Browser session handling and page primitives.
//!
//! Flows are written against the [`Page`] trait so the same step sequence runs
//! on a live Chrome tab ([`ChromePage`]) or on a scripted page in tests.
//!
//! ```text
//! Session::open → ChromePage → wait / resolve / extract → typed result
//! ```
//!
//! Every page operation is bounded by the page's deadline (if any) and aborts
//! with [`RednoteError::Cancelled`](crate::app::RednoteError::Cancelled) as soon
//! as its cancellation token fires.

mod cookies;
mod session;
pub mod resolve;
pub mod wait;

#[cfg(test)]
pub mod testing;

pub use cookies::CookieJar;
pub use resolve::{resolve_first, Resolved, Strategy};
pub use session::{with_session, ChromePage, Session};

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::app::Result;
use crate::config::TimeoutConfig;

/// A single browser tab, scoped by a deadline and a cancellation token.
///
/// Selector-based methods locate their element on every call; nothing holds
/// on to DOM handles between steps.
#[async_trait]
pub trait Page: Clone + Send + Sync {
    /// Copy of this page whose deadline is at most `timeout` from now.
    fn with_timeout(&self, timeout: Duration) -> Self;

    /// Copy of this page with no deadline; only cancellation ends its waits.
    fn without_timeout(&self) -> Self;

    fn with_cancellation(&self, cancel: CancellationToken) -> Self;

    fn deadline(&self) -> Option<Instant>;

    fn cancellation(&self) -> &CancellationToken;

    fn timeouts(&self) -> &TimeoutConfig;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// Evaluate a script expression and return its JSON value (`null` for undefined).
    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value>;

    /// Whether `selector` currently matches. Absence is `Ok(false)`.
    async fn has(&self, selector: &str) -> Result<bool>;

    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// Visible text of every element matching `selector`, in document order.
    async fn texts(&self, selector: &str) -> Result<Vec<String>>;

    /// Click the `index`-th element matching `selector`.
    async fn click(&self, selector: &str, index: usize) -> Result<()>;

    /// Focus the element and type `text` into it as key events.
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    /// Focus the element and press a named key ("Enter", "ArrowDown", ...).
    async fn press_key(&self, selector: &str, key: &str) -> Result<()>;

    /// Assign local files to a file input in one operation.
    async fn set_files(&self, selector: &str, paths: &[PathBuf]) -> Result<()>;
}

/// Deadline `timeout` from now, never later than `current`.
pub(crate) fn narrowed_deadline(current: Option<Instant>, timeout: Duration) -> Option<Instant> {
    let candidate = Instant::now() + timeout;
    Some(match current {
        Some(existing) if existing < candidate => existing,
        _ => candidate,
    })
}

/// Quote a string as a JavaScript literal.
pub(crate) fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
