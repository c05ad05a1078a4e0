//! Synchronization against the page.
//!
//! Prefer [`wait_for`] whenever a checkable condition exists: it returns as
//! soon as the predicate holds and fails with a timeout otherwise.
//! [`settle`] is the only wait that observes nothing and exists for steps the
//! platform gives no completion signal for.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::app::{Result, RednoteError};
use crate::browser::Page;

const STABILITY_OBSERVER: &str = r#"(() => {
    if (!window.__rednoteMutations) {
        window.__rednoteMutations = { last: performance.now() };
        new MutationObserver(() => { window.__rednoteMutations.last = performance.now(); })
            .observe(document.documentElement, { childList: true, subtree: true, attributes: true, characterData: true });
    }
    return true;
})()"#;

const DOCUMENT_COMPLETE: &str = "document.readyState === 'complete'";

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Sleep one poll interval, failing once the page deadline has passed.
async fn pause<P: Page>(page: &P, what: &str) -> Result<()> {
    let interval = page.timeouts().poll_interval();
    if let Some(deadline) = page.deadline() {
        let now = Instant::now();
        if now >= deadline {
            return Err(RednoteError::Timeout(what.to_string()));
        }
        let wake = (now + interval).min(deadline);
        tokio::select! {
            _ = page.cancellation().cancelled() => Err(RednoteError::Cancelled),
            _ = tokio::time::sleep_until(wake) => Ok(()),
        }
    } else {
        tokio::select! {
            _ = page.cancellation().cancelled() => Err(RednoteError::Cancelled),
            _ = tokio::time::sleep(interval) => Ok(()),
        }
    }
}

/// Re-evaluate `predicate` until it is truthy or the page deadline passes.
pub async fn wait_for<P: Page>(page: &P, what: &str, predicate: &str) -> Result<()> {
    loop {
        if truthy(&page.evaluate(predicate).await?) {
            return Ok(());
        }
        pause(page, what).await?;
    }
}

/// Wait for the document to finish loading.
pub async fn wait_load<P: Page>(page: &P) -> Result<()> {
    wait_for(page, "document load", DOCUMENT_COMPLETE).await
}

/// Wait until `selector` is attached to the DOM.
pub async fn wait_present<P: Page>(page: &P, selector: &str) -> Result<()> {
    loop {
        if page.has(selector).await? {
            return Ok(());
        }
        pause(page, selector).await?;
    }
}

/// Wait until `selector` is attached and rendered with a non-empty box.
pub async fn wait_visible<P: Page>(page: &P, selector: &str) -> Result<()> {
    loop {
        if page.is_visible(selector).await? {
            return Ok(());
        }
        pause(page, selector).await?;
    }
}

/// Wait for the load event, then for the DOM to stop mutating for the
/// configured quiet window.
pub async fn wait_stable<P: Page>(page: &P) -> Result<()> {
    wait_load(page).await?;
    page.evaluate(STABILITY_OBSERVER).await?;

    let quiet_ms = page.timeouts().stable_quiet().as_millis();
    let predicate = format!(
        "!!window.__rednoteMutations && performance.now() - window.__rednoteMutations.last >= {}",
        quiet_ms
    );
    wait_for(page, "DOM stability", &predicate).await
}

/// Fixed delay for steps with no observable completion signal.
///
/// Every call is logged with its reason so timing-dependent failures can be
/// traced back to the delay that was too short.
pub async fn settle<P: Page>(page: &P, reason: &str, delay: Duration) -> Result<()> {
    debug!(reason, delay_ms = delay.as_millis() as u64, "settle");
    tokio::select! {
        _ = page.cancellation().cancelled() => Err(RednoteError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
