//! Element resolution across markup variants.
//!
//! The platform serves structurally different markup for the same control
//! depending on the account cohort. Each variant is described by a
//! [`Strategy`]; [`resolve_first`] tries all of them concurrently under one
//! deadline and commits to whichever matches first.

use std::future::Future;
use std::pin::Pin;

use futures::future::select_ok;
use tracing::{debug, warn};

use crate::app::{Result, RednoteError};
use crate::browser::{js_string, wait, Page};

/// Attribute used to tag elements found by structural strategies.
const MARKER_ATTR: &str = "data-rednote-resolved";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// The element is matched directly by a selector.
    Selector(&'static str),
    /// An element of `tag` whose `data-placeholder` contains `placeholder`,
    /// walked up at most `max_depth` ancestors to the nearest `role` holder.
    PlaceholderAncestor {
        tag: &'static str,
        placeholder: &'static str,
        role: &'static str,
        max_depth: usize,
    },
}

/// A committed resolution: a selector that matches the element now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub selector: String,
    pub strategy: usize,
}

impl Strategy {
    /// Script that tags the element with `marker` and reports whether it found one.
    fn tagging_script(&self, marker: &str) -> Option<String> {
        match self {
            Strategy::Selector(_) => None,
            Strategy::PlaceholderAncestor {
                tag,
                placeholder,
                role,
                max_depth,
            } => Some(format!(
                r#"(() => {{
                    const wanted = {placeholder};
                    const start = Array.from(document.querySelectorAll({tag}))
                        .find(el => (el.getAttribute('data-placeholder') || '').includes(wanted));
                    if (!start) return false;
                    let node = start;
                    for (let i = 0; i < {max_depth}; i++) {{
                        node = node.parentElement;
                        if (!node) return false;
                        if (node.getAttribute('role') === {role}) {{
                            node.setAttribute({attr}, {marker});
                            return true;
                        }}
                    }}
                    return false;
                }})()"#,
                placeholder = js_string(placeholder),
                tag = js_string(tag),
                role = js_string(role),
                max_depth = max_depth,
                attr = js_string(MARKER_ATTR),
                marker = js_string(marker),
            )),
        }
    }

    fn resolved_selector(&self, marker: &str) -> String {
        match self {
            Strategy::Selector(selector) => selector.to_string(),
            Strategy::PlaceholderAncestor { .. } => format!("[{}=\"{}\"]", MARKER_ATTR, marker),
        }
    }
}

async fn try_strategy<P: Page>(page: &P, name: &str, index: usize, strategy: &Strategy) -> Result<Resolved> {
    let marker = format!("{}-{}", name, index);
    let selector = strategy.resolved_selector(&marker);

    let outcome = match strategy.tagging_script(&marker) {
        None => wait::wait_present(page, &selector).await,
        Some(script) => wait::wait_for(page, name, &script).await,
    };

    match outcome {
        Ok(()) => {
            debug!(name, strategy = index, selector = %selector, "Resolved element");
            Ok(Resolved {
                selector,
                strategy: index,
            })
        }
        Err(RednoteError::Timeout(_)) => Err(RednoteError::ElementNotFound(format!(
            "{} via strategy {}",
            name, index
        ))),
        Err(e) => Err(e),
    }
}

/// Try every strategy concurrently and return the first match.
///
/// All attempts share the page deadline narrowed to the configured resolution
/// bound. When none matches the result is `ElementNotFound`; cancellation is
/// reported as such.
pub async fn resolve_first<P: Page>(page: &P, name: &str, strategies: &[Strategy]) -> Result<Resolved> {
    if strategies.is_empty() {
        return Err(RednoteError::ElementNotFound(format!("{}: no strategies", name)));
    }

    let bounded = page.with_timeout(page.timeouts().resolve());
    let attempts: Vec<Pin<Box<dyn Future<Output = Result<Resolved>> + Send + '_>>> = strategies
        .iter()
        .enumerate()
        .map(|(index, strategy)| {
            Box::pin(try_strategy(&bounded, name, index, strategy))
                as Pin<Box<dyn Future<Output = Result<Resolved>> + Send + '_>>
        })
        .collect();

    let outcome = select_ok(attempts).await;
    match outcome {
        Ok((resolved, _pending)) => Ok(resolved),
        Err(RednoteError::Cancelled) => Err(RednoteError::Cancelled),
        Err(last) => {
            warn!(name, "No strategy resolved: {}", last);
            Err(RednoteError::ElementNotFound(name.to_string()))
        }
    }
}
