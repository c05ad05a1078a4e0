//! Typed extraction from the page's injected state.
//!
//! Once client-side rendering completes the platform exposes its store as
//! `window.__INITIAL_STATE__`. That object is the only machine-readable view
//! of the page, has no schema and no version. Reading it goes:
//!
//! ```text
//! navigate → stable DOM → state has required sub-path → JSON.stringify → decode sub-tree
//! ```
//!
//! Decoding only looks at the sub-tree the caller needs and ignores unknown
//! fields. A missing blob, a missing sub-path and a malformed sub-tree are
//! distinct [`ExtractError`]s; a well-formed empty list is a valid result.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::app::{ExtractError, Result};
use crate::browser::{wait, Page};
use crate::domain::{Feed, FeedDetail};

/// Serializes the injected state, or returns `""` when there is none.
pub const STATE_JSON_SCRIPT: &str = r#"(() => {
    if (window.__INITIAL_STATE__) {
        return JSON.stringify(window.__INITIAL_STATE__);
    }
    return "";
})()"#;

/// Which part of the injected state a flow reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateRoot {
    HomeFeed,
    Search,
    NoteDetail,
}

impl StateRoot {
    /// Script that holds once the state carries this root's data.
    pub fn ready_predicate(self) -> &'static str {
        match self {
            StateRoot::HomeFeed => {
                "(() => { const s = window.__INITIAL_STATE__; return !!(s && s.feed && s.feed.feeds); })()"
            }
            StateRoot::Search => "window.__INITIAL_STATE__ !== undefined",
            StateRoot::NoteDetail => {
                "(() => { const s = window.__INITIAL_STATE__; return !!(s && s.note && s.note.noteDetailMap); })()"
            }
        }
    }

    fn section(self) -> &'static str {
        match self {
            StateRoot::HomeFeed => "feed",
            StateRoot::Search => "search",
            StateRoot::NoteDetail => "note",
        }
    }
}

/// Navigate to `url` and return the serialized injected state once `root` is present.
pub async fn load_state<P: Page>(page: &P, url: &str, root: StateRoot) -> Result<String> {
    page.navigate(url).await?;
    wait::wait_stable(page).await?;
    wait::wait_for(page, "__INITIAL_STATE__", root.ready_predicate()).await?;

    let value = page.evaluate(STATE_JSON_SCRIPT).await?;
    match value.as_str() {
        Some(raw) if !raw.is_empty() => {
            debug!(root = ?root, bytes = raw.len(), "Read injected state");
            Ok(raw.to_string())
        }
        _ => Err(ExtractError::StateMissing.into()),
    }
}

fn parse_state(raw: &str) -> std::result::Result<Value, ExtractError> {
    if raw.trim().is_empty() {
        return Err(ExtractError::StateMissing);
    }
    let state: Value = serde_json::from_str(raw)?;
    if !state.is_object() {
        return Err(ExtractError::StateMissing);
    }
    Ok(state)
}

fn descend<'a>(state: &'a Value, path: &[&str]) -> std::result::Result<&'a Value, ExtractError> {
    let mut node = state;
    for (depth, key) in path.iter().enumerate() {
        node = node
            .get(*key)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ExtractError::MissingKey(path[..=depth].join(".")))?;
    }
    Ok(node)
}

fn decode<T: DeserializeOwned>(node: &Value) -> std::result::Result<T, ExtractError> {
    Ok(T::deserialize(node)?)
}

/// Decode the feed list under `<section>.feeds._value`.
///
/// List payloads are Vue refs; `value` is accepted for unwrapped refs.
pub fn decode_feeds(raw: &str, root: StateRoot) -> std::result::Result<Vec<Feed>, ExtractError> {
    let state = parse_state(raw)?;
    let section = root.section();
    let feeds = descend(&state, &[section, "feeds"])?;

    let list = feeds
        .get("_value")
        .or_else(|| feeds.get("value"))
        .ok_or_else(|| ExtractError::MissingKey(format!("{}.feeds._value", section)))?;

    decode(list)
}

/// Decode `note.noteDetailMap[feed_id]`.
pub fn decode_note(raw: &str, feed_id: &str) -> std::result::Result<FeedDetail, ExtractError> {
    let state = parse_state(raw)?;
    let entry = descend(&state, &["note", "noteDetailMap", feed_id])?;
    decode(entry)
}
