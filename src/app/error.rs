use std::fmt;

use thiserror::Error;

/// Why the injected page state could not be turned into a typed record.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// `window.__INITIAL_STATE__` was never exposed by the page.
    #[error("__INITIAL_STATE__ not found")]
    StateMissing,

    /// The state exists but the sub-tree the flow reads is absent.
    #[error("__INITIAL_STATE__ has no `{0}`")]
    MissingKey(String),

    /// The sub-tree exists but does not have the expected shape.
    #[error("failed to decode __INITIAL_STATE__: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Step of a multi-phase flow, used to label wrapped errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    OpenComposer,
    SelectImageTab,
    Upload,
    FillTitle,
    FillBody,
    TagInput,
    Submit,
    OpenNote,
    CommentInput,
    CommentSubmit,
    CommentVerify,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::OpenComposer => "open composer",
            Phase::SelectImageTab => "select image tab",
            Phase::Upload => "upload images",
            Phase::FillTitle => "fill title",
            Phase::FillBody => "fill body",
            Phase::TagInput => "tag input",
            Phase::Submit => "submit",
            Phase::OpenNote => "open note",
            Phase::CommentInput => "comment input",
            Phase::CommentSubmit => "comment submit",
            Phase::CommentVerify => "comment verify",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum RednoteError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Interaction failed: {0}")]
    Interaction(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{phase} failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: Box<RednoteError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RednoteError {
    /// Wrap `self` with the flow phase it occurred in.
    pub fn in_phase(self, phase: Phase) -> Self {
        RednoteError::Phase {
            phase,
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping phase wrappers.
    pub fn root(&self) -> &RednoteError {
        match self {
            RednoteError::Phase { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether a batch over many notes may skip this error for a single note.
    ///
    /// Cancellation and a dead browser end the whole batch.
    pub fn is_skippable(&self) -> bool {
        !matches!(
            self.root(),
            RednoteError::Cancelled | RednoteError::Launch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RednoteError>;

/// Attach a phase label to the error of a fallible step.
pub trait PhaseExt<T> {
    fn phase(self, phase: Phase) -> Result<T>;
}

impl<T> PhaseExt<T> for Result<T> {
    fn phase(self, phase: Phase) -> Result<T> {
        self.map_err(|e| e.in_phase(phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_wrapping_names_phase() {
        let err = RednoteError::ElementNotFound(".upload-input".into()).in_phase(Phase::Upload);
        assert_eq!(
            err.to_string(),
            "upload images failed: Element not found: .upload-input"
        );
        assert!(matches!(err.root(), RednoteError::ElementNotFound(_)));
    }

    #[test]
    fn test_skippable_looks_through_phase() {
        let err = RednoteError::Extraction(ExtractError::StateMissing).in_phase(Phase::OpenNote);
        assert!(err.is_skippable());
        assert!(!RednoteError::Cancelled.is_skippable());
        assert!(!RednoteError::Launch("no chrome".into()).is_skippable());
    }
}
