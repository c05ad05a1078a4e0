//! # rednote
//!
//! Scripted automation of the xiaohongshu (rednote) web front-end through a
//! real Chrome instance.
//!
//! ## Architecture
//!
//! The platform has no public API. Every operation drives the rendered page
//! and reads back the JSON state the front-end injects:
//!
//! ```text
//! CLI → Service → Session → Flow → wait / resolve / extract → typed result
//! ```
//!
//! - [`browser`]: Chrome session, the [`Page`](browser::Page) seam, waits and element resolution
//! - [`extract`]: decoding of `window.__INITIAL_STATE__`
//! - [`flows`]: one state machine per operation
//! - [`archive`]: batch export of home feed notes to Markdown
//!
//! ## Quick Start
//!
//! ```bash
//! # Log in once; the cookies are saved for later runs
//! rednote --headed login
//!
//! # Read
//! rednote feeds
//! rednote search coffee
//!
//! # Publish
//! rednote publish --title "Morning" --content "Flat white" --image cup.jpg --tag coffee
//! ```

/// Application context, service layer and error types.
///
/// [`XhsService`](app::XhsService) opens one browser session per call and
/// releases it when the call ends, however it ends.
pub mod app;

/// Batch archival of home feed notes.
pub mod archive;

/// Browser sessions and page primitives.
pub mod browser;

/// Command-line interface using clap.
///
/// - `status` / `login` - login state and QR code login
/// - `publish` - image post with title, body and tags
/// - `feeds` / `search` / `detail` - read notes
/// - `comment` - comment on a note
/// - `archive` - save home feed notes as Markdown
pub mod cli;

/// Configuration loaded from `~/.config/rednote/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): list entry with its access token and display card
/// - [`FeedDetail`](domain::FeedDetail): full note plus rendered comments
/// - [`PublishImageContent`](domain::PublishImageContent): what a publish call submits
pub mod domain;

/// Typed extraction from the page's injected state.
pub mod extract;

pub mod flows;

/// Image resolution for publishing: remote download or local pass-through.
pub mod images;
