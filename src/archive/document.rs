use std::fmt::Write;

use crate::domain::{Feed, FeedDetail};

/// One archived note, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDocument {
    /// Zero-padded position in the sorted batch, e.g. `"03"`.
    pub prefix: String,
    pub title: String,
    pub body: String,
}

impl ArchiveDocument {
    pub fn new(title: String, body: String) -> Self {
        Self {
            prefix: String::new(),
            title,
            body,
        }
    }
}

/// Title used for file naming and sorting: note title, then card title, then id.
pub fn document_title(feed: &Feed, detail: &FeedDetail) -> String {
    [detail.note.title.trim(), feed.display_title().trim(), feed.id.as_str()]
        .into_iter()
        .find(|t| !t.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Render a note as a self-contained Markdown document.
pub fn render(feed: &Feed, detail: &FeedDetail) -> ArchiveDocument {
    let note = &detail.note;
    let title = document_title(feed, detail);

    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", title);
    let _ = write!(out, "- NoteID: {}\n- Type: {}", note.note_id, note.note_type);
    if !note.user.nickname.is_empty() {
        let _ = write!(out, "\n- Author: {}", note.user.nickname);
        if !note.user.user_id.is_empty() {
            let _ = write!(out, " (@{})", note.user.user_id);
        }
    }
    if !note.interact_info.liked_count.is_empty() {
        let _ = write!(out, "\n- Likes: {}", note.interact_info.liked_count);
    }
    if !note.ip_location.is_empty() {
        let _ = write!(out, "\n- Location: {}", note.ip_location);
    }

    out.push_str("\n\n## Content\n\n");
    if !note.desc.trim().is_empty() {
        let _ = writeln!(out, "{}\n", note.desc);
    }

    let images: Vec<&str> = note.image_list.iter().filter_map(|i| i.best_url()).collect();
    if !images.is_empty() {
        out.push_str("## Images\n");
        for url in images {
            let _ = writeln!(out, "- {}", url);
        }
        out.push('\n');
    }

    ArchiveDocument::new(title, out)
}
