use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use super::ArchiveDocument;
use crate::app::Result;

const MAX_NAME_CHARS: usize = 80;
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '\\', '/', '|', '?', '*'];
const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// A file name stem that is valid on every mainstream filesystem.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .trim()
        .chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let mut name = if replaced.is_empty() {
        "untitled".to_string()
    } else {
        replaced
    };

    if RESERVED_NAMES.contains(&name.to_uppercase().as_str()) {
        name.push('_');
    }

    match name.char_indices().nth(MAX_NAME_CHARS) {
        Some((cut, _)) => name[..cut].to_string(),
        None => name,
    }
}

/// `path` if free, otherwise the first free `<stem>-(n).<ext>` with n < 1000.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..1000)
        .map(|n| path.with_file_name(format!("{}-({}){}", stem, n, ext)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Writes archive batches as Markdown files under a timestamped directory.
pub struct ArchiveWriter {
    output_dir: PathBuf,
}

impl ArchiveWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Create `<output_dir>/<YYYYmmdd_HHMMSS>` for one batch.
    pub fn create_batch_dir(&self) -> Result<PathBuf> {
        let dir = self
            .output_dir
            .join(Local::now().format("%Y%m%d_%H%M%S").to_string());
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write every document into a new batch directory.
    ///
    /// Returns the paths actually written; a document whose write fails is
    /// logged and left out.
    pub fn write_batch(&self, documents: &[ArchiveDocument]) -> Result<Vec<PathBuf>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let dir = self.create_batch_dir()?;
        let files = write_documents(&dir, documents);
        info!(dir = %dir.display(), saved = files.len(), "Archive batch written");
        Ok(files)
    }
}

fn write_documents(dir: &Path, documents: &[ArchiveDocument]) -> Vec<PathBuf> {
    let mut files = Vec::with_capacity(documents.len());
    for doc in documents {
        let name = format!("{}_{}.md", doc.prefix, sanitize_filename(&doc.title));
        let path = unique_path(&dir.join(name));

        match std::fs::write(&path, &doc.body) {
            Ok(()) => files.push(path),
            Err(e) => warn!(path = %path.display(), "Failed to write archive file: {}", e),
        }
    }
    files
}
