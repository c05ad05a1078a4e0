use std::path::PathBuf;

use unicode_width::UnicodeWidthStr;

use crate::app::{Result, RednoteError};

/// Maximum title width the composer accepts. Wide (CJK) characters count 2.
pub const MAX_TITLE_WIDTH: usize = 40;

/// Content of an image post, with images already resolved to local files.
#[derive(Debug, Clone)]
pub struct PublishImageContent {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image_paths: Vec<PathBuf>,
}

impl PublishImageContent {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
        image_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            tags: normalize_tags(tags),
            image_paths,
        }
    }

    /// Checks that must hold before the composer is opened.
    pub fn validate(&self) -> Result<()> {
        if self.image_paths.is_empty() {
            return Err(RednoteError::Validation("at least one image is required".into()));
        }
        Ok(())
    }
}

/// Display width of `s` as the composer counts it.
pub fn title_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

pub fn validate_title(title: &str) -> Result<()> {
    let width = title_width(title);
    if width > MAX_TITLE_WIDTH {
        return Err(RednoteError::Validation(format!(
            "title is {} units wide, limit is {}",
            width, MAX_TITLE_WIDTH
        )));
    }
    Ok(())
}

/// Strip every leading `#` and drop tags that end up empty.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().trim_start_matches('#').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cjk_counts_double() {
        assert_eq!(title_width("abc"), 3);
        assert_eq!(title_width("咖啡"), 4);
        assert_eq!(title_width("a咖b"), 4);
    }

    #[test]
    fn test_title_at_limit_is_accepted() {
        let exact = "咖".repeat(20);
        assert_eq!(title_width(&exact), 40);
        assert!(validate_title(&exact).is_ok());

        let ascii = "a".repeat(40);
        assert!(validate_title(&ascii).is_ok());
    }

    #[test]
    fn test_title_one_over_is_rejected() {
        let over = format!("{}a", "咖".repeat(20));
        assert!(matches!(
            validate_title(&over),
            Err(RednoteError::Validation(_))
        ));
        assert!(validate_title(&"a".repeat(41)).is_err());
    }

    #[test]
    fn test_tags_strip_any_number_of_hashes() {
        let tags = normalize_tags(vec!["##foo".into(), "#bar".into(), "baz".into(), "#".into()]);
        assert_eq!(tags, vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_empty_images_fail_validation() {
        let content = PublishImageContent::new("t", "c", vec![], vec![]);
        assert!(matches!(content.validate(), Err(RednoteError::Validation(_))));
    }
}
