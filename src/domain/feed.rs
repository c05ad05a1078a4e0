use serde::{Deserialize, Serialize};

/// Image rendition as the platform serves it; either URL may be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageInfo {
    pub url_default: String,
    pub url_pre: String,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    /// Preferred URL, falling back to the preview rendition.
    pub fn best_url(&self) -> Option<&str> {
        [&self.url_default, &self.url_pre]
            .into_iter()
            .find(|u| !u.is_empty())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub nickname: String,
    pub avatar: String,
}

/// Interaction counters. The platform sends display strings ("1.2万"), not numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InteractInfo {
    pub liked: bool,
    pub liked_count: String,
    pub collected_count: String,
    pub comment_count: String,
    pub share_count: String,
}

/// Denormalized card rendered in list views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoteCard {
    #[serde(rename = "type")]
    pub note_type: String,
    pub display_title: String,
    pub user: User,
    pub interact_info: InteractInfo,
    pub cover: ImageInfo,
}

/// One entry of the home feed or a search result page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: String,
    /// Capability token required to open the note; forwarded verbatim.
    #[serde(default)]
    pub xsec_token: String,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub note_card: NoteCard,
}

impl Feed {
    pub fn display_title(&self) -> &str {
        if self.note_card.display_title.trim().is_empty() {
            &self.id
        } else {
            &self.note_card.display_title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_decodes_platform_shape() {
        let raw = r#"{
            "id": "64f0",
            "xsecToken": "ABtoken=",
            "modelType": "note",
            "noteCard": {
                "type": "normal",
                "displayTitle": "Morning coffee",
                "user": {"userId": "u1", "nickname": "bean"},
                "interactInfo": {"likedCount": "1.2万"},
                "cover": {"urlDefault": "https://img/c.jpg"},
                "unknownField": 3
            }
        }"#;
        let feed: Feed = serde_json::from_str(raw).unwrap();
        assert_eq!(feed.xsec_token, "ABtoken=");
        assert_eq!(feed.note_card.note_type, "normal");
        assert_eq!(feed.note_card.interact_info.liked_count, "1.2万");
        assert_eq!(feed.display_title(), "Morning coffee");
    }

    #[test]
    fn test_feed_requires_id() {
        assert!(serde_json::from_str::<Feed>(r#"{"xsecToken": "t"}"#).is_err());
    }

    #[test]
    fn test_display_title_falls_back_to_id() {
        let feed: Feed = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(feed.display_title(), "abc");
    }

    #[test]
    fn test_best_url_prefers_default() {
        let img = ImageInfo {
            url_default: "d".into(),
            url_pre: "p".into(),
            ..Default::default()
        };
        assert_eq!(img.best_url(), Some("d"));

        let pre_only = ImageInfo {
            url_pre: "p".into(),
            ..Default::default()
        };
        assert_eq!(pre_only.best_url(), Some("p"));
        assert_eq!(ImageInfo::default().best_url(), None);
    }
}
