use serde::{Deserialize, Serialize};

use super::feed::{ImageInfo, InteractInfo, User};

/// Full record of one post as found under `note.noteDetailMap[id].note`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: String,
    #[serde(default, rename = "type")]
    pub note_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub image_list: Vec<ImageInfo>,
    #[serde(default)]
    pub interact_info: InteractInfo,
    #[serde(default)]
    pub ip_location: String,
    #[serde(default)]
    pub time: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub user_info: User,
    pub like_count: String,
    pub ip_location: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommentList {
    pub list: Vec<Comment>,
    pub has_more: bool,
}

/// Detail payload for one feed: the note plus whatever comments rendered with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDetail {
    pub note: Note,
    #[serde(default)]
    pub comments: CommentList,
}
