pub mod feed;
pub mod note;
pub mod publish;

pub use feed::{Feed, ImageInfo, InteractInfo, NoteCard, User};
pub use note::{Comment, CommentList, FeedDetail, Note};
pub use publish::{normalize_tags, title_width, validate_title, PublishImageContent, MAX_TITLE_WIDTH};
