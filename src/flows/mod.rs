//! One module per platform operation.
//!
//! Every flow takes a [`Page`](crate::browser::Page) that the caller owns and
//! leaves it open; session lifetime belongs to the service layer.

pub mod comment;
pub mod detail;
pub mod feeds;
pub mod login;
pub mod publish;
pub mod search;

pub use comment::post_comment;
pub use detail::feed_detail;
pub use feeds::list_feeds;
pub use login::{check_login_status, login};
pub use publish::{publish, PublishOutcome};
pub use search::search;
