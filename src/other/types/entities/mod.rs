pub mod follow_result;
pub mod list_key;
pub mod listed;
pub mod notification;
pub mod post;
pub mod relationship_summary;
pub mod user_handle;
