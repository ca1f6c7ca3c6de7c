pub mod entities;

pub use entities::{
  follow_result::FollowResult,
  list_key::{ListKey, ListKind},
  listed::Listed,
  notification::Notification,
  post::Post,
  relationship_summary::{RelationshipSummary, RelationshipSummaryData},
  user_handle::UserHandle,
};

/// Usernames are the primary key for every lookup and are shared a lot.
pub type UserName = std::sync::Arc<str>;
