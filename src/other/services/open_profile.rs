use api::Backend;
use repositories::{ListSnapshot, LoadMode, SummaryView, SurfaceId};
use tracing::{event, Level};
use types::{ListKey, ListKind, Post};

use crate::SyncLayer;

pub static POSTS_SURFACE: &str = "profile/posts";
pub static FEATURED_SURFACE: &str = "profile/featured-on";

/// What a profile page shows once opened.
#[derive(Debug, Clone)]
pub struct Profile {
  pub summary: SummaryView,
  pub posts: ListSnapshot<Post>,
  pub featured_on: ListSnapshot<Post>,
}

/// Points the profile surfaces at `user_name` and loads the first page of
/// each list alongside the summary.
pub async fn act<B: Backend>(sync: &SyncLayer<B>, user_name: &str) -> Profile {
  event!(Level::INFO, "Opening profile of {user_name}.");
  let posts = sync
    .posts
    .mount(
      SurfaceId::from(POSTS_SURFACE),
      ListKey::new(user_name, ListKind::Posts),
    )
    .await;
  let featured_on = sync
    .posts
    .mount(
      SurfaceId::from(FEATURED_SURFACE),
      ListKey::new(user_name, ListKind::FeaturedOn),
    )
    .await;

  let (summary, posts_outcome, featured_outcome) = tokio::join!(
    sync.summaries.get(user_name),
    posts.load_page(0, LoadMode::Replace),
    featured_on.load_page(0, LoadMode::Replace),
  );
  event!(
    Level::DEBUG,
    "Profile {user_name}: posts {posts_outcome:?}, featured {featured_outcome:?}."
  );

  Profile {
    summary,
    posts: posts.snapshot().await,
    featured_on: featured_on.snapshot().await,
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use api::FakeBackend;

  use super::*;

  #[tokio::test]
  async fn switching_profiles_replaces_every_list() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_summary("ana", 3, 1, true);
    backend.set_summary("bo", 0, 0, false);
    backend.set_page_body(
      &ListKey::new("ana", ListKind::Posts),
      0,
      r#"{"content": [{"id": 1, "title": "First"}], "totalPages": 1}"#,
    );
    backend.set_page_body(
      &ListKey::new("ana", ListKind::FeaturedOn),
      0,
      r#"{"content": [], "totalPages": 0}"#,
    );
    backend.set_page_body(
      &ListKey::new("bo", ListKind::Posts),
      0,
      r#"{"content": [{"id": 9, "title": "Other"}], "totalPages": 1}"#,
    );
    let sync = SyncLayer::new(Arc::clone(&backend), "me", 10);

    let ana = act(&sync, "ana").await;
    assert_eq!(ana.summary.followers_count(), Some(3));
    assert_eq!(ana.posts.items.len(), 1);
    assert!(ana.featured_on.items.is_empty());
    assert!(!ana.featured_on.has_more);

    let bo = act(&sync, "bo").await;
    assert_eq!(bo.summary.followers_count(), Some(0));
    assert_eq!(bo.posts.items[0].title, "Other");
    assert!(bo.featured_on.error.is_some(), "unscripted page fails");
    assert!(bo.featured_on.items.is_empty(), "old items never leak across profiles");
    assert_eq!(sync.posts.mounted().await, 2);
  }
}
