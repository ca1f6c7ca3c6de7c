use std::sync::Arc;

use api::{Backend, HttpBackend};
use async_once::AsyncOnce;
use lazy_static::lazy_static;
use repositories::{ListArena, NotificationAggregator, RelationshipSummaryCache};
use tracing::{event, Level};
use types::{Post, UserHandle, UserName};

use crate::follow_toggle::FollowToggleCoordinator;

lazy_static! {
  pub static ref SYNC: AsyncOnce<SyncLayer<HttpBackend>> =
    AsyncOnce::new(async { SyncLayer::init() });
}

/// Every shared store for one signed-in viewer.
pub struct SyncLayer<B> {
  pub summaries: Arc<RelationshipSummaryCache<B>>,
  pub follows: FollowToggleCoordinator<B>,
  pub notifications: NotificationAggregator<B>,
  pub users: ListArena<B, UserHandle>,
  pub posts: ListArena<B, Post>,
}
impl<B: Backend> SyncLayer<B> {
  #[must_use]
  pub fn new(backend: Arc<B>, viewer: &str, page_size: usize) -> Self {
    let summaries = Arc::new(RelationshipSummaryCache::new(
      Arc::clone(&backend),
      UserName::from(viewer),
    ));
    Self {
      follows: FollowToggleCoordinator::new(Arc::clone(&backend), Arc::clone(&summaries)),
      notifications: NotificationAggregator::new(Arc::clone(&backend)),
      users: ListArena::new(Arc::clone(&backend), page_size),
      posts: ListArena::new(backend, page_size),
      summaries,
    }
  }

  #[must_use]
  pub fn viewer(&self) -> &str {
    self.summaries.viewer()
  }
}
impl SyncLayer<HttpBackend> {
  /// # Panics
  ///
  /// Panics when the HTTP client cannot be built.
  fn init() -> Self {
    let backend = HttpBackend::from_env()
      .unwrap_or_else(|e| panic!("Failed to build the API client: {e}"));
    let viewer = *environment::CURRENT_USERNAME;
    event!(Level::INFO, "Sync layer ready for {viewer}.");
    Self::new(Arc::new(backend), viewer, *environment::DEFAULT_PAGE_SIZE)
  }
}
