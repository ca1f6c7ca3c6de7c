use std::{collections::HashMap, fmt, sync::Arc};

use api::Backend;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{event, Level};
use types::{ListKey, Listed};

use super::PaginatedListLoader;

/// Name of the UI surface that owns a loader, e.g. `"profile/posts"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceId(Arc<str>);
impl From<&str> for SurfaceId {
  fn from(name: &str) -> Self {
    Self(Arc::from(name))
  }
}
impl fmt::Display for SurfaceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Owns every live loader of one item type, one per surface.
///
/// Mounting with a different key resets the surface's loader instead of
/// creating a second one, so the old key's late responses are discarded.
/// Unmounting releases it.
pub struct ListArena<B, T> {
  backend: Arc<B>,
  page_size: usize,
  loaders: RwLock<HashMap<SurfaceId, Arc<PaginatedListLoader<B, T>>>>,
}
impl<B, T> ListArena<B, T>
where
  B: Backend,
  T: Listed + DeserializeOwned + Clone + Send + Sync + 'static,
{
  #[must_use]
  pub fn new(backend: Arc<B>, page_size: usize) -> Self {
    Self {
      backend,
      page_size,
      loaders: RwLock::new(HashMap::new()),
    }
  }

  /// Returns the surface's loader, pointed at `key`.
  pub async fn mount(&self, surface: SurfaceId, key: ListKey) -> Arc<PaginatedListLoader<B, T>> {
    let mut loaders = self.loaders.write().await;
    let loader = Arc::clone(loaders.entry(surface).or_insert_with_key(|surface| {
      event!(Level::DEBUG, "Creating list loader for {surface}.");
      Arc::new(PaginatedListLoader::new(
        Arc::clone(&self.backend),
        self.page_size,
      ))
    }));
    drop(loaders);

    if loader.key().await.as_ref() != Some(&key) {
      loader.reset(key).await;
    }
    loader
  }

  /// Closes and forgets the surface's loader. Returns false if none was mounted.
  pub async fn unmount(&self, surface: &SurfaceId) -> bool {
    let removed = self.loaders.write().await.remove(surface);
    let Some(loader) = removed else {
      return false;
    };
    event!(Level::DEBUG, "Releasing list loader for {surface}.");
    loader.close().await;
    true
  }

  pub async fn mounted(&self) -> usize {
    let loaders = self.loaders.read().await;
    let count = loaders.len();
    drop(loaders);
    count
  }
}

#[cfg(test)]
mod tests {
  use api::{Call, FakeBackend};
  use types::{ListKind, Post};

  use super::*;
  use crate::{LoadMode, LoadOutcome};

  #[tokio::test]
  async fn remounting_with_a_new_key_resets_the_same_loader() {
    let backend = Arc::new(FakeBackend::new());
    let ana = ListKey::new("ana", ListKind::Posts);
    let bo = ListKey::new("bo", ListKind::Posts);
    backend.set_page_body(
      &ana,
      0,
      r#"{"content": [{"id": 1, "title": "Hello"}], "page": {"totalPages": 1}}"#,
    );

    let arena = ListArena::<_, Post>::new(Arc::clone(&backend), 10);
    let surface = SurfaceId::from("profile/posts");
    let first = arena.mount(surface.clone(), ana.clone()).await;
    first.load_page(0, LoadMode::Replace).await;
    assert_eq!(first.snapshot().await.items.len(), 1);

    let same = arena.mount(surface.clone(), ana).await;
    assert!(Arc::ptr_eq(&first, &same));
    assert_eq!(same.snapshot().await.items.len(), 1, "same key keeps items");

    let second = arena.mount(surface.clone(), bo.clone()).await;
    assert!(Arc::ptr_eq(&first, &second));
    let snapshot = second.snapshot().await;
    assert_eq!(snapshot.key, Some(bo));
    assert!(snapshot.items.is_empty());
    assert_eq!(arena.mounted().await, 1);
  }

  #[tokio::test]
  async fn unmount_releases_and_closes() {
    let backend = Arc::new(FakeBackend::new());
    let arena = ListArena::<_, Post>::new(Arc::clone(&backend), 10);
    let surface = SurfaceId::from("dashboard/featured");
    let loader = arena
      .mount(surface.clone(), ListKey::new("ana", ListKind::FeaturedOn))
      .await;

    assert!(arena.unmount(&surface).await);
    assert!(!arena.unmount(&surface).await);
    assert_eq!(arena.mounted().await, 0);

    assert_eq!(loader.load_more().await, LoadOutcome::Skipped);
    assert_eq!(backend.count_calls(|c| matches!(c, Call::ListPage(..))), 0);
  }
}
