use std::sync::Arc;

use api::Backend;
use repositories::{LoadMode, PaginatedListLoader, SurfaceId};
use tracing::{event, Level};
use types::{ListKey, ListKind, UserHandle};

use crate::SyncLayer;

pub static SURFACE: &str = "popup/follows";

/// Opens (or switches the tab of) the followers/following popup and loads
/// its first page. Further pages come from `load_more` on the returned
/// loader.
pub async fn act<B: Backend>(
  sync: &SyncLayer<B>,
  user_name: &str,
  kind: ListKind,
) -> Arc<PaginatedListLoader<B, UserHandle>> {
  event!(Level::DEBUG, "Opening {kind:?} of {user_name}.");
  let loader = sync
    .users
    .mount(SurfaceId::from(SURFACE), ListKey::new(user_name, kind))
    .await;
  loader.load_page(0, LoadMode::Replace).await;
  loader
}

/// Closes the popup, discarding whatever it had loaded.
pub async fn close<B: Backend>(sync: &SyncLayer<B>) -> bool {
  sync.users.unmount(&SurfaceId::from(SURFACE)).await
}

#[cfg(test)]
mod tests {
  use api::FakeBackend;
  use repositories::LoadOutcome;

  use super::*;

  #[tokio::test]
  async fn tab_switch_replaces_and_load_more_appends() {
    let backend = Arc::new(FakeBackend::new());
    let followers = ListKey::new("ana", ListKind::Followers);
    let following = ListKey::new("ana", ListKind::Following);
    backend.set_users_page(&followers, 0, &["bo", "cy"], 2);
    backend.set_users_page(&followers, 1, &["cy", "di"], 2);
    backend.set_users_page(&following, 0, &["ed"], 1);
    let sync = SyncLayer::new(Arc::clone(&backend), "me", 2);

    let popup = act(&sync, "ana", ListKind::Followers).await;
    assert_eq!(popup.load_more().await, LoadOutcome::Applied);
    let names: Vec<String> = popup
      .snapshot()
      .await
      .items
      .iter()
      .map(|u| u.user_name.to_string())
      .collect();
    assert_eq!(names, ["bo", "cy", "di"]);

    let popup = act(&sync, "ana", ListKind::Following).await;
    let snapshot = popup.snapshot().await;
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(&*snapshot.items[0].user_name, "ed");
    assert!(!snapshot.has_more);

    assert!(close(&sync).await);
    assert!(!close(&sync).await);
  }
}
