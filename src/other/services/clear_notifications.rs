use api::Backend;
use repositories::{notifications::Error, NotificationsView};
use tracing::{event, Level};

use crate::SyncLayer;

/// "Clear all" from any surface. Every subscribed surface sees the empty
/// list at once.
///
/// # Errors
///
/// When the server refuses; nothing is cleared locally then.
pub async fn act<B: Backend>(sync: &SyncLayer<B>) -> Result<NotificationsView, Error> {
  let viewer = sync.viewer();
  sync.notifications.clear_all(viewer).await.map_err(|e| {
    event!(Level::WARN, "Failed to clear notifications for {viewer}: {e}");
    e
  })
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use api::FakeBackend;
  use chrono::Utc;
  use types::Notification;

  use super::*;

  #[tokio::test]
  async fn clears_the_viewers_inbox() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_notifications(
      "me",
      vec![Notification {
        id: 1,
        actor_user_name: "ana".to_string(),
        action: "followed you".to_string(),
        timestamp: Utc::now(),
      }],
    );
    let sync = SyncLayer::new(Arc::clone(&backend), "me", 10);
    assert_eq!(sync.notifications.fetch_all("me").await.unread_count(), 1);

    let view = act(&sync).await.unwrap();
    assert_eq!(view.unread_count(), 0);
    assert_eq!(sync.notifications.peek("me").await.unread_count(), 0);
  }
}
