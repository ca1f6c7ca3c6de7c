use std::{collections::HashMap, sync::Arc};

use api::Backend;
use thiserror::Error as ThisError;
use tokio::sync::{OnceCell, RwLock};
use tracing::{event, Level};
use types::{entities::notification::newest_first, Notification, UserName};
use utils::{SubscriptionId, Subscribers};

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  #[error("Failed to clear notifications: {0}")]
  ClearFailed(#[source] api::Error),
}

/// One user's notification list as every surface sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationsView {
  pub user_name: UserName,
  /// Newest first.
  pub items: Arc<[Notification]>,
  pub loading: bool,
  /// Set by the last failed fetch. Items are left as they were.
  pub error: Option<api::Error>,
}
impl NotificationsView {
  /// Badge count.
  #[must_use]
  pub fn unread_count(&self) -> usize {
    self.items.len()
  }
}

type Pending = OnceCell<Result<Arc<[Notification]>, api::Error>>;

struct Inbox {
  items: Arc<[Notification]>,
  loading: bool,
  error: Option<api::Error>,
  /// Shared by every `fetch_all` that arrives while the request is in flight.
  /// A clear detaches it, so an older response cannot undo the clear.
  pending: Option<Arc<Pending>>,
}
impl Inbox {
  fn is_current(&self, cell: &Arc<Pending>) -> bool {
    self
      .pending
      .as_ref()
      .is_some_and(|pending| Arc::ptr_eq(pending, cell))
  }
}
impl Default for Inbox {
  fn default() -> Self {
    Self {
      items: Arc::from(Vec::new()),
      loading: false,
      error: None,
      pending: None,
    }
  }
}

/// Holds each user's full notification list and pushes every change to all
/// surfaces subscribed to that user at once.
pub struct NotificationAggregator<B> {
  backend: Arc<B>,
  inboxes: RwLock<HashMap<UserName, Inbox>>,
  subscribers: Subscribers<UserName, NotificationsView>,
}
impl<B: Backend> NotificationAggregator<B> {
  #[must_use]
  pub fn new(backend: Arc<B>) -> Self {
    Self {
      backend,
      inboxes: RwLock::new(HashMap::new()),
      subscribers: Subscribers::new(),
    }
  }

  /// Replaces the whole list with the server's. Calls that overlap share one
  /// request and all return the list it produced.
  pub async fn fetch_all(&self, user_name: &str) -> NotificationsView {
    let user: UserName = Arc::from(user_name);
    let mut inboxes = self.inboxes.write().await;
    let inbox = inboxes.entry(Arc::clone(&user)).or_default();
    let started = inbox.pending.is_none();
    let cell = Arc::clone(
      inbox
        .pending
        .get_or_insert_with(|| Arc::new(Pending::new())),
    );
    inbox.loading = true;
    let view = Self::view(&user, inbox);
    drop(inboxes);

    if started {
      self.subscribers.emit(&user, &view);
    } else {
      event!(Level::DEBUG, "Joining pending notifications fetch for {user}.");
    }

    let result = cell.get_or_init(|| self.fetch(&user)).await.clone();

    let mut inboxes = self.inboxes.write().await;
    let inbox = inboxes.entry(Arc::clone(&user)).or_default();
    if !inbox.is_current(&cell) {
      // Installed by another caller already, or detached by a clear.
      let view = Self::view(&user, inbox);
      drop(inboxes);
      return view;
    }

    inbox.pending = None;
    inbox.loading = false;
    match result {
      Ok(items) => {
        inbox.items = items;
        inbox.error = None;
      }
      Err(err) => {
        event!(Level::WARN, "Failed to fetch notifications for {user}: {err}");
        inbox.error = Some(err);
      }
    }
    let view = Self::view(&user, inbox);
    drop(inboxes);

    self.subscribers.emit(&user, &view);
    view
  }

  /// Clears on the server, then empties the list for every subscriber in one
  /// push. On failure nothing local changes.
  ///
  /// # Errors
  ///
  /// `ClearFailed` when the server request fails.
  pub async fn clear_all(&self, user_name: &str) -> Result<NotificationsView, Error> {
    self
      .backend
      .clear_notifications(user_name)
      .await
      .map_err(|e| {
        event!(Level::WARN, "Failed to clear notifications for {user_name}: {e}");
        Error::ClearFailed(e)
      })?;

    let user: UserName = Arc::from(user_name);
    let mut inboxes = self.inboxes.write().await;
    let inbox = inboxes.entry(Arc::clone(&user)).or_default();
    inbox.pending = None;
    inbox.items = Arc::from(Vec::new());
    inbox.loading = false;
    inbox.error = None;
    let view = Self::view(&user, inbox);
    drop(inboxes);

    event!(Level::INFO, "Cleared notifications for {user}.");
    self.subscribers.emit(&user, &view);
    Ok(view)
  }

  /// Current list without fetching.
  pub async fn peek(&self, user_name: &str) -> NotificationsView {
    let user: UserName = Arc::from(user_name);
    let inboxes = self.inboxes.read().await;
    let view = inboxes.get(&user).map_or_else(
      || Self::view(&user, &Inbox::default()),
      |inbox| Self::view(&user, inbox),
    );
    drop(inboxes);
    view
  }

  pub fn subscribe(
    &self,
    user_name: &str,
    callback: impl Fn(&NotificationsView) + Send + Sync + 'static,
  ) -> SubscriptionId {
    self.subscribers.subscribe(Arc::from(user_name), callback)
  }

  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    self.subscribers.unsubscribe(id)
  }

  async fn fetch(&self, user: &UserName) -> Result<Arc<[Notification]>, api::Error> {
    event!(Level::DEBUG, "Fetching notifications for {user}.");
    let mut items = self.backend.notifications(user).await?;
    newest_first(&mut items);
    Ok(Arc::from(items))
  }

  fn view(user: &UserName, inbox: &Inbox) -> NotificationsView {
    NotificationsView {
      user_name: Arc::clone(user),
      items: Arc::clone(&inbox.items),
      loading: inbox.loading,
      error: inbox.error.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use api::FakeBackend;
  use chrono::{TimeZone, Utc};

  use super::*;

  fn notification(id: u64, hour: u32) -> Notification {
    Notification {
      id,
      actor_user_name: format!("actor{id}"),
      action: "followed you".to_string(),
      timestamp: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
    }
  }

  /// Two surfaces (header dropdown, dashboard modal) watching one user.
  fn surfaces(aggregator: &NotificationAggregator<FakeBackend>) -> [Arc<Mutex<usize>>; 2] {
    [(); 2].map(|()| {
      let badge = Arc::new(Mutex::new(usize::MAX));
      let badge_cb = Arc::clone(&badge);
      aggregator.subscribe("ana", move |view| {
        *badge_cb.lock().unwrap() = view.unread_count();
      });
      badge
    })
  }

  #[tokio::test]
  async fn fetch_replaces_and_orders_newest_first() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_notifications("ana", vec![notification(1, 8), notification(2, 9)]);
    let aggregator = NotificationAggregator::new(Arc::clone(&backend));

    let view = aggregator.fetch_all("ana").await;
    assert_eq!(view.items.iter().map(|n| n.id).collect::<Vec<_>>(), [2, 1]);

    backend.set_notifications("ana", vec![notification(3, 10)]);
    let view = aggregator.fetch_all("ana").await;
    assert_eq!(view.unread_count(), 1);
  }

  #[tokio::test]
  async fn clear_reaches_every_surface() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_notifications("ana", vec![notification(1, 8), notification(2, 9)]);
    let aggregator = NotificationAggregator::new(Arc::clone(&backend));
    let [header, dashboard] = surfaces(&aggregator);

    aggregator.fetch_all("ana").await;
    assert_eq!(*header.lock().unwrap(), 2);
    assert_eq!(*dashboard.lock().unwrap(), 2);

    aggregator.clear_all("ana").await.unwrap();
    assert_eq!(*header.lock().unwrap(), 0);
    assert_eq!(*dashboard.lock().unwrap(), 0);
    assert_eq!(aggregator.peek("ana").await.unread_count(), 0);
  }

  #[tokio::test]
  async fn failed_clear_changes_nothing() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_notifications("ana", vec![notification(1, 8)]);
    backend.push_clear_reply(Err(api::Error::Network("status 500".to_string())));
    let aggregator = NotificationAggregator::new(Arc::clone(&backend));
    let [header, dashboard] = surfaces(&aggregator);
    aggregator.fetch_all("ana").await;

    let err = aggregator.clear_all("ana").await.unwrap_err();
    assert!(matches!(err, Error::ClearFailed(api::Error::Network(_))));
    assert_eq!(*header.lock().unwrap(), 1);
    assert_eq!(*dashboard.lock().unwrap(), 1);
    assert_eq!(aggregator.peek("ana").await.unread_count(), 1);
  }

  #[tokio::test]
  async fn fetch_in_flight_during_clear_is_discarded() {
    let backend = Arc::new(FakeBackend::gated_only(|call| {
      matches!(call, api::Call::Notifications(_))
    }));
    backend.set_notifications("ana", vec![notification(1, 8)]);
    let aggregator = NotificationAggregator::new(Arc::clone(&backend));

    // The fetch's reply (one item) is held until after the clear lands.
    let (fetched, cleared) = tokio::join!(aggregator.fetch_all("ana"), async {
      tokio::task::yield_now().await;
      let cleared = aggregator.clear_all("ana").await;
      backend.release(1);
      cleared
    });

    assert!(cleared.is_ok());
    assert_eq!(fetched.unread_count(), 0);
    assert_eq!(aggregator.peek("ana").await.unread_count(), 0);
  }

  #[tokio::test]
  async fn overlapping_fetches_share_one_request() {
    let backend = Arc::new(FakeBackend::gated_only(|call| {
      matches!(call, api::Call::Notifications(_))
    }));
    backend.set_notifications("ana", vec![notification(1, 8), notification(2, 9)]);
    let aggregator = NotificationAggregator::new(Arc::clone(&backend));

    // Header and dashboard both fetch on page load.
    let (header, dashboard, loading) = tokio::join!(
      aggregator.fetch_all("ana"),
      aggregator.fetch_all("ana"),
      async {
        tokio::task::yield_now().await;
        let loading = aggregator.peek("ana").await.loading;
        backend.release(1);
        loading
      }
    );

    assert!(loading);
    assert_eq!(header, dashboard);
    assert_eq!(header.unread_count(), 2);
    assert!(!header.loading);
    assert_eq!(
      backend.count_calls(|call| matches!(call, api::Call::Notifications(_))),
      1
    );
  }

  #[tokio::test]
  async fn failed_fetch_keeps_the_list() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_notifications("ana", vec![notification(1, 8)]);
    let aggregator = NotificationAggregator::new(Arc::clone(&backend));
    aggregator.fetch_all("ana").await;

    backend.fail_notifications("ana", api::Error::Network("timeout".to_string()));
    let view = aggregator.fetch_all("ana").await;
    assert_eq!(view.unread_count(), 1);
    assert!(view.error.is_some());
    assert!(!view.loading);
  }
}
