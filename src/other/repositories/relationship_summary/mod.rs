mod view;
pub use view::SummaryView;

use std::{collections::HashMap, sync::Arc};

use api::{Backend, Error};
use chrono::Utc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{event, Level};
use types::{RelationshipSummary, UserName};
use utils::{SubscriptionId, Subscribers};

type Pending = OnceCell<Result<RelationshipSummary, Error>>;

#[derive(Default)]
struct Slot {
  summary: Option<RelationshipSummary>,
  stale: bool,
  error: Option<Error>,
  /// Shared by every `get` that arrives while the fetch is in flight.
  pending: Option<Arc<Pending>>,
}
impl Slot {
  const fn is_fresh(&self) -> bool {
    self.summary.is_some() && !self.stale && self.pending.is_none()
  }

  fn is_current(&self, cell: &Arc<Pending>) -> bool {
    self
      .pending
      .as_ref()
      .is_some_and(|pending| Arc::ptr_eq(pending, cell))
  }
}

/// Counts and follow status per target username, shared by every surface.
///
/// Concurrent `get`s for the same target while a fetch is pending share that
/// one fetch. Surfaces never write entries directly; the follow coordinator
/// goes through `apply_optimistic` / `restore` / `invalidate`.
pub struct RelationshipSummaryCache<B> {
  backend: Arc<B>,
  viewer: UserName,
  slots: RwLock<HashMap<UserName, Slot>>,
  subscribers: Subscribers<UserName, SummaryView>,
}
impl<B: Backend> RelationshipSummaryCache<B> {
  /// `viewer` is the signed-in user. Its own summary never reports
  /// `is_following`.
  #[must_use]
  pub fn new(backend: Arc<B>, viewer: UserName) -> Self {
    Self {
      backend,
      viewer,
      slots: RwLock::new(HashMap::new()),
      subscribers: Subscribers::new(),
    }
  }

  #[must_use]
  pub fn viewer(&self) -> &str {
    &self.viewer
  }

  #[must_use]
  pub fn is_own_profile(&self, target: &str) -> bool {
    *self.viewer == *target
  }

  /// Cached summary if fresh, otherwise fetches (or joins the pending fetch)
  /// and returns the resolved view. Failures show up in `SummaryView::error`.
  pub async fn get(&self, target: &str) -> SummaryView {
    let target: UserName = Arc::from(target);
    let mut slots = self.slots.write().await;
    let slot = slots.entry(Arc::clone(&target)).or_default();
    if slot.is_fresh() {
      let view = self.view(&target, slot);
      drop(slots);
      event!(Level::DEBUG, "Summary cache hit for {target}.");
      return view;
    }

    let started = slot.pending.is_none();
    let cell = Arc::clone(
      slot
        .pending
        .get_or_insert_with(|| Arc::new(Pending::new())),
    );
    let placeholder = self.view(&target, slot);
    drop(slots);

    if started {
      self.subscribers.emit(&target, &placeholder);
    } else {
      event!(Level::DEBUG, "Joining pending summary fetch for {target}.");
    }
    let view = self.resolve(&target, &cell).await;
    view
  }

  /// Current view without fetching.
  pub async fn peek(&self, target: &str) -> SummaryView {
    let target: UserName = Arc::from(target);
    let slots = self.slots.read().await;
    let view = slots.get(&target).map_or_else(
      || self.view(&target, &Slot::default()),
      |slot| self.view(&target, slot),
    );
    drop(slots);
    view
  }

  /// Marks the entry stale so the next `get` re-fetches. Values stay visible
  /// until then. A fetch pending right now is detached: it may predate
  /// whatever made the entry stale.
  pub async fn invalidate(&self, target: &str) {
    let target: UserName = Arc::from(target);
    let mut slots = self.slots.write().await;
    let Some(slot) = slots.get_mut(&target) else {
      return;
    };
    slot.stale = true;
    slot.pending = None;
    let view = self.view(&target, slot);
    drop(slots);

    event!(Level::DEBUG, "Invalidated summary for {target}.");
    self.subscribers.emit(&target, &view);
  }

  /// Re-fetches now, regardless of freshness.
  pub async fn refresh(&self, target: &str) -> SummaryView {
    let target: UserName = Arc::from(target);
    let mut slots = self.slots.write().await;
    let slot = slots.entry(Arc::clone(&target)).or_default();
    slot.stale = true;
    slot.pending = None;
    drop(slots);
    self.get(&target).await
  }

  /// Flips the follow status locally ahead of the server and moves the
  /// followers count by one (never below zero).
  ///
  /// Returns the summary as it was, for an exact rollback, or `None` when
  /// there is nothing loaded to adjust.
  pub async fn apply_optimistic(&self, target: &str) -> Option<RelationshipSummary> {
    let target: UserName = Arc::from(target);
    if self.is_own_profile(&target) {
      return None;
    }
    let mut slots = self.slots.write().await;
    let slot = slots.get_mut(&target)?;
    let previous = slot.summary.clone()?;
    slot.summary = Some(previous.with_follow(!previous.is_following));
    // A fetch that started before this change would overwrite it.
    slot.pending = None;
    let view = self.view(&target, slot);
    drop(slots);

    self.subscribers.emit(&target, &view);
    Some(previous)
  }

  /// Puts back exactly what `apply_optimistic` returned.
  pub async fn restore(&self, previous: RelationshipSummary) {
    let target = Arc::clone(&previous.target_user_name);
    let mut slots = self.slots.write().await;
    let slot = slots.entry(Arc::clone(&target)).or_default();
    slot.summary = Some(previous);
    slot.pending = None;
    let view = self.view(&target, slot);
    drop(slots);

    self.subscribers.emit(&target, &view);
  }

  pub fn subscribe(
    &self,
    target: &str,
    callback: impl Fn(&SummaryView) + Send + Sync + 'static,
  ) -> SubscriptionId {
    self.subscribers.subscribe(Arc::from(target), callback)
  }

  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    self.subscribers.unsubscribe(id)
  }

  async fn resolve(&self, target: &UserName, cell: &Arc<Pending>) -> SummaryView {
    let result = cell.get_or_init(|| self.fetch(target)).await.clone();

    let mut slots = self.slots.write().await;
    let slot = slots.entry(Arc::clone(target)).or_default();
    if !slot.is_current(cell) {
      // Someone else installed this result, or it was superseded.
      let view = self.view(target, slot);
      drop(slots);
      return view;
    }

    slot.pending = None;
    match result {
      Ok(summary) => {
        slot.summary = Some(summary);
        slot.stale = false;
        slot.error = None;
      }
      Err(err) => slot.error = Some(err),
    }
    let view = self.view(target, slot);
    drop(slots);

    self.subscribers.emit(target, &view);
    view
  }

  async fn fetch(&self, target: &UserName) -> Result<RelationshipSummary, Error> {
    event!(Level::DEBUG, "Fetching relationship summary for {target}.");
    let data = self
      .backend
      .relationship_summary(target)
      .await
      .map_err(|e| {
        event!(Level::WARN, "Failed to fetch summary for {target}: {e}");
        e
      })?;

    let mut summary = RelationshipSummary::from_data(Arc::clone(target), data, Utc::now());
    if self.is_own_profile(target) {
      summary.is_following = false;
    }
    Ok(summary)
  }

  fn view(&self, target: &UserName, slot: &Slot) -> SummaryView {
    SummaryView {
      target_user_name: Arc::clone(target),
      summary: slot.summary.clone(),
      pending: slot.pending.is_some(),
      stale: slot.stale,
      error: slot.error.clone(),
      is_own_profile: self.is_own_profile(target),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use api::{Call, FakeBackend};

  use super::*;

  fn summary_calls(backend: &FakeBackend) -> usize {
    backend.count_calls(|c| matches!(c, Call::RelationshipSummary(_)))
  }

  fn cache(backend: &Arc<FakeBackend>) -> RelationshipSummaryCache<FakeBackend> {
    RelationshipSummaryCache::new(Arc::clone(backend), Arc::from("me"))
  }

  #[tokio::test]
  async fn concurrent_gets_share_one_fetch() {
    let backend = Arc::new(FakeBackend::gated());
    backend.set_summary("ana", 10, 4, true);
    let cache = cache(&backend);

    let (a, b, c, d, ()) = tokio::join!(
      cache.get("ana"),
      cache.get("ana"),
      cache.get("ana"),
      cache.get("ana"),
      async {
        tokio::task::yield_now().await;
        backend.release(1);
      }
    );

    assert_eq!(summary_calls(&backend), 1);
    for view in [a, b, c, d] {
      assert_eq!(view.followers_count(), Some(10));
      assert_eq!(view.is_following(), Some(true));
      assert!(!view.pending);
    }
  }

  #[tokio::test]
  async fn fresh_entries_are_served_from_cache() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_summary("ana", 1, 2, false);
    let cache = cache(&backend);

    cache.get("ana").await;
    cache.get("ana").await;
    assert_eq!(summary_calls(&backend), 1);

    cache.invalidate("ana").await;
    assert!(cache.peek("ana").await.stale);
    cache.get("ana").await;
    assert_eq!(summary_calls(&backend), 2);

    cache.refresh("ana").await;
    assert_eq!(summary_calls(&backend), 3);
  }

  #[tokio::test]
  async fn placeholder_has_no_counts_until_resolved() {
    let backend = Arc::new(FakeBackend::gated());
    backend.set_summary("ana", 3, 1, false);
    let cache = cache(&backend);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_cb = Arc::clone(&seen);
    cache.subscribe("ana", move |view| {
      seen_cb
        .lock()
        .unwrap()
        .push((view.pending, view.followers_count()));
    });

    let (view, ()) = tokio::join!(cache.get("ana"), async {
      tokio::task::yield_now().await;
      backend.release(1);
    });

    assert_eq!(view.followers_count(), Some(3));
    assert_eq!(*seen.lock().unwrap(), [(true, None), (false, Some(3))]);
  }

  #[tokio::test]
  async fn failed_fetch_keeps_prior_values() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_summary("ana", 5, 5, false);
    let cache = cache(&backend);
    cache.get("ana").await;

    backend.fail_summary("ana", Error::Network("status 503".to_string()));
    let view = cache.refresh("ana").await;

    assert_eq!(view.followers_count(), Some(5));
    assert!(matches!(view.error, Some(Error::Network(_))));
    assert!(view.stale, "still stale, the next get retries");
  }

  #[tokio::test]
  async fn optimistic_change_rolls_back_exactly() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_summary("ana", 0, 7, false);
    let cache = cache(&backend);
    cache.get("ana").await;

    let previous = cache.apply_optimistic("ana").await.unwrap();
    let during = cache.peek("ana").await;
    assert_eq!(during.followers_count(), Some(1));
    assert_eq!(during.is_following(), Some(true));

    cache.restore(previous.clone()).await;
    let after = cache.peek("ana").await;
    assert_eq!(after.summary, Some(previous));
  }

  #[tokio::test]
  async fn optimistic_change_needs_a_loaded_entry() {
    let backend = Arc::new(FakeBackend::new());
    let cache = cache(&backend);
    assert!(cache.apply_optimistic("ana").await.is_none());
  }

  #[tokio::test]
  async fn own_profile_never_reports_following() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_summary("me", 2, 2, true);
    let cache = cache(&backend);

    let view = cache.get("me").await;
    assert!(view.is_own_profile);
    assert_eq!(view.is_following(), Some(false));
    assert!(!view.can_toggle());
  }

  #[tokio::test]
  async fn invalidate_detaches_a_pending_fetch() {
    let backend = Arc::new(FakeBackend::gated());
    backend.set_summary("ana", 1, 1, false);
    let cache = cache(&backend);

    let (early, ()) = tokio::join!(cache.get("ana"), async {
      tokio::task::yield_now().await;
      cache.invalidate("ana").await;
      backend.release(2);
    });
    assert!(early.summary.is_none(), "detached result is not installed");

    let view = cache.get("ana").await;
    assert_eq!(view.followers_count(), Some(1));
    assert_eq!(summary_calls(&backend), 2);
  }
}
