pub mod arena;
pub mod state;

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use api::{Backend, Error, Page};
use serde::de::DeserializeOwned;
use tokio::sync::{Notify, RwLock};
use tracing::{event, Level};
use types::{ListKey, Listed};
use utils::{SubscriptionId, Subscribers};

use state::{InFlight, ListSnapshot, ListState, LoadMode};

/// Result of a `load_page` / `load_more` call. Never an `Err`: failures land
/// in the list's error flag and are echoed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
  /// The fetched page was merged into the list.
  Applied,
  /// Another load was already in flight; this call waited for it instead.
  Joined,
  /// Nothing to do: no key, no more pages, or out of range.
  Skipped,
  /// The list changed identity while the page was in flight. Discarded.
  Stale,
  /// The fetch failed. Prior items are untouched; retry the same call.
  Failed(Error),
}

enum Target {
  Page(usize, LoadMode),
  Next,
}

/// Incrementally loads one logical list (followers of X, posts of X, ...).
///
/// At most one page fetch is in flight per loader. Overlapping calls wait for
/// it. `reset` switches identity and makes any in-flight response stale.
pub struct PaginatedListLoader<B, T> {
  backend: Arc<B>,
  page_size: usize,
  state: RwLock<ListState<T>>,
  subscribers: Subscribers<(), ListSnapshot<T>>,
}
impl<B, T> PaginatedListLoader<B, T>
where
  B: Backend,
  T: Listed + DeserializeOwned + Clone + Send + Sync + 'static,
{
  #[must_use]
  pub fn new(backend: Arc<B>, page_size: usize) -> Self {
    Self {
      backend,
      page_size: page_size.max(1),
      state: RwLock::new(ListState::new()),
      subscribers: Subscribers::new(),
    }
  }

  /// Points the loader at `key` with nothing loaded.
  pub async fn reset(&self, key: ListKey) {
    event!(Level::DEBUG, "Resetting list to {key}.");
    self.replace_identity(Some(key)).await;
  }

  /// Drops the identity and every loaded item. Used on unmount.
  pub async fn close(&self) {
    self.replace_identity(None).await;
  }

  /// Fetches exactly one page.
  pub async fn load_page(&self, page: usize, mode: LoadMode) -> LoadOutcome {
    self.load(Target::Page(page, mode)).await
  }

  /// `load_page(page_index + 1, Append)`, unless there is nothing more.
  pub async fn load_more(&self) -> LoadOutcome {
    self.load(Target::Next).await
  }

  pub async fn snapshot(&self) -> ListSnapshot<T> {
    let state = self.state.read().await;
    let snapshot = state.snapshot();
    drop(state);
    snapshot
  }

  pub async fn key(&self) -> Option<ListKey> {
    let state = self.state.read().await;
    let key = state.key.clone();
    drop(state);
    key
  }

  pub fn subscribe(
    &self,
    callback: impl Fn(&ListSnapshot<T>) + Send + Sync + 'static,
  ) -> SubscriptionId {
    self.subscribers.subscribe((), callback)
  }

  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    self.subscribers.unsubscribe(id)
  }

  async fn replace_identity(&self, key: Option<ListKey>) {
    let mut state = self.state.write().await;
    let abandoned = state.reset(key);
    let snapshot = state.snapshot();
    drop(state);

    if let Some(in_flight) = abandoned {
      event!(Level::DEBUG, "Abandoned an in-flight page fetch.");
      in_flight.done.notify_waiters();
    }
    self.subscribers.emit(&(), &snapshot);
  }

  async fn load(&self, target: Target) -> LoadOutcome {
    let mut state = self.state.write().await;
    let Some(key) = state.key.clone() else {
      return LoadOutcome::Skipped;
    };

    let in_flight = state
      .in_flight
      .as_ref()
      .map(|f| (Arc::clone(&f.done), Arc::clone(&f.abandoned)));
    if let Some((done, abandoned)) = in_flight {
      // Registered before the flag is read, so the wakeup cannot be missed.
      let joined = done.notified();
      if !abandoned.load(Ordering::Acquire) {
        drop(state);
        event!(Level::DEBUG, "Joining in-flight page fetch of {key}.");
        joined.await;
        return LoadOutcome::Joined;
      }
      event!(Level::DEBUG, "Clearing an abandoned page fetch of {key}.");
      state.in_flight = None;
      state.loading = false;
    }

    let (page, mode) = match target {
      Target::Page(page, mode) => (page, mode),
      Target::Next if state.has_more() => (state.next_page(), LoadMode::Append),
      Target::Next => return LoadOutcome::Skipped,
    };
    let Some(page) = state.clamp_request(page, mode) else {
      return LoadOutcome::Skipped;
    };

    let done = Arc::new(Notify::new());
    let abandoned = Arc::new(AtomicBool::new(false));
    state.in_flight = Some(InFlight {
      done: Arc::clone(&done),
      abandoned: Arc::clone(&abandoned),
    });
    state.loading = true;
    let generation = state.generation;
    let snapshot = state.snapshot();
    drop(state);
    self.subscribers.emit(&(), &snapshot);

    let mut completion = Completion {
      state: &self.state,
      generation,
      done,
      abandoned,
      finished: false,
    };

    event!(Level::DEBUG, "Fetching page {page} of {key}.");
    let result = self
      .backend
      .list_page(&key, page, self.page_size)
      .await
      .and_then(Page::decode::<T>);

    let mut state = self.state.write().await;
    completion.finished = true;
    if state.generation != generation {
      drop(state);
      event!(Level::DEBUG, "Discarding stale page {page} of {key}.");
      return LoadOutcome::Stale;
    }

    state.in_flight = None;
    state.loading = false;
    let outcome = match result {
      Ok(fetched) => {
        state.apply(page, mode, fetched);
        LoadOutcome::Applied
      }
      Err(err) => {
        event!(Level::WARN, "Failed to load page {page} of {key}: {err}");
        state.error = Some(err.clone());
        LoadOutcome::Failed(err)
      }
    };
    let snapshot = state.snapshot();
    drop(state);

    completion.done.notify_waiters();
    self.subscribers.emit(&(), &snapshot);
    outcome
  }
}

/// Releases the in-flight slot if the loading future is dropped mid-fetch.
///
/// The flag frees the slot for the next `load` even when the lock is busy
/// right now; clearing it here is only a shortcut.
struct Completion<'a, T> {
  state: &'a RwLock<ListState<T>>,
  generation: u64,
  done: Arc<Notify>,
  abandoned: Arc<AtomicBool>,
  finished: bool,
}
impl<T> Drop for Completion<'_, T> {
  fn drop(&mut self) {
    if self.finished {
      return;
    }
    self.abandoned.store(true, Ordering::Release);
    let lock = self.state.try_write();
    if let Ok(mut state) = lock {
      if state.generation == self.generation {
        state.in_flight = None;
        state.loading = false;
      }
    }
    self.done.notify_waiters();
  }
}
