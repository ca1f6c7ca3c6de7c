use std::{
  collections::HashMap,
  hash::Hash,
  sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
  },
};

/// Handle returned by `subscribe`, used to `unsubscribe` later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Callback<V> = Arc<dyn Fn(&V) + Send + Sync>;

/// Keyed callback registry shared by every store.
///
/// Callbacks are invoked synchronously by `emit`, outside of the registry
/// lock, so a callback may subscribe or unsubscribe without deadlocking.
pub struct Subscribers<K, V> {
  next_id: AtomicU64,
  entries: Mutex<HashMap<K, Vec<(SubscriptionId, Callback<V>)>>>,
}
impl<K: Eq + Hash + Clone, V> Subscribers<K, V> {
  #[must_use]
  pub fn new() -> Self {
    Self {
      next_id: AtomicU64::new(0),
      entries: Mutex::new(HashMap::new()),
    }
  }

  pub fn subscribe(&self, key: K, callback: impl Fn(&V) + Send + Sync + 'static) -> SubscriptionId {
    let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
    self
      .lock()
      .entry(key)
      .or_default()
      .push((id, Arc::new(callback)));
    id
  }

  /// Returns false when the id was not registered.
  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    let mut entries = self.lock();
    let mut found = false;
    entries.retain(|_, callbacks| {
      let before = callbacks.len();
      callbacks.retain(|(cb_id, _)| *cb_id != id);
      found |= callbacks.len() != before;
      !callbacks.is_empty()
    });
    drop(entries);
    found
  }

  /// Calls every callback registered under `key` with `value`.
  pub fn emit(&self, key: &K, value: &V) {
    let callbacks: Vec<Callback<V>> = self
      .lock()
      .get(key)
      .map(|callbacks| callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect())
      .unwrap_or_default();
    for callback in callbacks {
      callback(value);
    }
  }

  #[must_use]
  pub fn count(&self, key: &K) -> usize {
    let entries = self.lock();
    let count = entries.get(key).map_or(0, Vec::len);
    drop(entries);
    count
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<K, Vec<(SubscriptionId, Callback<V>)>>> {
    // Callbacks never run under this lock, so poisoning can only come from a
    // panic inside HashMap operations; the map is still usable.
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}
impl<K: Eq + Hash + Clone, V> Default for Subscribers<K, V> {
  fn default() -> Self {
    Self::new()
  }
}
