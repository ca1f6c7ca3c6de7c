use std::{
  collections::HashSet,
  sync::{atomic::AtomicBool, Arc},
};

use api::{Error, Page};
use tokio::sync::Notify;
use types::{ListKey, Listed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
  /// Discard what is loaded and install the page. Tab switches, paged UIs.
  Replace,
  /// Merge after what is loaded, skipping known ids. "Load more".
  Append,
}

/// What subscribers and readers see of a list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot<T> {
  pub key: Option<ListKey>,
  pub items: Arc<Vec<T>>,
  /// `None` until a page has been applied.
  pub page_index: Option<usize>,
  pub total_pages: usize,
  pub has_more: bool,
  pub loading: bool,
  pub error: Option<Error>,
}

pub(crate) struct InFlight {
  pub(crate) done: Arc<Notify>,
  /// Set when the fetching future is dropped. The slot then counts as free
  /// even if it could not be cleared at the time.
  pub(crate) abandoned: Arc<AtomicBool>,
}

pub(crate) struct ListState<T> {
  pub(crate) key: Option<ListKey>,
  items: Arc<Vec<T>>,
  loaded_ids: HashSet<String>,
  page_index: Option<usize>,
  total_pages: usize,
  has_more: bool,
  pub(crate) loading: bool,
  pub(crate) error: Option<Error>,
  /// Bumped on every reset. Responses started under an older value are stale.
  pub(crate) generation: u64,
  pub(crate) in_flight: Option<InFlight>,
}
impl<T: Listed + Clone> ListState<T> {
  pub(crate) fn new() -> Self {
    Self {
      key: None,
      items: Arc::new(Vec::new()),
      loaded_ids: HashSet::new(),
      page_index: None,
      total_pages: 0,
      // Unknown until the first page arrives.
      has_more: true,
      loading: false,
      error: None,
      generation: 0,
      in_flight: None,
    }
  }

  /// Clears everything for a new identity and hands back the abandoned fetch,
  /// if any, so its joiners can be released.
  pub(crate) fn reset(&mut self, key: Option<ListKey>) -> Option<InFlight> {
    let generation = self.generation.wrapping_add(1);
    let abandoned = self.in_flight.take();
    *self = Self::new();
    self.key = key;
    self.generation = generation;
    abandoned
  }

  pub(crate) const fn has_more(&self) -> bool {
    self.has_more
  }

  pub(crate) fn next_page(&self) -> usize {
    self.page_index.map_or(0, |index| index + 1)
  }

  /// Keeps requests inside the known page range. `None` means there is
  /// nothing to request.
  pub(crate) fn clamp_request(&self, page: usize, mode: LoadMode) -> Option<usize> {
    if self.page_index.is_none() || page < self.total_pages {
      return Some(page);
    }
    match mode {
      LoadMode::Append => None,
      LoadMode::Replace => Some(self.total_pages.saturating_sub(1)),
    }
  }

  /// Installs a fetched page. Page 0 always replaces.
  pub(crate) fn apply(&mut self, requested: usize, mode: LoadMode, page: Page<T>) {
    let mode = if requested == 0 { LoadMode::Replace } else { mode };
    let items = Arc::make_mut(&mut self.items);
    if mode == LoadMode::Replace {
      items.clear();
      self.loaded_ids.clear();
    }
    for item in page.content {
      if self.loaded_ids.insert(item.list_id().into_owned()) {
        items.push(item);
      }
    }

    self.total_pages = page.total_pages;
    if self.total_pages == 0 {
      self.page_index = None;
      self.has_more = false;
    } else {
      let last = self.total_pages - 1;
      let index = requested.min(last);
      self.page_index = Some(index);
      self.has_more = index < last;
    }
    self.error = None;
  }

  pub(crate) fn snapshot(&self) -> ListSnapshot<T> {
    ListSnapshot {
      key: self.key.clone(),
      items: Arc::clone(&self.items),
      page_index: self.page_index,
      total_pages: self.total_pages,
      has_more: self.has_more,
      loading: self.loading,
      error: self.error.clone(),
    }
  }
}
