use api::Backend;
use repositories::{ListSnapshot, LoadMode, SurfaceId};
use tracing::{event, Level};
use types::{ListKey, ListKind, UserHandle};

use crate::SyncLayer;

pub static SURFACE: &str = "search/users";

/// Server-side user search, one page at a time (paged UI, so every page
/// replaces the last). A blank term clears the surface and returns `None`.
pub async fn act<B: Backend>(
  sync: &SyncLayer<B>,
  term: &str,
  page: usize,
) -> Option<ListSnapshot<UserHandle>> {
  let term = term.trim();
  let surface = SurfaceId::from(SURFACE);
  if term.is_empty() {
    sync.users.unmount(&surface).await;
    return None;
  }

  event!(Level::DEBUG, "Searching users for {term:?}, page {page}.");
  let loader = sync
    .users
    .mount(surface, ListKey::new(term, ListKind::Search))
    .await;
  loader.load_page(page, LoadMode::Replace).await;
  Some(loader.snapshot().await)
}
