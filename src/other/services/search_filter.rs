use repositories::ListSnapshot;
use types::Listed;

/// Loaded items whose display name contains `term`, ignoring case.
///
/// A blank term keeps everything. Never reaches past what is loaded.
#[must_use]
pub fn filter<'a, T: Listed>(items: &'a [T], term: &str) -> Vec<&'a T> {
  let needle = term.trim().to_lowercase();
  if needle.is_empty() {
    return items.iter().collect();
  }
  items
    .iter()
    .filter(|item| item.display_name().to_lowercase().contains(&needle))
    .collect()
}

/// What a list surface renders while a search term is typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilterView<T> {
  pub term: String,
  pub items: Vec<T>,
  /// False while filtering: paging resumes once the term is cleared.
  pub can_load_more: bool,
}
impl<T: Listed + Clone> SearchFilterView<T> {
  #[must_use]
  pub fn new(snapshot: &ListSnapshot<T>, term: &str) -> Self {
    let filtering = !term.trim().is_empty();
    Self {
      term: term.to_string(),
      items: filter(&snapshot.items, term).into_iter().cloned().collect(),
      can_load_more: !filtering && snapshot.has_more && !snapshot.loading,
    }
  }

  #[must_use]
  pub fn is_filtering(&self) -> bool {
    !self.term.trim().is_empty()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use types::UserHandle;

  use super::*;

  fn user(name: &str) -> UserHandle {
    UserHandle {
      id: 0,
      user_name: Arc::from(name),
      profile_pic: None,
      role: None,
    }
  }

  fn snapshot(names: &[&str], has_more: bool) -> ListSnapshot<UserHandle> {
    ListSnapshot {
      key: None,
      items: Arc::new(names.iter().copied().map(user).collect()),
      page_index: Some(0),
      total_pages: 2,
      has_more,
      loading: false,
      error: None,
    }
  }

  #[test]
  fn matches_substrings_ignoring_case() {
    let users = [user("Annabel"), user("joANNe"), user("bob")];
    let names: Vec<&str> = filter(&users, "ann")
      .into_iter()
      .map(Listed::display_name)
      .collect();
    assert_eq!(names, ["Annabel", "joANNe"]);
  }

  #[test]
  fn blank_term_keeps_order_and_everything() {
    let users = [user("c"), user("a"), user("b")];
    assert_eq!(filter(&users, "").len(), 3);
    assert_eq!(filter(&users, "   ").len(), 3);
  }

  #[test]
  fn filtering_suppresses_load_more() {
    let snapshot = snapshot(&["ana", "bob"], true);

    let browsing = SearchFilterView::new(&snapshot, "");
    assert!(browsing.can_load_more);
    assert_eq!(browsing.items.len(), 2);

    let searching = SearchFilterView::new(&snapshot, "bo");
    assert!(searching.is_filtering());
    assert!(!searching.can_load_more);
    assert_eq!(searching.items, [user("bob")]);
  }

  #[test]
  fn exhausted_list_offers_nothing_more() {
    let view = SearchFilterView::new(&snapshot(&["ana"], false), "");
    assert!(!view.can_load_more);
  }
}
