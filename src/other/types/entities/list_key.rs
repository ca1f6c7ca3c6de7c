use std::fmt;

use crate::UserName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
  Followers,
  Following,
  Posts,
  FeaturedOn,
  /// Owner is the search term rather than a username.
  Search,
}

/// Identity of one logical list: whose list, and which one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
  pub owner: UserName,
  pub kind: ListKind,
}
impl ListKey {
  pub fn new(owner: impl Into<UserName>, kind: ListKind) -> Self {
    Self {
      owner: owner.into(),
      kind,
    }
  }
}
impl fmt::Display for ListKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}({})", self.kind, self.owner)
  }
}
