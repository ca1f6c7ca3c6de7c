use std::borrow::Cow;

/// Anything that can be accumulated in a paginated list.
pub trait Listed {
  /// Identifier used to de-duplicate items across pages.
  fn list_id(&self) -> Cow<'_, str>;
  /// Text matched by the local search filter.
  fn display_name(&self) -> &str;
}
