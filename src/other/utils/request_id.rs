use std::{
  fmt,
  sync::atomic::{AtomicU64, Ordering},
};

/// Identity of one issued mutation. Later ids compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);
impl fmt::Display for RequestId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Monotonic source of `RequestId`s.
#[derive(Debug, Default)]
pub struct RequestIds(AtomicU64);
impl RequestIds {
  #[must_use]
  pub const fn new() -> Self {
    Self(AtomicU64::new(0))
  }

  #[must_use]
  pub fn next_id(&self) -> RequestId {
    RequestId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_increase() {
    let ids = RequestIds::new();
    let first = ids.next_id();
    let second = ids.next_id();
    assert!(second > first);
    assert_eq!(first.to_string(), "#1");
  }
}
