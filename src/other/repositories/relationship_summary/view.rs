use api::Error;
use chrono::{DateTime, Utc};
use types::{RelationshipSummary, UserName};

/// What a surface renders for one target.
///
/// While the first fetch is pending there is no `summary`, so every count
/// reads as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView {
  pub target_user_name: UserName,
  pub summary: Option<RelationshipSummary>,
  /// A fetch for this target is in flight.
  pub pending: bool,
  /// Invalidated: the next `get` re-fetches.
  pub stale: bool,
  /// Set by the last failed fetch. Prior values are kept.
  pub error: Option<Error>,
  pub is_own_profile: bool,
}
impl SummaryView {
  #[must_use]
  pub fn followers_count(&self) -> Option<u64> {
    self.summary.as_ref().map(|s| s.followers_count)
  }

  #[must_use]
  pub fn following_count(&self) -> Option<u64> {
    self.summary.as_ref().map(|s| s.following_count)
  }

  #[must_use]
  pub fn is_following(&self) -> Option<bool> {
    self.summary.as_ref().map(|s| s.is_following)
  }

  #[must_use]
  pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
    self.summary.as_ref().map(|s| s.fetched_at)
  }

  /// The follow button is usable: loaded, not our own profile.
  #[must_use]
  pub const fn can_toggle(&self) -> bool {
    self.summary.is_some() && !self.is_own_profile
  }
}
