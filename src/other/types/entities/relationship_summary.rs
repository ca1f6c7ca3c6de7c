use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::UserName;

/// Wire shape of `GET relationship-summary/{userName}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipSummaryData {
  pub followers_count: i64,
  pub following_count: i64,
  pub is_following: bool,
}

/// Counts and follow status for one target, as seen by the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipSummary {
  pub target_user_name: UserName,
  pub followers_count: u64,
  pub following_count: u64,
  pub is_following: bool,
  pub fetched_at: DateTime<Utc>,
}
impl RelationshipSummary {
  /// Negative counts from the server are clamped to zero.
  #[must_use]
  pub fn from_data(
    target_user_name: UserName,
    data: RelationshipSummaryData,
    fetched_at: DateTime<Utc>,
  ) -> Self {
    Self {
      target_user_name,
      followers_count: u64::try_from(data.followers_count).unwrap_or(0),
      following_count: u64::try_from(data.following_count).unwrap_or(0),
      is_following: data.is_following,
      fetched_at,
    }
  }

  /// The summary as it would look after following (or unfollowing) the
  /// target: `is_following` flips to `follow`, followers move by one and
  /// never go below zero.
  #[must_use]
  pub fn with_follow(&self, follow: bool) -> Self {
    let followers_count = match (self.is_following, follow) {
      (false, true) => self.followers_count.saturating_add(1),
      (true, false) => self.followers_count.saturating_sub(1),
      _ => self.followers_count,
    };
    Self {
      followers_count,
      is_following: follow,
      ..self.clone()
    }
  }
}
