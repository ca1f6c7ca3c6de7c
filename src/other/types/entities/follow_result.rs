use std::str::FromStr;

use thiserror::Error as ThisError;

/// Direction the server reports after a follow toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowResult {
  Followed,
  Unfollowed,
}
impl FollowResult {
  #[must_use]
  pub const fn is_following(self) -> bool {
    matches!(self, Self::Followed)
  }

  #[must_use]
  pub const fn from_is_following(is_following: bool) -> Self {
    if is_following {
      Self::Followed
    } else {
      Self::Unfollowed
    }
  }
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[error("Unexpected follow result: {0:?}")]
pub struct ParseError(pub String);

impl FromStr for FollowResult {
  type Err = ParseError;

  /// Exact match only. No trimming, no case folding.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Followed" => Ok(Self::Followed),
      "Unfollowed" => Ok(Self::Unfollowed),
      other => Err(ParseError(other.to_string())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_the_exact_vocabulary() {
    assert_eq!("Followed".parse(), Ok(FollowResult::Followed));
    assert_eq!("Unfollowed".parse(), Ok(FollowResult::Unfollowed));
    assert!("followed".parse::<FollowResult>().is_err());
    assert!(" Followed".parse::<FollowResult>().is_err());
    assert!("true".parse::<FollowResult>().is_err());
  }
}
