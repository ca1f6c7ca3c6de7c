use api::Backend;
use tracing::{event, Level};

use crate::{
  follow_toggle::{Error, ToggleOutcome},
  SyncLayer,
};

/// The follow button. Logs the result; the caller renders the error.
///
/// # Errors
///
/// See `FollowToggleCoordinator::toggle`.
pub async fn act<B: Backend>(sync: &SyncLayer<B>, target: &str) -> Result<ToggleOutcome, Error> {
  let outcome = sync.follows.toggle(target).await;
  match &outcome {
    Ok(ToggleOutcome::Confirmed(view)) => event!(
      Level::INFO,
      "{} {target}.",
      if view.is_following() == Some(true) {
        "Followed"
      } else {
        "Unfollowed"
      }
    ),
    Ok(ToggleOutcome::Superseded) => {
      event!(Level::DEBUG, "Toggle for {target} was superseded.");
    }
    Err(Error::OwnProfile | Error::AlreadyToggling(_)) => {
      event!(Level::DEBUG, "Ignored toggle for {target}.");
    }
    Err(e) => event!(Level::WARN, "Could not toggle follow for {target}: {e}"),
  }
  outcome
}
