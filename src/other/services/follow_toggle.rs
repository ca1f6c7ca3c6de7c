use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use api::Backend;
use repositories::{RelationshipSummaryCache, SummaryView};
use thiserror::Error as ThisError;
use tokio::runtime::Handle;
use tracing::{event, Level};
use types::{FollowResult, RelationshipSummary, UserName};
use utils::{RequestId, RequestIds, SubscriptionId, Subscribers};

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  #[error("Cannot follow or unfollow your own profile")]
  OwnProfile,
  #[error("A follow toggle for {0} is already in flight")]
  AlreadyToggling(UserName),
  #[error("Network failure: {0}")]
  Network(String),
  #[error("Invalid server result: {0}")]
  InvalidServerResult(String),
  #[error("Server reported {actual:?}, expected {expected:?}")]
  DirectionMismatch {
    expected: FollowResult,
    actual: FollowResult,
  },
}
impl From<api::Error> for Error {
  fn from(err: api::Error) -> Self {
    match err {
      api::Error::Network(msg) => Self::Network(msg),
      api::Error::InvalidServerResult(msg) => Self::InvalidServerResult(msg),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
  /// The server agreed. Carries the re-fetched summary.
  Confirmed(SummaryView),
  /// A newer toggle (or a cancel) took over before this one resolved.
  Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TogglePhase {
  Idle,
  Toggling,
  Confirmed,
  RolledBack,
}

/// Emitted to subscribers on every phase change for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleEvent {
  pub target_user_name: UserName,
  pub phase: TogglePhase,
  pub request_id: RequestId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
  /// Waiting for the summary the optimistic change is based on.
  Preparing,
  Awaiting,
  Resolving,
  Cancelling,
}

/// One toggle round trip. Lives in the coordinator until it resolves.
#[derive(Debug)]
struct FollowToggleRequest {
  request_id: RequestId,
  previous: Option<RelationshipSummary>,
  stage: Stage,
}

/// A request taken over by `cancel` or by a dropped toggle.
struct Claimed {
  request_id: RequestId,
  stage: Stage,
  previous: Option<RelationshipSummary>,
}

type Requests = HashMap<UserName, FollowToggleRequest>;

/// State reachable from the cleanup of a dropped toggle.
struct Shared<B> {
  cache: Arc<RelationshipSummaryCache<B>>,
  requests: Mutex<Requests>,
  subscribers: Subscribers<UserName, ToggleEvent>,
}
impl<B: Backend> Shared<B> {
  fn requests(&self) -> MutexGuard<'_, Requests> {
    self.requests.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Still waiting for its summary, neither cancelled nor replaced.
  fn is_preparing(&self, target: &UserName, request_id: RequestId) -> bool {
    let requests = self.requests();
    let preparing = requests.get(target).is_some_and(|request| {
      request.request_id == request_id && request.stage == Stage::Preparing
    });
    drop(requests);
    preparing
  }

  /// Records the rollback snapshot and opens the request to resolution.
  /// False when the request was cancelled in the meantime.
  fn arm(&self, target: &UserName, request_id: RequestId, previous: RelationshipSummary) -> bool {
    let mut requests = self.requests();
    let armed = match requests.get_mut(target) {
      Some(request) if request.request_id == request_id && request.stage == Stage::Preparing => {
        request.previous = Some(previous);
        request.stage = Stage::Awaiting;
        true
      }
      _ => false,
    };
    drop(requests);
    armed
  }

  /// Claims the right to apply this request's resolution.
  fn begin_resolving(&self, target: &UserName, request_id: RequestId) -> bool {
    let mut requests = self.requests();
    let latest = match requests.get_mut(target) {
      Some(request) if request.request_id == request_id && request.stage == Stage::Awaiting => {
        request.stage = Stage::Resolving;
        true
      }
      _ => false,
    };
    drop(requests);
    latest
  }

  /// Moves the request for `target` to `Cancelling` if `accept` allows it.
  fn claim(&self, target: &str, accept: impl Fn(&FollowToggleRequest) -> bool) -> Option<Claimed> {
    let mut requests = self.requests();
    let claimed = requests
      .get_mut(target)
      .filter(|request| request.stage != Stage::Cancelling && accept(request))
      .map(|request| {
        let claimed = Claimed {
          request_id: request.request_id,
          stage: request.stage,
          previous: request.previous.clone(),
        };
        request.stage = Stage::Cancelling;
        claimed
      });
    drop(requests);
    claimed
  }

  fn release(&self, target: &UserName, request_id: RequestId) {
    let mut requests = self.requests();
    if requests
      .get(target)
      .is_some_and(|request| request.request_id == request_id)
    {
      requests.remove(target);
    }
    drop(requests);
  }

  /// Frees the target after a rollback.
  fn finish(&self, target: &UserName, request_id: RequestId) {
    self.release(target, request_id);
    self.emit(target, TogglePhase::RolledBack, request_id);
    self.emit(target, TogglePhase::Idle, request_id);
  }

  /// Puts the cache back after a toggle that will never settle.
  async fn undo(
    &self,
    target: &UserName,
    request_id: RequestId,
    stage: Stage,
    previous: RelationshipSummary,
  ) {
    // Once resolving, the snapshot may already be replaced; a re-read decides.
    if stage == Stage::Awaiting {
      self.cache.restore(previous).await;
    }
    self.cache.invalidate(target).await;
    self.finish(target, request_id);
  }

  fn emit(&self, target: &UserName, phase: TogglePhase, request_id: RequestId) {
    self.subscribers.emit(
      target,
      &ToggleEvent {
        target_user_name: Arc::clone(target),
        phase,
        request_id,
      },
    );
  }
}

/// Held by a running `toggle`. If the toggle future is dropped before it
/// returns, frees the target and rolls back the optimistic change.
struct Reservation<B: Backend> {
  shared: Arc<Shared<B>>,
  target: UserName,
  request_id: RequestId,
  settled: bool,
}
impl<B: Backend> Reservation<B> {
  fn disarm(mut self) {
    self.settled = true;
  }
}
impl<B: Backend> Drop for Reservation<B> {
  fn drop(&mut self) {
    if self.settled {
      return;
    }
    let request_id = self.request_id;
    let Some(claimed) = self
      .shared
      .claim(&self.target, |request| request.request_id == request_id)
    else {
      return;
    };
    event!(
      Level::DEBUG,
      "Toggle {request_id} for {} was dropped before it resolved.",
      self.target
    );

    // Nothing was applied while preparing.
    let Some(previous) = claimed.previous else {
      self.shared.finish(&self.target, request_id);
      return;
    };
    if let Ok(runtime) = Handle::try_current() {
      let shared = Arc::clone(&self.shared);
      let target = Arc::clone(&self.target);
      runtime.spawn(async move {
        shared.undo(&target, request_id, claimed.stage, previous).await;
      });
      return;
    }
    self.shared.finish(&self.target, request_id);
  }
}

/// Optimistic follow/unfollow with exact rollback.
///
/// Per target: `Idle -> Toggling -> (Confirmed | RolledBack) -> Idle`. Only
/// the last-issued request for a target may apply its resolution.
pub struct FollowToggleCoordinator<B> {
  backend: Arc<B>,
  request_ids: RequestIds,
  shared: Arc<Shared<B>>,
}
impl<B: Backend> FollowToggleCoordinator<B> {
  #[must_use]
  pub fn new(backend: Arc<B>, cache: Arc<RelationshipSummaryCache<B>>) -> Self {
    Self {
      backend,
      request_ids: RequestIds::new(),
      shared: Arc::new(Shared {
        cache,
        requests: Mutex::new(HashMap::new()),
        subscribers: Subscribers::new(),
      }),
    }
  }

  #[must_use]
  pub fn phase(&self, target: &str) -> TogglePhase {
    let requests = self.shared.requests();
    let toggling = requests.contains_key(target);
    drop(requests);
    if toggling {
      TogglePhase::Toggling
    } else {
      TogglePhase::Idle
    }
  }

  /// Flips the viewer's follow status on `target`.
  ///
  /// One toggle per target at a time: calling again while one is in flight
  /// is rejected with `AlreadyToggling`, the first click is the one that
  /// counts. To replace an in-flight toggle, `cancel` it and toggle again; the
  /// cancelled one then resolves as `Superseded`.
  ///
  /// Dropping the returned future before it resolves frees the target and
  /// rolls the optimistic change back.
  ///
  /// # Errors
  ///
  /// `OwnProfile` and `AlreadyToggling` are rejected before anything changes.
  /// Every other error means the optimistic change was rolled back exactly.
  pub async fn toggle(&self, target: &str) -> Result<ToggleOutcome, Error> {
    if self.shared.cache.is_own_profile(target) {
      return Err(Error::OwnProfile);
    }
    let target: UserName = Arc::from(target);
    let request_id = self.reserve(&target)?;
    let reservation = Reservation {
      shared: Arc::clone(&self.shared),
      target: Arc::clone(&target),
      request_id,
      settled: false,
    };
    self.shared.emit(&target, TogglePhase::Toggling, request_id);

    let outcome = self.run(&target, request_id).await;
    reservation.disarm();
    outcome
  }

  async fn run(&self, target: &UserName, request_id: RequestId) -> Result<ToggleOutcome, Error> {
    let cache = &self.shared.cache;
    // The optimistic change needs a loaded entry to flip.
    let view = cache.get(target).await;
    if !self.shared.is_preparing(target, request_id) {
      event!(Level::DEBUG, "Toggle {request_id} for {target} cancelled before sending.");
      return Ok(ToggleOutcome::Superseded);
    }
    let Some(previous) = cache.apply_optimistic(target).await else {
      let err = view.error.map_or_else(
        || Error::Network(format!("No relationship summary for {target}")),
        Error::from,
      );
      self.shared.finish(target, request_id);
      return Err(err);
    };
    if !self.shared.arm(target, request_id, previous.clone()) {
      cache.restore(previous).await;
      return Ok(ToggleOutcome::Superseded);
    }

    let expected = FollowResult::from_is_following(!previous.is_following);
    event!(Level::DEBUG, "Toggle {request_id} for {target}: expecting {expected:?}.");
    let verdict = judge(self.backend.follow(target).await, expected);

    if !self.shared.begin_resolving(target, request_id) {
      event!(Level::DEBUG, "Dropping superseded toggle {request_id} for {target}.");
      if verdict.is_ok() && self.phase(target) == TogglePhase::Idle {
        // The server did flip; let the next read reconcile.
        cache.invalidate(target).await;
      }
      return Ok(ToggleOutcome::Superseded);
    }
    self.settle(target, request_id, previous, verdict).await
  }

  /// Applies the resolution of the latest request for `target`.
  async fn settle(
    &self,
    target: &UserName,
    request_id: RequestId,
    previous: RelationshipSummary,
    verdict: Result<FollowResult, Error>,
  ) -> Result<ToggleOutcome, Error> {
    let cache = &self.shared.cache;
    let outcome = match verdict {
      Ok(actual) => {
        event!(
          Level::DEBUG,
          "Toggle {request_id} for {target} confirmed, following: {}.",
          actual.is_following()
        );
        self.shared.emit(target, TogglePhase::Confirmed, request_id);
        cache.invalidate(target).await;
        Ok(ToggleOutcome::Confirmed(cache.get(target).await))
      }
      Err(err) => {
        event!(Level::WARN, "Toggle {request_id} for {target} rolled back: {err}");
        cache.restore(previous).await;
        if matches!(err, Error::DirectionMismatch { .. }) {
          cache.invalidate(target).await;
        }
        self.shared.emit(target, TogglePhase::RolledBack, request_id);
        Err(err)
      }
    };
    self.shared.release(target, request_id);
    self.shared.emit(target, TogglePhase::Idle, request_id);
    outcome
  }

  /// Abandons the in-flight toggle for `target`, restoring the pre-toggle
  /// summary. Its response, when it arrives, is dropped. A toggle still
  /// loading its summary is stopped before anything is sent.
  ///
  /// Returns false when there is nothing to cancel, including a toggle whose
  /// response is already being applied.
  pub async fn cancel(&self, target: &str) -> bool {
    let Some(claimed) = self.shared.claim(target, |request| {
      matches!(request.stage, Stage::Preparing | Stage::Awaiting)
    }) else {
      return false;
    };

    if let Some(previous) = claimed.previous {
      self.shared.cache.restore(previous).await;
    }
    let target: UserName = Arc::from(target);
    event!(Level::DEBUG, "Cancelled toggle {} for {target}.", claimed.request_id);
    self.shared.finish(&target, claimed.request_id);
    true
  }

  pub fn subscribe(
    &self,
    target: &str,
    callback: impl Fn(&ToggleEvent) + Send + Sync + 'static,
  ) -> SubscriptionId {
    self.shared.subscribers.subscribe(Arc::from(target), callback)
  }

  pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
    self.shared.subscribers.unsubscribe(id)
  }

  fn reserve(&self, target: &UserName) -> Result<RequestId, Error> {
    let mut requests = self.shared.requests();
    if requests.contains_key(target) {
      drop(requests);
      event!(Level::DEBUG, "Rejected toggle for {target}: already toggling.");
      return Err(Error::AlreadyToggling(Arc::clone(target)));
    }
    let request_id = self.request_ids.next_id();
    requests.insert(
      Arc::clone(target),
      FollowToggleRequest {
        request_id,
        previous: None,
        stage: Stage::Preparing,
      },
    );
    drop(requests);
    Ok(request_id)
  }
}

/// Reads the server's answer against the direction the optimistic change
/// assumed.
fn judge(reply: Result<String, api::Error>, expected: FollowResult) -> Result<FollowResult, Error> {
  let actual = reply?
    .parse::<FollowResult>()
    .map_err(|e| Error::InvalidServerResult(e.to_string()))?;
  if actual == expected {
    Ok(actual)
  } else {
    Err(Error::DirectionMismatch { expected, actual })
  }
}
