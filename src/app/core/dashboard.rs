use anyhow::{bail, Context};
use environment::PROFILE_USERNAME;
use repositories::{LoadMode, LoadOutcome};
use services::{open_follow_popup, open_profile, SyncLayer, SYNC};
use tracing::{event, Level};
use types::ListKind;
use utils::handle_api_failure;

/// Headless dashboard: opens the configured profile, walks its followers and
/// reads the viewer's notifications, logging every state change on the way.
///
/// # Errors
///
/// When the followers list keeps failing past the retry budget.
pub async fn act() -> anyhow::Result<()> {
  let sync = SYNC.get().await;
  let profile = *PROFILE_USERNAME;
  watch(sync, profile);

  let opened = open_profile::act(sync, profile).await;
  if let Some(err) = &opened.summary.error {
    event!(Level::WARN, "Summary for {profile} unavailable: {err}");
  }
  event!(
    Level::INFO,
    "{profile} has {} posts loaded, featured on {}.",
    opened.posts.items.len(),
    opened.featured_on.items.len()
  );

  let followers = walk_followers(sync, profile).await?;
  event!(Level::INFO, "{profile} has {followers} followers loaded.");

  let inbox = sync.notifications.fetch_all(sync.viewer()).await;
  if let Some(err) = &inbox.error {
    event!(Level::WARN, "Notifications unavailable: {err}");
  }
  event!(Level::INFO, "{} unread notifications.", inbox.unread_count());

  Ok(())
}

fn watch<B: api::Backend>(sync: &SyncLayer<B>, profile: &str) {
  sync.summaries.subscribe(profile, |view| {
    let (Some(followers), Some(following), Some(fetched_at)) = (
      view.followers_count(),
      view.following_count(),
      view.fetched_at(),
    ) else {
      event!(Level::INFO, "{}: loading...", view.target_user_name);
      return;
    };
    event!(
      Level::INFO,
      "{}: {followers} followers, {following} following as of {}{}.",
      view.target_user_name,
      fetched_at.format("%H:%M:%S"),
      if view.stale { " (stale)" } else { "" }
    );
  });
  sync.follows.subscribe(profile, |toggle| {
    event!(
      Level::INFO,
      "Follow toggle {} for {}: {:?}.",
      toggle.request_id,
      toggle.target_user_name,
      toggle.phase
    );
  });
  sync.notifications.subscribe(sync.viewer(), |inbox| {
    event!(Level::INFO, "Notification badge: {}.", inbox.unread_count());
  });
}

async fn walk_followers<B: api::Backend>(
  sync: &SyncLayer<B>,
  profile: &str,
) -> anyhow::Result<usize> {
  let popup = open_follow_popup::act(sync, profile, ListKind::Followers).await;
  let mut failures_in_a_row = 0;
  loop {
    let snapshot = popup.snapshot().await;
    let outcome = match (&snapshot.error, snapshot.page_index) {
      // The first page failed, retry it rather than moving on.
      (Some(_), None) => popup.load_page(0, LoadMode::Replace).await,
      _ => popup.load_more().await,
    };
    match outcome {
      LoadOutcome::Applied | LoadOutcome::Joined => failures_in_a_row = 0,
      LoadOutcome::Skipped => break,
      LoadOutcome::Stale => bail!("Followers list of {profile} was replaced mid-walk"),
      LoadOutcome::Failed(err) => {
        event!(Level::WARN, "Failed to load followers of {profile}: {err}");
        if handle_api_failure(&mut failures_in_a_row).await {
          return Err(err).context(format!("Giving up on followers of {profile}"));
        }
      }
    }
  }
  let loaded = popup.snapshot().await.items.len();
  open_follow_popup::close(sync).await;
  Ok(loaded)
}
