use repositories::SurfaceId;
use services::{open_follow_popup, open_profile, SYNC};
use tokio::signal;
use tracing::{event, Level};

async fn before_shutdown() {
  event!(
    Level::INFO,
    "The dashboard is shutting down! Releasing surfaces..."
  );
  let sync = SYNC.get().await;
  open_follow_popup::close(sync).await;
  for surface in [open_profile::POSTS_SURFACE, open_profile::FEATURED_SURFACE] {
    sync.posts.unmount(&SurfaceId::from(surface)).await;
  }
}

pub async fn with_graceful_shutdown() {
  shutdown_signal().await;
  before_shutdown().await;
}

/// # Panics
///
/// Will panic if fails to install any of the signal handlers.
async fn shutdown_signal() {
  let ctrl_c = async {
    signal::ctrl_c()
      .await
      .unwrap_or_else(|e| panic!("Failed to install Ctrl+C handler! {e}"));
  };

  #[cfg(unix)]
  let term_or_int = async {
    signal::unix::signal(signal::unix::SignalKind::terminate())
      .unwrap_or_else(|e| panic!("Failed to install SIGTERM handler! {e}"))
      .recv()
      .await;
  };

  #[cfg(windows)]
  let term_or_int = async {
    signal::windows::ctrl_close()
      .unwrap_or_else(|e| panic!("Failed to install Windows SIGINT handler! {e}"))
      .recv()
      .await;
  };

  tokio::select! {
    () = ctrl_c => {},
    () = term_or_int => {},
  }
}
