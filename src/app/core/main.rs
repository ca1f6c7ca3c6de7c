mod dashboard;
mod on_shutdown;

use environment::WORKSPACE_DIR;
use on_shutdown::with_graceful_shutdown;
use tracing::{event, Level};

#[cfg(unix)]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() {
  dotenv::from_filename(WORKSPACE_DIR.join(".env")).ok();
  // Logging - The variables are needed for the lifetime of the program
  let _log_guards = utils::init_logging().await;

  event!(Level::INFO, "Dashboard starting!");

  tokio::spawn(async {
    match dashboard::act().await {
      Ok(()) => event!(Level::INFO, "Dashboard is up to date. Waiting for shutdown..."),
      Err(e) => event!(Level::ERROR, "Dashboard stopped: {e:#}"),
    }
  });

  with_graceful_shutdown().await;
}
