use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use tracing::level_filters::LevelFilter;

use crate::{owned_var_or, try_leak, var, var_opt, var_or_else};

lazy_static! {
  pub static ref STDOUT_LOG_SEVERITY: LevelFilter =
    owned_var_or("STDOUT_LOG_SEVERITY", LevelFilter::WARN);
  pub static ref LOG_DIRECTORY: &'static Path =
    var_or_else("LOG_DIRECTORY", || PathBuf::from("/var/log/social_sync"));
  pub static ref API_BASE_URL: &'static str = var::<String, _>("API_BASE_URL");
  pub static ref CURRENT_USERNAME: &'static str = var::<String, _>("CURRENT_USERNAME");
  pub static ref DEFAULT_PAGE_SIZE: usize = owned_var_or("DEFAULT_PAGE_SIZE", 20);
  pub static ref API_MAX_RETRIES: u8 = owned_var_or("API_MAX_RETRIES", 2);
  /// Profile opened by the headless dashboard. Falls back to the viewer's own.
  pub static ref PROFILE_USERNAME: &'static str =
    var_opt::<String, _>("PROFILE_USERNAME").unwrap_or(*CURRENT_USERNAME);
}

#[cfg(debug_assertions)]
lazy_static! {
  pub static ref WORKSPACE_DIR: &'static Path = {
    let output = std::process::Command::new(env!("CARGO"))
      .arg("locate-project")
      .arg("--workspace")
      .arg("--message-format=plain")
      .output()
      .unwrap_or_else(|e| panic!("Failed to run cargo locate-project: {e}"))
      .stdout;
    let manifest = String::from_utf8_lossy(&output);
    let cargo_path = Path::new(manifest.trim());
    let dir = cargo_path.parent().unwrap_or_else(|| Path::new("."));
    try_leak(dir.to_path_buf()).unwrap_or_else(|| panic!("Failed to leak workspace path"))
  };
}

#[cfg(not(debug_assertions))]
lazy_static! {
  pub static ref WORKSPACE_DIR: &'static Path =
    try_leak(PathBuf::from(".")).unwrap_or_else(|| panic!("Failed to leak workspace path"));
}
