use std::path::{Path, PathBuf};

/// Canonicalizes the deepest ancestor of `path` that exists, then re-appends
/// the part that does not exist yet.
#[must_use]
pub fn canonicalize_unexistent(path: &Path) -> Option<PathBuf> {
  path.ancestors().find_map(|ancestor| {
    let canonical = ancestor.canonicalize().ok()?;
    let missing = path.strip_prefix(ancestor).ok()?;
    Some(canonical.join(missing))
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn keeps_the_missing_tail() {
    let base = std::env::temp_dir();
    let wanted = base.join("social_sync_missing_dir").join("logs");
    let resolved = canonicalize_unexistent(&wanted).unwrap();
    assert!(resolved.ends_with("social_sync_missing_dir/logs"));
    assert!(resolved.is_absolute());
  }
}
