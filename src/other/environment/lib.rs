use std::str::FromStr;

mod environment;
pub use environment::*;

/// Utility to attempt leaking a Box to your desired static reference type.
fn try_leak<ToLeak, R: ?Sized>(to_leak: ToLeak) -> Option<&'static R>
where
  Box<R>: TryFrom<ToLeak>,
{
  let leaked: &'static R = Box::<R>::try_from(to_leak).ok().map(Box::leak)?;
  Some(leaked)
}

/// Reads and parses a variable without leaking it.
/// Empty values count as unset.
fn owned_var_opt<T: FromStr>(name: &'static str) -> Option<T> {
  std::env::var(name)
    .ok()
    .filter(|s| !s.trim().is_empty())?
    .parse::<T>()
    .ok()
}

/// For Copy-ish settings that have a sensible default.
fn owned_var_or<T: FromStr>(name: &'static str, default: T) -> T {
  owned_var_opt(name).unwrap_or(default)
}

/// # Leaks
/// This method will leak the parsed value, if any.
fn var_opt<Parsed: FromStr, R: ?Sized>(name: &'static str) -> Option<&'static R>
where
  Box<R>: TryFrom<Parsed>,
{
  try_leak(owned_var_opt::<Parsed>(name)?)
}

/// For settings the program cannot run without.
///
/// # Leaks
/// This method will leak the parsed value.
///
/// # Panics
/// When the environment variable is not found or when the parsing fails for R.
fn var<Parsed: FromStr, R: ?Sized>(name: &'static str) -> &'static R
where
  Box<R>: TryFrom<Parsed>,
{
  var_opt(name)
    .unwrap_or_else(|| panic!("Couldn't find or parse env variable {name} for given type"))
}

/// Like `var_opt`, but falls back to a default that is built on demand.
/// E.g.: An owned `PathBuf` -> A `&'static Path`.
///
/// # Leaks
/// This method will leak the parsed or the default value.
fn var_or_else<Parsed: Into<Box<R>> + FromStr, R: ?Sized, V: FnOnce() -> Parsed>(
  name: &'static str,
  default: V,
) -> &'static R
where
  Box<R>: TryFrom<Parsed>,
{
  var_opt(name).unwrap_or_else(|| Box::leak(default().into()))
}
