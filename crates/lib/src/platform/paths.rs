use crate::consts::{APP_NAME, USER_CONFIG};
use std::path::PathBuf;

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  let userprofile = std::env::var("USERPROFILE").expect("USERPROFILE not set");
  PathBuf::from(userprofile)
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  let home = std::env::var("HOME").expect("HOME not set");
  PathBuf::from(home)
}

/// Returns the XDG configuration home (not application specific)
#[cfg(windows)]
pub fn config_home() -> PathBuf {
  let appdata = std::env::var("APPDATA").expect("APPDATA not set");
  PathBuf::from(appdata)
}

/// Returns the XDG configuration home (not application specific)
#[cfg(not(windows))]
pub fn config_home() -> PathBuf {
  std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns the default user configuration file
pub fn user_config_file() -> PathBuf {
  config_home().join(USER_CONFIG)
}

/// Returns the directory for cache files for the application
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  let local_appdata = std::env::var("LOCALAPPDATA").expect("LOCALAPPDATA not set");
  PathBuf::from(local_appdata).join(APP_NAME).join("Cache")
}

/// Returns the directory for cache files for the application
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  let cache_home = std::env::var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}

/// Expand a leading `~` to the home directory.
pub fn expand_user(path: &str) -> PathBuf {
  if let Some(rest) = path.strip_prefix("~/") {
    home_dir().join(rest)
  } else if path == "~" {
    home_dir()
  } else {
    PathBuf::from(path)
  }
}
