use crate::core::error::{Result, SweeperError};
use std::path::PathBuf;

const APP_DIR: &str = "lint-sweeper";

pub fn get_cache_directory() -> Result<PathBuf> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|home| home.join(".cache"))),
        "macos" => dirs::home_dir().map(|home| home.join("Library/Caches")),
        _ => dirs::cache_dir(),
    };

    base.map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| SweeperError::config_error("Could not determine a cache directory"))
}

/// Default location of the persisted repository cache.
pub fn default_cache_file() -> Result<PathBuf> {
    Ok(get_cache_directory()?.join("cache.json"))
}

/// Default root under which every repository gets its own working directory.
pub fn default_workspace_root() -> Result<PathBuf> {
    Ok(get_cache_directory()?.join("workspaces"))
}
