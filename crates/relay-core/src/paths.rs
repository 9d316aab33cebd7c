use crate::error::{RelayError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File constants
// ---------------------------------------------------------------------------

pub const RELAY_DIR: &str = ".agent-relay";

pub const CONFIG_FILE: &str = "config.yaml";
pub const ACTIVE_FILE: &str = "active.yaml";
pub const COUNTERS_FILE: &str = "counters.yaml";

pub const CONFIG_ENV: &str = "AGENT_RELAY_CONFIG";
pub const STATE_ENV: &str = "AGENT_RELAY_STATE";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// State directory: `$AGENT_RELAY_STATE` if set, else `~/.agent-relay`.
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(STATE_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = home::home_dir().ok_or(RelayError::HomeNotFound)?;
    Ok(home.join(RELAY_DIR))
}

/// Config file: explicit path, else `$AGENT_RELAY_CONFIG`, else the state dir.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(p));
    }
    Ok(state_dir()?.join(CONFIG_FILE))
}

pub fn active_path(state_dir: &Path) -> PathBuf {
    state_dir.join(ACTIVE_FILE)
}

pub fn counters_path(state_dir: &Path) -> PathBuf {
    state_dir.join(COUNTERS_FILE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
