//! Active-request registry.
//!
//! Advisory-only store of in-flight requests per endpoint, shared across
//! invocations through one YAML file. Its sole purpose is the collision
//! warning for the next invocation; it provides no locking, and two
//! concurrent waits on the same endpoint may interleave. That relaxation is
//! deliberate.

use crate::error::Result;
use crate::{io, paths};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRequest {
    pub request_id: String,
    pub nonce: String,
    pub address: String,
    pub started_at_ms: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ActiveFile {
    #[serde(default)]
    entries: BTreeMap<String, ActiveRequest>,
}

fn load(state_dir: &Path) -> Result<ActiveFile> {
    let path = paths::active_path(state_dir);
    if !path.exists() {
        return Ok(ActiveFile::default());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(serde_yaml::from_str(&content)?)
}

fn save(state_dir: &Path, file: &ActiveFile) -> Result<()> {
    let path = paths::active_path(state_dir);
    io::atomic_write(&path, serde_yaml::to_string(file)?.as_bytes())
}

/// Record an in-flight request for `endpoint`. Returns the entry it
/// replaced, if any, so the caller can surface a collision warning.
pub fn set_active_request(
    state_dir: &Path,
    endpoint: &str,
    entry: ActiveRequest,
) -> Result<Option<ActiveRequest>> {
    let mut file = load(state_dir)?;
    let previous = file.entries.insert(endpoint.to_string(), entry);
    save(state_dir, &file)?;
    Ok(previous)
}

/// Remove the entry for `endpoint`. Removing a missing entry is a no-op, so
/// every terminal transition can clear unconditionally.
pub fn clear_active_request(state_dir: &Path, endpoint: &str) -> Result<()> {
    let mut file = load(state_dir)?;
    if file.entries.remove(endpoint).is_some() {
        save(state_dir, &file)?;
    }
    Ok(())
}

pub fn get_active_request(state_dir: &Path, endpoint: &str) -> Result<Option<ActiveRequest>> {
    Ok(load(state_dir)?.entries.get(endpoint).cloned())
}

pub fn list_active_requests(state_dir: &Path) -> Result<Vec<(String, ActiveRequest)>> {
    Ok(load(state_dir)?.entries.into_iter().collect())
}

/// Best-effort TTL cleanup: drop entries older than `ttl_secs` as of
/// `now_ms`. Returns how many were removed.
pub fn cleanup_state(state_dir: &Path, ttl_secs: u64, now_ms: u64) -> Result<usize> {
    let mut file = load(state_dir)?;
    let cutoff = now_ms.saturating_sub(ttl_secs * 1_000);
    let before = file.entries.len();
    file.entries.retain(|_, e| e.started_at_ms >= cutoff);
    let removed = before - file.entries.len();
    if removed > 0 {
        save(state_dir, &file)?;
    }
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
