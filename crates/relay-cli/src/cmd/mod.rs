pub mod broadcast;
pub mod endpoints;
pub mod send;
pub mod state;

use anyhow::Context;
use relay_core::compose::PreambleCounters;
use relay_core::{paths, CancelToken, RelayConfig};
use std::path::{Path, PathBuf};

/// Shared command context: config, state dir, and preamble counters.
pub struct Ctx {
    pub config: RelayConfig,
    pub state_dir: PathBuf,
    pub counters: PreambleCounters,
}

pub fn load_ctx(config_path: Option<&Path>) -> anyhow::Result<Ctx> {
    let path = paths::config_path(config_path)?;
    let config =
        RelayConfig::load(&path).with_context(|| format!("loading {}", path.display()))?;
    for warning in config.validate() {
        tracing::warn!("{}", warning.message);
    }
    let state_dir = paths::state_dir()?;
    let counters = PreambleCounters::load(&state_dir).context("loading preamble counters")?;
    Ok(Ctx {
        config,
        state_dir,
        counters,
    })
}

/// Wire Ctrl-C to a cancellation token for the duration of this invocation.
/// The handler only flips the token, so firing twice is harmless.
pub fn install_interrupt() -> anyhow::Result<CancelToken> {
    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to set interrupt handler")?;
    Ok(token)
}
