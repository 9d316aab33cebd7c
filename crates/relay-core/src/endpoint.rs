use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// A named, addressable terminal destination. Owned by the config file; the
/// engine only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    /// Opaque terminal address (a tmux pane id like `%5` or target like
    /// `session:window.pane`).
    pub address: String,
    /// Optional preamble injected ahead of outbound messages, rate-limited
    /// by [`crate::config::PreambleConfig::every_n`].
    #[serde(default)]
    pub preamble: Option<String>,
    /// Characters this endpoint's input layer mishandles; stripped from
    /// composed messages before sending.
    #[serde(default)]
    pub strip_chars: Option<String>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            preamble: None,
            strip_chars: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Identity resolution
// ---------------------------------------------------------------------------

/// Resolve the calling process's own endpoint so broadcast can skip it.
///
/// tmux exports the containing pane id as `$TMUX_PANE`; an endpoint whose
/// address is that pane id (or ends in it, for `session:window.%id` forms)
/// is the caller. Returns the endpoint name plus an optional advisory
/// warning when identity cannot be determined.
pub fn resolve_actor(
    endpoints: &[Endpoint],
    own_pane: Option<&str>,
) -> (Option<String>, Option<String>) {
    let Some(pane) = own_pane.filter(|p| !p.is_empty()) else {
        return (
            None,
            Some("could not determine own identity (TMUX_PANE unset); broadcasting to all endpoints".to_string()),
        );
    };
    let actor = endpoints
        .iter()
        .find(|e| e.address == pane || e.address.ends_with(pane))
        .map(|e| e.name.clone());
    match actor {
        Some(name) => (Some(name), None),
        None => (
            None,
            Some(format!(
                "own pane {pane} matches no configured endpoint; broadcasting to all endpoints"
            )),
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
