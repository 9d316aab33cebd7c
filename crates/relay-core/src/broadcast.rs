//! Broadcast orchestrator.
//!
//! Runs the single-target polling logic for every endpoint inside one
//! shared loop — cooperative time-slicing, not OS-level concurrency.
//! Endpoints are polled in registration order; each has its own timeout
//! clock, and one shared sleep per iteration is the only suspension point.

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::compose::{self, PreambleCounters};
use crate::config::RelayConfig;
use crate::endpoint::{resolve_actor, Endpoint};
use crate::error::Result;
use crate::protocol::Request;
use crate::terminal::Terminal;
use crate::wait::{self, WaitOptions, WaitOutcome, WaitState, WaitStatus};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Summary / outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct BroadcastSummary {
    pub total: usize,
    pub completed: usize,
    pub timeout: usize,
    pub error: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastStatus {
    Success,
    Timeout,
    Error,
    AllSendsFailed,
}

#[derive(Debug, Serialize)]
pub struct BroadcastOutcome {
    pub status: BroadcastStatus,
    pub summary: BroadcastSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_warning: Option<String>,
    pub results: Vec<WaitOutcome>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Send `base` to every configured endpoint except the caller's own and
/// poll them all to terminal outcomes.
pub fn broadcast(
    term: &dyn Terminal,
    clock: &dyn Clock,
    state_dir: &Path,
    config: &RelayConfig,
    counters: &mut PreambleCounters,
    base: &str,
    opts: &WaitOptions,
    suppress_preamble: bool,
    cancel: &CancelToken,
) -> Result<BroadcastOutcome> {
    let own_pane = std::env::var("TMUX_PANE").ok();
    broadcast_with_requests(
        term,
        clock,
        state_dir,
        config,
        counters,
        base,
        opts,
        suppress_preamble,
        cancel,
        own_pane.as_deref(),
        |endpoint| Request::new(&endpoint.address),
    )
}

/// Inner entry point taking a request factory so tests can pin per-endpoint
/// nonces.
#[allow(clippy::too_many_arguments)]
pub(crate) fn broadcast_with_requests(
    term: &dyn Terminal,
    clock: &dyn Clock,
    state_dir: &Path,
    config: &RelayConfig,
    counters: &mut PreambleCounters,
    base: &str,
    opts: &WaitOptions,
    suppress_preamble: bool,
    cancel: &CancelToken,
    own_pane: Option<&str>,
    mut make_request: impl FnMut(&Endpoint) -> Request,
) -> Result<BroadcastOutcome> {
    let (actor, actor_warning) = resolve_actor(&config.endpoints, own_pane);
    if let Some(w) = &actor_warning {
        warn!("{w}");
    }

    // Phase 1: send to each endpoint with a distinct nonce. A failed send
    // or registration marks only that endpoint and the phase continues for
    // the rest; an interrupt stops every remaining send.
    let mut states: Vec<WaitState> = Vec::new();
    let mut skipped = 0usize;
    let mut attempted = 0usize;
    let mut send_failures = 0usize;
    for endpoint in &config.endpoints {
        if actor.as_deref() == Some(endpoint.name.as_str()) {
            debug!(endpoint = %endpoint.name, "skipping own endpoint");
            skipped += 1;
            continue;
        }
        let request = make_request(endpoint);
        let now = clock.now_ms();
        let mut state = WaitState::new(endpoint, request, opts, now);
        if cancel.is_cancelled() {
            state.cancel(state_dir, now);
            states.push(state);
            continue;
        }
        attempted += 1;
        if let Err(e) = wait::register(state_dir, &endpoint.name, &state.request, now) {
            warn!(endpoint = %endpoint.name, error = %e, "failed to record active request; endpoint marked errored");
            state.fail(state_dir, e.to_string(), now);
            send_failures += 1;
            states.push(state);
            continue;
        }

        let composed = compose::compose(
            base,
            endpoint,
            &config.preambles,
            counters,
            suppress_preamble,
        );
        let outbound = wait::outbound_text(&composed, &state.request.nonce, endpoint);
        if let Err(e) = term.send(&endpoint.address, &outbound) {
            warn!(endpoint = %endpoint.name, error = %e, "send failed; endpoint excluded from polling");
            state.fail(state_dir, e.to_string(), clock.now_ms());
            send_failures += 1;
        }
        states.push(state);
    }

    if attempted > 0 && send_failures == attempted {
        return Ok(finish(states, skipped, true, actor_warning));
    }

    // Phase 2: shared poll loop. Per-endpoint timeout checks first, one
    // shared sleep, then a capture round for every still-pending endpoint.
    while states.iter().any(WaitState::is_pending) {
        if cancel.is_cancelled() {
            let now = clock.now_ms();
            for state in states.iter_mut().filter(|s| s.is_pending()) {
                state.cancel(state_dir, now);
            }
            break;
        }
        let now = clock.now_ms();
        for state in states.iter_mut() {
            state.expire_if_timed_out(state_dir, now);
        }
        if !states.iter().any(WaitState::is_pending) {
            break;
        }
        clock.sleep_ms(opts.poll_interval_ms);
        for state in states.iter_mut().filter(|s| s.is_pending()) {
            state.poll(term, state_dir, clock.now_ms());
        }
    }

    Ok(finish(states, skipped, false, actor_warning))
}

fn finish(
    states: Vec<WaitState>,
    skipped: usize,
    all_sends_failed: bool,
    actor_warning: Option<String>,
) -> BroadcastOutcome {
    let results: Vec<WaitOutcome> = states.into_iter().map(WaitState::into_outcome).collect();
    let mut summary = BroadcastSummary {
        total: results.len() + skipped,
        skipped,
        ..Default::default()
    };
    for r in &results {
        match r.status {
            WaitStatus::Completed => summary.completed += 1,
            WaitStatus::Timeout => summary.timeout += 1,
            WaitStatus::Error => summary.error += 1,
            WaitStatus::Cancelled => summary.cancelled += 1,
            WaitStatus::Pending => {}
        }
    }
    let status = if all_sends_failed {
        BroadcastStatus::AllSendsFailed
    } else if summary.timeout > 0 {
        BroadcastStatus::Timeout
    } else if summary.error > 0 || summary.cancelled > 0 {
        BroadcastStatus::Error
    } else {
        BroadcastStatus::Success
    };
    BroadcastOutcome {
        status,
        summary,
        actor_warning,
        results,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
