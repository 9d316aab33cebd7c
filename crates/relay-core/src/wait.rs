//! Single-target waiter.
//!
//! SENT → POLLING → {COMPLETED | TIMEOUT | ERROR | CANCELLED}. No re-entrant
//! transitions, no retries; every terminal transition releases the
//! endpoint's active-request registry entry before control returns.

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::compose::{self, build_wait_instruction};
use crate::config::WaitConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::extract::{extract_partial, extract_response};
use crate::protocol::{build_matcher, Request};
use crate::registry::{self, ActiveRequest};
use crate::settle::{SettleDetector, SettleThresholds};
use crate::terminal::Terminal;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// WaitOptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub capture_lines: u32,
    pub fallback_lines: usize,
}

impl WaitOptions {
    pub fn from_config(config: &WaitConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            poll_interval_ms: config.effective_poll_interval_ms(),
            capture_lines: config.capture_lines,
            fallback_lines: config.fallback_lines,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

// ---------------------------------------------------------------------------
// WaitStatus / WaitOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStatus {
    Pending,
    Completed,
    Timeout,
    Error,
    Cancelled,
}

/// The frozen result of one wait-mode request.
#[derive(Debug, Clone, Serialize)]
pub struct WaitOutcome {
    pub target: String,
    pub address: String,
    pub status: WaitStatus,
    pub request_id: String,
    pub nonce: String,
    pub marker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

// ---------------------------------------------------------------------------
// WaitState
// ---------------------------------------------------------------------------

/// Per-endpoint polling state. The broadcast orchestrator drives many of
/// these inside one loop; the single-target waiter drives exactly one.
/// Mutated only while `Pending`; frozen once the status leaves it.
pub struct WaitState {
    pub target: String,
    pub address: String,
    pub request: Request,
    pub status: WaitStatus,
    response: Option<String>,
    partial_response: Option<String>,
    error: Option<String>,
    started_at_ms: u64,
    elapsed_ms: u64,
    timeout_ms: u64,
    capture_lines: u32,
    fallback_lines: usize,
    detector: SettleDetector,
    last_capture: String,
}

impl WaitState {
    pub fn new(endpoint: &Endpoint, request: Request, opts: &WaitOptions, now_ms: u64) -> Self {
        let detector = SettleDetector::new(
            build_matcher(&request.nonce),
            SettleThresholds::for_timeout(opts.timeout_ms),
            now_ms,
        );
        Self {
            target: endpoint.name.clone(),
            address: endpoint.address.clone(),
            request,
            status: WaitStatus::Pending,
            response: None,
            partial_response: None,
            error: None,
            started_at_ms: now_ms,
            elapsed_ms: 0,
            timeout_ms: opts.timeout_ms,
            capture_lines: opts.capture_lines,
            fallback_lines: opts.fallback_lines,
            detector,
            last_capture: String::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == WaitStatus::Pending
    }

    /// Terminal transition: freeze elapsed time and release the advisory
    /// registry entry. The registry write is best-effort.
    fn finish(&mut self, state_dir: &Path, status: WaitStatus, now_ms: u64) {
        self.status = status;
        self.elapsed_ms = now_ms.saturating_sub(self.started_at_ms);
        debug!(endpoint = %self.target, status = ?status, elapsed_ms = self.elapsed_ms, "wait finished");
        if let Err(e) = registry::clear_active_request(state_dir, &self.target) {
            warn!(endpoint = %self.target, error = %e, "failed to clear active-request entry");
        }
    }

    /// Record a terminal failure before polling ever starts (send or
    /// registration).
    pub fn fail(&mut self, state_dir: &Path, detail: String, now_ms: u64) {
        self.error = Some(detail);
        self.finish(state_dir, WaitStatus::Error, now_ms);
    }

    /// Transition to TIMEOUT with best-effort partial extraction if this
    /// endpoint's own deadline has passed. Returns true on transition.
    pub fn expire_if_timed_out(&mut self, state_dir: &Path, now_ms: u64) -> bool {
        if !self.is_pending() {
            return false;
        }
        if now_ms.saturating_sub(self.started_at_ms) < self.timeout_ms {
            return false;
        }
        self.partial_response =
            extract_partial(&self.last_capture, &self.request.nonce, self.fallback_lines);
        self.finish(state_dir, WaitStatus::Timeout, now_ms);
        true
    }

    /// One capture-and-settle round. Capture I/O failure is terminal with no
    /// partial extraction; a settled marker extracts the response.
    pub fn poll(&mut self, term: &dyn Terminal, state_dir: &Path, now_ms: u64) {
        if !self.is_pending() {
            return;
        }
        let text = match term.capture(&self.address, self.capture_lines) {
            Ok(text) => text,
            Err(e) => {
                self.error = Some(e.to_string());
                self.finish(state_dir, WaitStatus::Error, now_ms);
                return;
            }
        };
        self.last_capture = text;
        if self.detector.observe(&self.last_capture, now_ms) {
            self.response =
                extract_response(&self.last_capture, &self.request.nonce, self.fallback_lines);
            self.finish(state_dir, WaitStatus::Completed, now_ms);
        }
    }

    /// External interrupt: stop without extraction, clearing the registry.
    pub fn cancel(&mut self, state_dir: &Path, now_ms: u64) {
        if self.is_pending() {
            self.finish(state_dir, WaitStatus::Cancelled, now_ms);
        }
    }

    pub fn into_outcome(self) -> WaitOutcome {
        WaitOutcome {
            target: self.target,
            address: self.address,
            status: self.status,
            request_id: self.request.request_id,
            nonce: self.request.nonce,
            marker: self.request.marker,
            response: self.response,
            partial_response: self.partial_response,
            error: self.error,
            elapsed_ms: self.elapsed_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Send strategies
// ---------------------------------------------------------------------------

/// Fire-and-forget: one send, zero polling. `text` is already composed and
/// character-filtered.
pub fn send_only(term: &dyn Terminal, endpoint: &Endpoint, text: &str) -> Result<()> {
    term.send(&endpoint.address, text)
}

/// Send `composed_base` to one endpoint with the wait protocol and poll to a
/// terminal outcome. The completion instruction is appended here so it is
/// scoped to this request's fresh nonce.
pub fn send_and_wait(
    term: &dyn Terminal,
    clock: &dyn Clock,
    state_dir: &Path,
    endpoint: &Endpoint,
    composed_base: &str,
    opts: &WaitOptions,
    cancel: &CancelToken,
) -> Result<WaitOutcome> {
    let request = Request::new(&endpoint.address);
    send_and_wait_request(
        term,
        clock,
        state_dir,
        endpoint,
        composed_base,
        opts,
        cancel,
        request,
    )
}

/// Inner entry point taking an explicit [`Request`] so tests can pin the
/// nonce while scripting captures.
#[allow(clippy::too_many_arguments)]
pub(crate) fn send_and_wait_request(
    term: &dyn Terminal,
    clock: &dyn Clock,
    state_dir: &Path,
    endpoint: &Endpoint,
    composed_base: &str,
    opts: &WaitOptions,
    cancel: &CancelToken,
    request: Request,
) -> Result<WaitOutcome> {
    let now = clock.now_ms();
    register(state_dir, &endpoint.name, &request, now)?;
    let mut state = WaitState::new(endpoint, request, opts, now);

    let outbound = outbound_text(composed_base, &state.request.nonce, endpoint);
    if let Err(e) = term.send(&endpoint.address, &outbound) {
        state.fail(state_dir, e.to_string(), clock.now_ms());
        return Ok(state.into_outcome());
    }

    while state.is_pending() {
        if cancel.is_cancelled() {
            state.cancel(state_dir, clock.now_ms());
            break;
        }
        if state.expire_if_timed_out(state_dir, clock.now_ms()) {
            break;
        }
        clock.sleep_ms(opts.poll_interval_ms);
        state.poll(term, state_dir, clock.now_ms());
    }
    Ok(state.into_outcome())
}

/// Full outbound text: composed base + completion instruction, then the
/// endpoint's character filter.
pub(crate) fn outbound_text(composed_base: &str, nonce: &str, endpoint: &Endpoint) -> String {
    let with_instruction = format!("{composed_base}\n\n{}", build_wait_instruction(nonce));
    compose::apply_strip_chars(&with_instruction, endpoint.strip_chars.as_deref())
}

/// Persist the advisory registry entry; an existing entry is a warning, not
/// an error.
pub(crate) fn register(
    state_dir: &Path,
    target: &str,
    request: &Request,
    now_ms: u64,
) -> Result<()> {
    let entry = ActiveRequest {
        request_id: request.request_id.clone(),
        nonce: request.nonce.clone(),
        address: request.address.clone(),
        started_at_ms: now_ms,
    };
    if let Some(prev) = registry::set_active_request(state_dir, target, entry)? {
        warn!(
            endpoint = target,
            previous_request = %prev.request_id,
            "endpoint already has an in-flight request; proceeding anyway"
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
