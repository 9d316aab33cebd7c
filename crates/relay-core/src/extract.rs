//! Response extraction heuristics.
//!
//! Pure functions of `(captured text, nonce)` with no I/O and no clock, so
//! the anchor and fallback behavior is unit-testable without faking time.

use crate::compose::instruction_anchor;
use crate::protocol::build_matcher;

/// Extract the response from a completed capture.
///
/// Anchors to the last visible line of the completion instruction (it
/// carries the nonce), so extraction starts just after the instruction even
/// across large scrollback. If the instruction line has scrolled out of the
/// captured window, falls back to the last `fallback_lines` lines preceding
/// the marker line. Returns the trimmed slice, or None when nothing useful
/// remains.
pub fn extract_response(text: &str, nonce: &str, fallback_lines: usize) -> Option<String> {
    let matcher = build_matcher(nonce);
    let lines: Vec<&str> = text.lines().collect();
    let marker_idx = lines.iter().rposition(|l| matcher.is_match(l))?;

    let anchor = instruction_anchor(nonce);
    let start = lines[..marker_idx]
        .iter()
        .rposition(|l| l.contains(&anchor))
        .map(|i| i + 1)
        .unwrap_or_else(|| marker_idx.saturating_sub(fallback_lines));

    trimmed_join(&lines[start..marker_idx])
}

/// Best-effort extraction when no marker ever settled (timeout path).
///
/// Same anchor search without a closing marker line; falls back to the last
/// `fallback_lines` lines of the raw capture when no anchor is found.
pub fn extract_partial(text: &str, nonce: &str, fallback_lines: usize) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let anchor = instruction_anchor(nonce);
    let start = lines
        .iter()
        .rposition(|l| l.contains(&anchor))
        .map(|i| i + 1)
        .unwrap_or_else(|| lines.len().saturating_sub(fallback_lines));

    trimmed_join(&lines[start..])
}

fn trimmed_join(lines: &[&str]) -> Option<String> {
    let joined = lines.join("\n");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
