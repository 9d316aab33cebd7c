use regex::Regex;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// The two guard windows of completion detection.
///
/// `min_wait_ms` blocks completion while output may still be streaming and
/// happen to already contain the marker mid-buffer; `idle_ms` requires the
/// output to stop changing before it counts as final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleThresholds {
    pub min_wait_ms: u64,
    pub idle_ms: u64,
}

impl SettleThresholds {
    /// Both windows default to `min(3000ms, 30% of the timeout)`: generous
    /// fixed floors in production, still usable under short CI timeouts.
    pub fn for_timeout(timeout_ms: u64) -> Self {
        let window = 3_000.min(timeout_ms * 3 / 10);
        Self {
            min_wait_ms: window,
            idle_ms: window,
        }
    }
}

// ---------------------------------------------------------------------------
// SettleDetector
// ---------------------------------------------------------------------------

/// Decides, from repeated raw-text samples, the instant an endpoint's output
/// counts as final: marker present, minimum wait elapsed, and output
/// unchanged for the idle window.
#[derive(Debug)]
pub struct SettleDetector {
    matcher: Regex,
    thresholds: SettleThresholds,
    started_at_ms: u64,
    last_output: String,
    last_output_change_at_ms: u64,
}

impl SettleDetector {
    pub fn new(matcher: Regex, thresholds: SettleThresholds, now_ms: u64) -> Self {
        Self {
            matcher,
            thresholds,
            started_at_ms: now_ms,
            last_output: String::new(),
            last_output_change_at_ms: now_ms,
        }
    }

    /// Feed one capture sample; returns true once the output has settled.
    pub fn observe(&mut self, text: &str, now_ms: u64) -> bool {
        if text != self.last_output {
            self.last_output = text.to_string();
            self.last_output_change_at_ms = now_ms;
        }
        let elapsed = now_ms.saturating_sub(self.started_at_ms);
        let idle = now_ms.saturating_sub(self.last_output_change_at_ms);
        elapsed >= self.thresholds.min_wait_ms
            && self.matcher.is_match(text)
            && idle >= self.thresholds.idle_ms
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_matcher;

    fn detector(min_wait: u64, idle: u64) -> SettleDetector {
        SettleDetector::new(
            build_matcher("8f3a"),
            SettleThresholds {
                min_wait_ms: min_wait,
                idle_ms: idle,
            },
            0,
        )
    }

    #[test]
    fn thresholds_cap_at_three_seconds() {
        let t = SettleThresholds::for_timeout(60_000);
        assert_eq!(t.min_wait_ms, 3_000);
        assert_eq!(t.idle_ms, 3_000);
    }

    #[test]
    fn thresholds_scale_down_for_short_timeouts() {
        let t = SettleThresholds::for_timeout(2_000);
        assert_eq!(t.min_wait_ms, 600);
        assert_eq!(t.idle_ms, 600);
    }

    #[test]
    fn marker_before_min_wait_does_not_complete() {
        let mut d = detector(1_000, 200);
        assert!(!d.observe("done\nRESPONSE-END-8f3a", 500));
    }

    #[test]
    fn completes_once_min_wait_and_idle_hold() {
        let mut d = detector(1_000, 300);
        // Marker arrives early but output must stop changing.
        assert!(!d.observe("working...", 200));
        assert!(!d.observe("done\nRESPONSE-END-8f3a", 500));
        // Same text, but min_wait not yet met at 800.
        assert!(!d.observe("done\nRESPONSE-END-8f3a", 800));
        // min_wait met, idle = 1100 - 500 = 600 >= 300.
        assert!(d.observe("done\nRESPONSE-END-8f3a", 1_100));
    }

    #[test]
    fn changing_output_resets_idle() {
        let mut d = detector(100, 500);
        assert!(!d.observe("a\nRESPONSE-END-8f3a", 200));
        // Output changed — idle clock restarts even though the marker stays.
        assert!(!d.observe("ab\nRESPONSE-END-8f3a", 600));
        assert!(!d.observe("ab\nRESPONSE-END-8f3a", 900));
        assert!(d.observe("ab\nRESPONSE-END-8f3a", 1_101));
    }

    #[test]
    fn stable_output_without_marker_never_completes() {
        let mut d = detector(100, 100);
        assert!(!d.observe("still thinking", 200));
        assert!(!d.observe("still thinking", 10_000));
    }
}
