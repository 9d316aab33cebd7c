use crate::config::PreambleConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::{io, paths};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Preamble counters
// ---------------------------------------------------------------------------

/// Persistent per-endpoint send counters backing preamble rate-limiting.
///
/// An explicit keyed store threaded through composition rather than
/// process-wide mutable state, so two invocations in one host process can't
/// trample each other's counts.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PreambleCounters {
    #[serde(default)]
    counts: BTreeMap<String, u64>,
}

impl PreambleCounters {
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = paths::counters_path(state_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn save(&self, state_dir: &Path) -> Result<()> {
        let path = paths::counters_path(state_dir);
        io::atomic_write(&path, serde_yaml::to_string(self)?.as_bytes())
    }

    pub fn count(&self, endpoint: &str) -> u64 {
        self.counts.get(endpoint).copied().unwrap_or(0)
    }

    /// Record one more send to `endpoint` and return the new count.
    pub fn increment(&mut self, endpoint: &str) -> u64 {
        let next = next_count(self.count(endpoint));
        self.counts.insert(endpoint.to_string(), next);
        next
    }
}

fn next_count(prior: u64) -> u64 {
    prior + 1
}

/// Whether the `count`-th send (1-based) gets the preamble. A count of 0
/// means no send has happened yet and never injects.
pub fn should_inject(count: u64, every_n: u64) -> bool {
    if count == 0 || every_n == 0 {
        return false;
    }
    (count - 1) % every_n == 0
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Build the text to send: `base`, optionally preceded by the endpoint's
/// preamble.
///
/// The counter increments on every call that reaches it, whether or not the
/// preamble fires this time, so "every Nth send" counts sends, not
/// injections.
pub fn compose(
    base: &str,
    endpoint: &Endpoint,
    config: &PreambleConfig,
    counters: &mut PreambleCounters,
    suppress_preamble: bool,
) -> String {
    if !config.enabled || suppress_preamble {
        return base.to_string();
    }
    let Some(preamble) = endpoint.preamble.as_deref() else {
        return base.to_string();
    };
    let count = counters.increment(&endpoint.name);
    if should_inject(count, config.every_n) {
        format!("[SYSTEM: {preamble}]\n\n{base}")
    } else {
        base.to_string()
    }
}

/// Natural-language completion instruction for wait mode.
///
/// Describes the marker without containing it literally, so a literal marker
/// in captured output is always attributable to the endpoint itself and
/// never to this instruction being echoed back.
pub fn build_wait_instruction(nonce: &str) -> String {
    format!(
        "When your reply is fully complete, print one final line consisting of \
         the word RESPONSE, then the word END, then the token {nonce}, all \
         joined by single hyphens, with nothing else on that line."
    )
}

/// The phrase used to locate the instruction line in captured output.
/// Extraction anchors to the last line containing this.
pub fn instruction_anchor(nonce: &str) -> String {
    format!("the token {nonce}")
}

/// Drop characters the endpoint's input layer mishandles.
pub fn apply_strip_chars(text: &str, strip: Option<&str>) -> String {
    match strip {
        Some(chars) if !chars.is_empty() => {
            text.chars().filter(|c| !chars.contains(*c)).collect()
        }
        _ => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_matcher;
    use tempfile::TempDir;

    fn endpoint_with_preamble() -> Endpoint {
        let mut ep = Endpoint::new("claude", "%5");
        ep.preamble = Some("You are the build agent.".to_string());
        ep
    }

    #[test]
    fn compose_passthrough_when_disabled() {
        let ep = endpoint_with_preamble();
        let cfg = PreambleConfig {
            enabled: false,
            every_n: 1,
        };
        let mut counters = PreambleCounters::default();
        assert_eq!(compose("hi", &ep, &cfg, &mut counters, false), "hi");
        assert_eq!(counters.count("claude"), 0);
    }

    #[test]
    fn compose_passthrough_when_suppressed() {
        let ep = endpoint_with_preamble();
        let cfg = PreambleConfig::default();
        let mut counters = PreambleCounters::default();
        assert_eq!(compose("hi", &ep, &cfg, &mut counters, true), "hi");
    }

    #[test]
    fn compose_passthrough_without_preamble() {
        let ep = Endpoint::new("codex", "%7");
        let cfg = PreambleConfig::default();
        let mut counters = PreambleCounters::default();
        assert_eq!(compose("hi", &ep, &cfg, &mut counters, false), "hi");
        // No preamble configured — nothing to rate-limit, counter untouched.
        assert_eq!(counters.count("codex"), 0);
    }

    #[test]
    fn compose_injects_every_third_send() {
        let ep = endpoint_with_preamble();
        let cfg = PreambleConfig {
            enabled: true,
            every_n: 3,
        };
        let mut counters = PreambleCounters::default();
        let injected: Vec<bool> = (0..6)
            .map(|_| {
                compose("hi", &ep, &cfg, &mut counters, false).starts_with("[SYSTEM:")
            })
            .collect();
        assert_eq!(injected, vec![true, false, false, true, false, false]);
        assert_eq!(counters.count("claude"), 6);
    }

    #[test]
    fn every_n_zero_counts_but_never_injects() {
        let ep = endpoint_with_preamble();
        let cfg = PreambleConfig {
            enabled: true,
            every_n: 0,
        };
        let mut counters = PreambleCounters::default();
        for _ in 0..3 {
            assert_eq!(compose("hi", &ep, &cfg, &mut counters, false), "hi");
        }
        assert_eq!(counters.count("claude"), 3);
    }

    #[test]
    fn should_inject_rejects_zero_count() {
        assert!(!should_inject(0, 1));
        assert!(!should_inject(0, 0));
        assert!(should_inject(1, 1));
        assert!(should_inject(4, 3));
    }

    #[test]
    fn injection_format() {
        let ep = endpoint_with_preamble();
        let cfg = PreambleConfig::default();
        let mut counters = PreambleCounters::default();
        let out = compose("Run the tests", &ep, &cfg, &mut counters, false);
        assert_eq!(out, "[SYSTEM: You are the build agent.]\n\nRun the tests");
    }

    #[test]
    fn counters_roundtrip_through_state_dir() {
        let dir = TempDir::new().unwrap();
        let mut counters = PreambleCounters::default();
        counters.increment("claude");
        counters.increment("claude");
        counters.save(dir.path()).unwrap();

        let reloaded = PreambleCounters::load(dir.path()).unwrap();
        assert_eq!(reloaded.count("claude"), 2);
        assert_eq!(reloaded.count("codex"), 0);
    }

    #[test]
    fn instruction_never_matches_own_marker() {
        let nonce = "8f3a";
        let instruction = build_wait_instruction(nonce);
        assert!(!build_matcher(nonce).is_match(&instruction));
        assert!(instruction.contains(&instruction_anchor(nonce)));
    }

    #[test]
    fn strip_chars_filters_only_listed() {
        assert_eq!(apply_strip_chars("a!b?c", Some("!?")), "abc");
        assert_eq!(apply_strip_chars("a!b", None), "a!b");
        assert_eq!(apply_strip_chars("a!b", Some("")), "a!b");
    }
}
