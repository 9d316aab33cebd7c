use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One in-flight wait-mode request against a single endpoint.
///
/// Created at send time and never mutated afterward; terminal outcomes live
/// in [`crate::wait::WaitOutcome`], not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub request_id: String,
    pub nonce: String,
    pub address: String,
    pub marker: String,
    pub created_at: DateTime<Utc>,
}

impl Request {
    pub fn new(address: impl Into<String>) -> Self {
        let nonce = new_nonce();
        Self {
            request_id: new_request_id(),
            marker: build_marker(&nonce),
            nonce,
            address: address.into(),
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Correlation id for logs and JSON output. Never used for matching.
pub fn new_request_id() -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("req-{stamp}-{}", &suffix[..6])
}

/// Fresh random token scoping one marker to one request. Never reused, so a
/// stale marker from an earlier turn still visible in scrollback cannot
/// satisfy a new request's matcher.
pub fn new_nonce() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

// ---------------------------------------------------------------------------
// Marker / matcher
// ---------------------------------------------------------------------------

/// The literal line an endpoint is instructed to print when it is done.
pub fn build_marker(nonce: &str) -> String {
    format!("RESPONSE-END-{nonce}")
}

/// Case-insensitive matcher for the marker. Endpoints sometimes re-case
/// text when echoing, so an exact-case match would miss real completions.
pub fn build_matcher(nonce: &str) -> Regex {
    let pattern = format!("(?i){}", regex::escape(&build_marker(nonce)));
    // The pattern is an escaped literal with a flag prefix; it always parses.
    Regex::new(&pattern).expect("escaped literal marker pattern")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_embeds_nonce() {
        assert_eq!(build_marker("8f3a"), "RESPONSE-END-8f3a");
    }

    #[test]
    fn matcher_matches_own_marker() {
        let m = build_matcher("8f3a");
        assert!(m.is_match("RESPONSE-END-8f3a"));
        assert!(m.is_match("some output\nresponse-end-8F3A\n"));
    }

    #[test]
    fn cross_nonce_markers_never_match() {
        let m1 = build_matcher("aaaa1111");
        assert!(!m1.is_match(&build_marker("bbbb2222")));
        let m2 = build_matcher("bbbb2222");
        assert!(!m2.is_match(&build_marker("aaaa1111")));
    }

    #[test]
    fn nonces_are_fresh() {
        let a = new_nonce();
        let b = new_nonce();
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }

    #[test]
    fn request_id_has_time_prefix() {
        let id = new_request_id();
        assert!(id.starts_with("req-20"));
        assert_eq!(id.len(), "req-".len() + 14 + 1 + 6);
    }

    #[test]
    fn request_new_is_self_consistent() {
        let r = Request::new("%5");
        assert_eq!(r.marker, build_marker(&r.nonce));
        assert_eq!(r.address, "%5");
    }
}
