//! Reachability probing: classifies a target as Online, Parked, WAFChallenge
//! or Offline before any category analyzer runs.

use serde::{Deserialize, Serialize};

use crate::evidence::HttpEvidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReachabilityState {
    Online,
    Parked,
    WafChallenge,
    Offline,
}

const PARKING_PHRASES: &[&str] = &[
    "domain for sale",
    "buy this domain",
    "this domain is parked",
    "domain may be for sale",
];

const WAF_HEADER_NAMES: &[&str] = &["cf-ray", "x-sucuri-id", "x-waf-status", "server-timing"];

/// Classify reachability from whatever evidence the collectors managed to
/// gather. The coarsest state consistent with the evidence is always
/// returned; a scan is never aborted because reachability is ambiguous.
pub fn classify(
    dns_resolved: bool,
    tcp_connected: bool,
    http: Option<&HttpEvidence>,
) -> ReachabilityState {
    if !dns_resolved || !tcp_connected {
        return ReachabilityState::Offline;
    }

    let Some(http) = http else {
        return ReachabilityState::Offline;
    };

    if http.body.len() < 256 {
        let lower = http.body.to_lowercase();
        if PARKING_PHRASES.iter().any(|p| lower.contains(p)) {
            return ReachabilityState::Parked;
        }
    }

    if matches!(http.status, 403 | 503) {
        let has_waf_header = http
            .headers
            .keys()
            .any(|k| WAF_HEADER_NAMES.contains(&k.to_lowercase().as_str()));
        if has_waf_header {
            return ReachabilityState::WafChallenge;
        }
    }

    ReachabilityState::Online
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn http(status: u16, body: &str, headers: &[(&str, &str)]) -> HttpEvidence {
        HttpEvidence {
            status,
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            body: body.to_string(),
            redirect_chain: Vec::new(),
            final_url: "http://example.com/".to_string(),
        }
    }

    #[test]
    fn offline_when_dns_fails() {
        assert_eq!(classify(false, false, None), ReachabilityState::Offline);
    }

    #[test]
    fn offline_when_no_http_evidence() {
        assert_eq!(classify(true, true, None), ReachabilityState::Offline);
    }

    #[test]
    fn parked_on_short_body_with_phrase() {
        let h = http(200, "This domain is parked.", &[]);
        assert_eq!(classify(true, true, Some(&h)), ReachabilityState::Parked);
    }

    #[test]
    fn waf_challenge_on_403_with_header() {
        let h = http(403, &"x".repeat(500), &[("cf-ray", "abc123")]);
        assert_eq!(classify(true, true, Some(&h)), ReachabilityState::WafChallenge);
    }

    #[test]
    fn online_otherwise() {
        let h = http(200, &"hello world".repeat(50), &[]);
        assert_eq!(classify(true, true, Some(&h)), ReachabilityState::Online);
    }
}
