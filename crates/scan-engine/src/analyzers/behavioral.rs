//! Behavioral JS analyzer: client-side behaviors typical of drive-by
//! downloads, clipboard hijacking and history manipulation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalyzerConfig;

use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "behavioral_js";

static AUTO_DOWNLOAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(\.click\(\)|download\s*=\s*["'][^"']+["'])"#).unwrap());
static ALERT_OR_POPUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(alert|confirm|window\.open)\s*\(").unwrap());
static CLIPBOARD: Lazy<Regex> = Lazy::new(|| Regex::new(r"navigator\.clipboard").unwrap());
static HISTORY_MANIPULATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"history\.(pushState|replaceState)").unwrap());
static NOTIFICATION_REQUEST: Lazy<Regex> = Lazy::new(|| Regex::new(r"Notification\.requestPermission").unwrap());
static SUSPICIOUS_LISTENER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"addEventListener\(["'](beforeunload|contextmenu|copy|paste)["']"#).unwrap());

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(http) = ctx.evidence.http.as_ref() else {
        return findings;
    };
    let body = &http.body;

    if AUTO_DOWNLOAD.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Auto-download pattern",
            Severity::High,
            weight(cfg, "auto_download", 10),
            "script programmatically triggers a click/download",
        ));
    }

    let popup_count = ALERT_OR_POPUP.find_iter(body).count();
    if popup_count >= 5 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Excessive popup/alert calls",
            Severity::Medium,
            weight(cfg, "excessive_popups", 8),
            format!("{popup_count} popup/alert calls"),
        ));
    }

    if CLIPBOARD.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Clipboard API usage",
            Severity::Medium,
            weight(cfg, "clipboard_access", 5),
            "script accesses the clipboard API",
        ));
    }

    let history_hits = HISTORY_MANIPULATION.find_iter(body).count();
    if history_hits >= 2 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Repeated history manipulation",
            Severity::Low,
            weight(cfg, "history_manipulation", 4),
            format!("{history_hits} pushState/replaceState calls"),
        ));
    }

    if NOTIFICATION_REQUEST.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Requests browser notification permission",
            Severity::Low,
            weight(cfg, "notification_request", 3),
            "script requests notification permission on load",
        ));
    }

    let listener_hits: std::collections::HashSet<_> = SUSPICIOUS_LISTENER
        .captures_iter(body)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if listener_hits.len() >= 2 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Multiple suspicious event listeners",
            Severity::Medium,
            weight(cfg, "suspicious_listeners", 6),
            format!("listens on: {}", listener_hits.into_iter().collect::<Vec<_>>().join(", ")),
        ));
    }

    findings
}

fn weight(cfg: &AnalyzerConfig, key: &str, default: u32) -> u32 {
    cfg.check_weights.get(key).copied().unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::evidence::{EvidenceBundle, HttpEvidence};
    use crate::reachability::ReachabilityState;

    #[test]
    fn flags_clipboard_and_listeners() {
        let canonical = canonicalize("http://example.com/").unwrap();
        let body = "navigator.clipboard.writeText('x'); addEventListener('copy', f); addEventListener('paste', g);";
        let evidence = EvidenceBundle {
            http: Some(HttpEvidence { status: 200, headers: Default::default(), body: body.to_string(), redirect_chain: Vec::new(), final_url: String::new() }),
            ..Default::default()
        };
        let cfg = AnalyzerConfig { enabled: true, max_weight: 25, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("Clipboard")));
        assert!(findings.iter().any(|f| f.title.contains("listeners")));
    }
}
