//! Identity Theft analyzer: excessive PII collection, document uploads and
//! account-takeover style verification scams.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalyzerConfig;

use super::{Finding, ScanContext, Severity};

const CATEGORY_ID: &str = "identity_theft";

static PII_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)name=["']?(ssn|date.?of.?birth|dob|mother.?s.?maiden|passport|driver.?s?.?licen[sc]e)"#)
        .unwrap()
});
static DOCUMENT_UPLOAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(upload (a |your )?(photo )?id|upload.{0,20}passport|upload.{0,20}driver)"#).unwrap());
static VERIFICATION_SCAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(verify your identity (immediately|now)|confirm your identity to (avoid|prevent))").unwrap()
});
static ACCOUNT_TAKEOVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(unusual (login|sign.?in) activity|we (noticed|detected) a (login|sign.?in)|reset your password (now|immediately))").unwrap()
});
static GOVERNMENT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(government.?issued id|national id number|social security number)").unwrap());

pub fn analyze(ctx: &ScanContext, cfg: &AnalyzerConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(http) = ctx.evidence.http.as_ref() else {
        return findings;
    };
    let body = &http.body;

    let pii_hits = PII_FIELD.find_iter(body).count();
    if pii_hits >= 2 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Multiple personally identifying fields",
            Severity::High,
            weight(cfg, "pii_fields", 10),
            format!("{pii_hits} PII-style input fields"),
        ));
    }

    if DOCUMENT_UPLOAD.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Identity document upload prompt",
            Severity::High,
            weight(cfg, "document_upload", 8),
            "page prompts for a government ID / passport upload",
        ));
    }

    if VERIFICATION_SCAM.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Identity verification scam language",
            Severity::Medium,
            weight(cfg, "verification_scam", 6),
            "urges immediate identity verification",
        ));
    }

    let takeover_hits = ACCOUNT_TAKEOVER.find_iter(body).count();
    if takeover_hits >= 3 {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Account-takeover bait",
            Severity::Medium,
            weight(cfg, "account_takeover_bait", 6),
            format!("{takeover_hits} account-takeover style phrases"),
        ));
    }

    if GOVERNMENT_ID.is_match(body) {
        findings.push(Finding::new(
            CATEGORY_ID,
            "Requests government-issued ID number",
            Severity::High,
            weight(cfg, "government_id_request", 8),
            "page asks for a government ID or social security number",
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
    fn flags_document_upload() {
        let canonical = canonicalize("http://example.com/").unwrap();
        let body = "Please upload your ID to verify your identity immediately.";
        let evidence = EvidenceBundle {
            http: Some(HttpEvidence { status: 200, headers: Default::default(), body: body.to_string(), redirect_chain: Vec::new(), final_url: String::new() }),
            ..Default::default()
        };
        let cfg = AnalyzerConfig { enabled: true, max_weight: 20, budget_ms: 1000, check_weights: Default::default() };
        let findings = analyze(&ScanContext { canonical: &canonical, evidence: &evidence, reachability: ReachabilityState::Online }, &cfg);
        assert!(findings.iter().any(|f| f.title.contains("upload")));
    }
}
